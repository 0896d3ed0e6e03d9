//! Error type for the fallible entry points (reader input).

/// Errors produced by capo.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the markup failed.
    #[error("failed to read HTML input: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used by the reader entry points.
pub type Result<T, E = Error> = std::result::Result<T, E>;
