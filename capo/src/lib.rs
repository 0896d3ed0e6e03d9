//! Reorders the children of an HTML `<head>` into a performance-optimal
//! loading order.
//!
//! capo provides:
//! - **Classification**: every head child is put in one priority bucket
//!   (`META`, `TITLE`, `PRECONNECT`, ... down to `OTHER`), see [`rules`]
//! - **Reordering**: head children are stably sorted by bucket weight
//! - **Parsing**: html5ever tokenization into an arena DOM that mirrors the
//!   markup as written (no implied `<html>`/`<body>`, nothing moved)
//! - **Serialization**: HTML5-correct serialization of the result
//!
//! # Example
//!
//! ```rust
//! use capo::{Category, parse};
//!
//! let mut doc = parse(r#"<head><link rel="preload" href="f.woff2"><meta charset="utf-8"></head>"#);
//! let head = doc.reorder_head().expect("document has a head");
//!
//! let first = doc.element_children(head).next().unwrap();
//! assert_eq!(doc.classify(first), Some(Category::Meta));
//!
//! let html = doc.outer_html(head);
//! assert_eq!(html, r#"<head><meta charset="utf-8"><link rel="preload" href="f.woff2"></head>"#);
//! ```

mod tracing_macros;

pub mod dom;
mod error;
mod parser;
mod reorder;
pub mod rules;
pub mod serialize;

pub use error::{Error, Result};

pub use dom::{Document, ElementData, Namespace, NodeData, NodeKind, Visit};
pub use indextree::NodeId;
pub use tendril::StrTendril;

pub use parser::{parse, parse_reader};

pub use reorder::{
    reorder, reorder_head, reorder_head_element, reorder_head_reader, reorder_head_with_options,
};

pub use rules::{Attrs, Category, classify};

pub use serialize::{SerializeOptions, serialize_children, serialize_document, serialize_node};
