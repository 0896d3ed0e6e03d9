//! Reordering of `<head>` children by loading priority.

use std::io::Read;

use indextree::NodeId;
use smallvec::SmallVec;

use crate::Result;
use crate::dom::Document;
use crate::parser::{parse, parse_reader};
use crate::serialize::{SerializeOptions, serialize_document, serialize_node};
use crate::tracing_macros::debug;

/// Reorder the first `<head>` of `doc` and hand the document back.
///
/// A document without a `<head>` comes back untouched.
pub fn reorder(mut doc: Document) -> Document {
    doc.reorder_head();
    doc
}

/// Parse `html`, reorder its `<head>`, and serialize it back. Everything
/// outside the head comes out as it went in.
///
/// ```
/// let html = capo::reorder_head(
///     r#"<head><script src="a.js" defer></script><title>T</title><meta charset="utf-8"></head>"#,
/// );
/// assert_eq!(
///     html,
///     r#"<head><meta charset="utf-8"><title>T</title><script src="a.js" defer=""></script></head>"#,
/// );
/// ```
pub fn reorder_head(html: &str) -> String {
    reorder_head_with_options(html, &SerializeOptions::default())
}

/// [`reorder_head`] with custom serialization options.
pub fn reorder_head_with_options(html: &str, opts: &SerializeOptions) -> String {
    let doc = reorder(parse(html));
    serialize_document(&doc, opts)
}

/// Like [`reorder_head`], reading UTF-8 markup from `reader`.
pub fn reorder_head_reader<R: Read>(reader: R) -> Result<String> {
    let doc = reorder(parse_reader(reader)?);
    Ok(doc.to_html())
}

/// Parse `html`, reorder its `<head>`, and serialize only that `<head>`
/// element. `None` when the markup has no head.
pub fn reorder_head_element(html: &str) -> Option<String> {
    let mut doc = parse(html);
    let head = doc.reorder_head()?;
    Some(serialize_node(&doc, head, &SerializeOptions::default()))
}

impl Document {
    /// Reorder the children of the first `<head>` in document order.
    ///
    /// Element children are stably sorted by descending weight; text and
    /// comment children are removed. The head node itself (identity, tag,
    /// attributes) is kept. The search stops at the first `<head>`, so a later
    /// or nested one is never visited.
    ///
    /// Returns the reordered head, or `None` if there is none.
    pub fn reorder_head(&mut self) -> Option<NodeId> {
        let head = self.head()?;
        debug!(?head, "found head");

        let mut weighted: SmallVec<[(u8, NodeId); 32]> = SmallVec::new();
        let mut dropped: SmallVec<[NodeId; 32]> = SmallVec::new();
        for child in self.children(head) {
            match self.weight(child) {
                Some(weight) => weighted.push((weight, child)),
                None => dropped.push(child),
            }
        }

        // slice::sort_by_key is stable: equal weights keep source order
        weighted.sort_by_key(|&(weight, _)| std::cmp::Reverse(weight));

        for id in dropped {
            id.remove_subtree(&mut self.arena);
        }
        for &(_, child) in &weighted {
            child.detach(&mut self.arena);
            head.append(child, &mut self.arena);
        }

        debug!(
            order = ?weighted.iter().map(|&(weight, _)| weight).collect::<Vec<_>>(),
            "reordered head"
        );
        Some(head)
    }
}
