//! HTML parsing into the arena DOM.
//!
//! html5ever's tokenizer drives a [`TokenSink`] that builds the tree exactly
//! as the markup is written: an element opens at its start tag and closes at
//! its matching end tag. None of the tree builder's insertion modes apply, so
//! no `<html>`, `<head>` or `<body>` is implied, a `<head>` fragment parses to
//! a lone `<head>` element, and unknown elements or stray text inside a head
//! stay where they are.
//!
//! The tokenizer still does the lexing the way browsers do: character
//! references are decoded, attribute names are lower-cased, duplicate
//! attributes keep their first value, and the content of raw text elements
//! (`script`, `style`, `title`, ...) is never read as markup.

use std::cell::RefCell;
use std::io::Read;

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::{Attribute, TokenizerResult};
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use smallvec::SmallVec;
use tendril::StrTendril;

use crate::Result;
use crate::dom::{Document, ElementData, Namespace, NodeData, NodeKind};
use crate::serialize::VOID_ELEMENTS;
use crate::tracing_macros::trace;

/// Parse HTML into an arena-based [`Document`].
///
/// Never fails: unbalanced markup is kept as written. A stray end tag is
/// dropped, an end tag closes every element opened after its match, and
/// elements still open at the end of input are closed there.
pub fn parse(html: &str) -> Document {
    let tokenizer = Tokenizer::new(ArenaSink::new(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from(html));

    // The sink never asks for a script pause, so one feed consumes everything.
    while let TokenizerResult::Script(()) = tokenizer.feed(&input) {}
    tokenizer.end();

    tokenizer.sink.finish()
}

/// Parse HTML read from `reader`. Invalid UTF-8 is replaced with U+FFFD.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Document> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(parse(&String::from_utf8_lossy(&bytes)))
}

/// TokenSink implementation for building the arena DOM
struct ArenaSink {
    arena: RefCell<Arena<NodeData>>,

    /// Document node (parent of top-level nodes)
    document: NodeId,

    doctype: RefCell<Option<StrTendril>>,

    /// Elements whose end tag hasn't been seen yet, innermost last
    open: RefCell<SmallVec<[NodeId; 16]>>,
}

impl ArenaSink {
    fn new() -> Self {
        let Document {
            arena,
            document,
            doctype,
        } = Document::new();

        ArenaSink {
            arena: RefCell::new(arena),
            document,
            doctype: RefCell::new(doctype),
            open: RefCell::new(SmallVec::new()),
        }
    }

    fn finish(self) -> Document {
        Document {
            arena: self.arena.into_inner(),
            document: self.document,
            doctype: self.doctype.into_inner(),
        }
    }

    /// Node new content is appended to.
    fn current(&self) -> NodeId {
        self.open.borrow().last().copied().unwrap_or(self.document)
    }

    fn append_node(&self, kind: NodeKind, ns: Namespace) -> NodeId {
        let parent = self.current();
        let mut arena = self.arena.borrow_mut();
        let id = arena.new_node(NodeData { kind, ns });
        parent.append(id, &mut arena);
        id
    }

    fn append_text(&self, text: StrTendril) {
        let parent = self.current();
        let mut arena = self.arena.borrow_mut();

        // Merge with a preceding text node
        let last_child = parent.children(&arena).next_back();
        if let Some(last) = last_child
            && let NodeKind::Text(existing) = &mut arena[last].get_mut().kind
        {
            existing.push_tendril(&text);
            return;
        }

        let id = arena.new_node(NodeData {
            kind: NodeKind::Text(text),
            ns: Namespace::Html,
        });
        parent.append(id, &mut arena);
    }

    /// Namespace of an element opened under the current node: `<svg>` and
    /// `<math>` switch namespace, `<foreignObject>` switches back to HTML,
    /// everything else inherits.
    fn namespace_for(&self, tag: &str) -> Namespace {
        match tag {
            "svg" => return Namespace::Svg,
            "math" => return Namespace::MathMl,
            _ => {}
        }
        let arena = self.arena.borrow();
        let parent = arena[self.current()].get();
        match &parent.kind {
            NodeKind::Element(elem) if elem.tag() == "foreignobject" => Namespace::Html,
            NodeKind::Element(_) => parent.ns,
            _ => Namespace::Html,
        }
    }

    fn start_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let ns = self.namespace_for(&tag.name);

        // The tokenizer already drops duplicates; keep first-wins regardless
        let mut attrs = IndexMap::with_capacity(tag.attrs.len());
        for attr in tag.attrs {
            attrs.entry(attr_name(&attr)).or_insert(attr.value);
        }

        let id = self.append_node(
            NodeKind::Element(ElementData {
                tag: StrTendril::from(tag.name.as_ref()),
                attrs,
            }),
            ns,
        );

        let name: &str = &tag.name;
        if tag.self_closing || (ns == Namespace::Html && VOID_ELEMENTS.contains(&name)) {
            return TokenSinkResult::Continue;
        }
        self.open.borrow_mut().push(id);

        if ns != Namespace::Html {
            return TokenSinkResult::Continue;
        }
        match name {
            "plaintext" => TokenSinkResult::Plaintext,
            _ => match raw_kind(name) {
                Some(kind) => TokenSinkResult::RawData(kind),
                None => TokenSinkResult::Continue,
            },
        }
    }

    fn end_tag(&self, name: &str) {
        let arena = self.arena.borrow();
        let mut open = self.open.borrow_mut();
        let matching = open.iter().rposition(|&id| {
            matches!(&arena[id].get().kind, NodeKind::Element(elem) if elem.tag() == name)
        });
        match matching {
            Some(pos) => open.truncate(pos),
            None => {
                trace!(tag = name, "dropping stray end tag");
            }
        }
    }
}

/// Tokenizer state for the content of an HTML element, `None` for ordinary
/// markup.
fn raw_kind(tag: &str) -> Option<RawKind> {
    match tag {
        "title" | "textarea" => Some(RawKind::Rcdata),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
            Some(RawKind::Rawtext)
        }
        "script" => Some(RawKind::ScriptData),
        _ => None,
    }
}

/// Attribute name as written in markup: `xlink:href`, not just `href`.
fn attr_name(attr: &Attribute) -> String {
    match &attr.name.prefix {
        Some(prefix) => format!("{prefix}:{}", attr.name.local),
        None => attr.name.local.to_string(),
    }
}

impl TokenSink for ArenaSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => return self.start_tag(tag),
                TagKind::EndTag => self.end_tag(&tag.name),
            },
            Token::CharacterTokens(text) => self.append_text(text),
            Token::NullCharacterToken => self.append_text(StrTendril::from_char('\0')),
            Token::CommentToken(text) => {
                self.append_node(NodeKind::Comment(text), Namespace::Html);
            }
            Token::DoctypeToken(doctype) => {
                *self.doctype.borrow_mut() = Some(doctype.name.unwrap_or_default());
            }
            Token::ParseError(_msg) => {
                trace!(msg = %_msg, "tokenizer recovered");
            }
            Token::EOFToken => {}
        }
        TokenSinkResult::Continue
    }

    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        let arena = self.arena.borrow();
        self.open
            .borrow()
            .last()
            .is_some_and(|&id| arena[id].get().ns != Namespace::Html)
    }
}
