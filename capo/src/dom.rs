//! Arena-based DOM.
//!
//! Every node of a parsed document lives in one [`indextree::Arena`]. Tags,
//! attribute values and text are [`StrTendril`]s, which share their buffer
//! with the parser input instead of copying it.
//!
//! The tree is rooted at an invisible document node; the `<html>` element,
//! comments before it, and so on are its children.

use std::ops::ControlFlow;

use indexmap::IndexMap;
use indextree::{Arena, NodeEdge, NodeId};
use smallvec::SmallVec;
use tendril::StrTendril;

/// Document = Arena + the id of its document node.
#[derive(Debug, Clone)]
pub struct Document {
    /// THE tree - all nodes live here
    pub arena: Arena<NodeData>,

    /// Invisible document node, parent of the root element
    pub document: NodeId,

    /// DOCTYPE name if present (usually "html")
    pub doctype: Option<StrTendril>,
}

/// What goes in each arena slot
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

/// Node types
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Document root (invisible, parent of `<html>`)
    Document,
    /// Element with tag and attributes
    Element(ElementData),
    /// Text content
    Text(StrTendril),
    /// HTML comment
    Comment(StrTendril),
}

/// Element data (tag + attributes)
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name, as the parser produced it (lowercase for HTML)
    pub tag: StrTendril,

    /// Attributes in source order. Keys are `String` to keep the map's key
    /// type free of interior mutability.
    pub attrs: IndexMap<String, StrTendril>,
}

impl ElementData {
    /// Tag name as a `&str`.
    pub fn tag(&self) -> &str {
        self.tag.as_ref()
    }

    /// Value of an attribute, `None` when it is absent.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|v| v.as_ref())
    }

    /// Whether the attribute is present, whatever its value (even empty).
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }
}

/// XML namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// One step of [`Document::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// The node being visited
    pub node: NodeId,
    /// Its parent (the document node for top-level nodes)
    pub parent: NodeId,
    /// Position of `node` among its parent's children
    pub index: usize,
}

impl Document {
    /// Create an empty document holding only the document node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeData {
            kind: NodeKind::Document,
            ns: Namespace::Html,
        });
        Self {
            arena,
            document,
            doctype: None,
        }
    }

    /// Get immutable reference to node data
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Get mutable reference to node data
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    /// Element data of a node, `None` for documents, text and comments.
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    /// Whether the node is an element with the given tag.
    pub fn is_element_named(&self, id: NodeId, tag: &str) -> bool {
        self.element(id).is_some_and(|elem| elem.tag() == tag)
    }

    /// Iterate children of a node
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Iterate the element children of a node, skipping text and comments.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(|&child| self.element(child).is_some())
    }

    /// Parent of a node, `None` for the document node and detached nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// The first top-level element: `<html>` for a full document, `<head>`
    /// for a head fragment.
    pub fn root(&self) -> Option<NodeId> {
        self.element_children(self.document).next()
    }

    /// The first `<head>` element in document order.
    pub fn head(&self) -> Option<NodeId> {
        self.find_first(|doc, id| doc.is_element_named(id, "head"))
    }

    /// The first `<body>` element in document order.
    pub fn body(&self) -> Option<NodeId> {
        self.find_first(|doc, id| doc.is_element_named(id, "body"))
    }

    /// First node in document order matching `pred`. Nothing after the match
    /// is visited.
    pub fn find_first(&self, mut pred: impl FnMut(&Self, NodeId) -> bool) -> Option<NodeId> {
        match self.walk(|visit| {
            if pred(self, visit.node) {
                ControlFlow::Break(visit.node)
            } else {
                ControlFlow::Continue(())
            }
        }) {
            ControlFlow::Break(id) => Some(id),
            ControlFlow::Continue(()) => None,
        }
    }

    /// Depth-first, pre-order walk over every node below the document node.
    ///
    /// `visit` gets each node with its parent and index in that parent. When it
    /// returns [`ControlFlow::Break`] the walk ends on the spot (no sibling or
    /// descendant is visited afterwards) and the break value is handed back.
    pub fn walk<B>(&self, mut visit: impl FnMut(Visit) -> ControlFlow<B>) -> ControlFlow<B> {
        // Next child index for every open ancestor.
        let mut positions: SmallVec<[usize; 16]> = SmallVec::new();

        for edge in self.document.traverse(&self.arena) {
            match edge {
                NodeEdge::Start(id) if id == self.document => positions.push(0),
                NodeEdge::Start(id) => {
                    let Some(parent) = self.parent(id) else {
                        continue;
                    };
                    let index = positions.last().copied().unwrap_or_default();
                    if let ControlFlow::Break(b) = visit(Visit {
                        node: id,
                        parent,
                        index,
                    }) {
                        return ControlFlow::Break(b);
                    }
                    positions.push(0);
                }
                NodeEdge::End(_) => {
                    positions.pop();
                    if let Some(next) = positions.last_mut() {
                        *next += 1;
                    }
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Concatenated text of a node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in id.descendants(&self.arena) {
            if let NodeKind::Text(text) = &self.get(node).kind {
                out.push_str(text);
            }
        }
        out
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Create a detached HTML element. Attributes keep first-wins semantics.
    pub fn create_element<K, V>(
        &mut self,
        tag: &str,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) -> NodeId
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut map = IndexMap::new();
        for (name, value) in attrs {
            map.entry(name.into())
                .or_insert_with(|| StrTendril::from(value.as_ref()));
        }
        self.arena.new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag: StrTendril::from(tag),
                attrs: map,
            }),
            ns: Namespace::Html,
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Text(StrTendril::from(text)),
            ns: Namespace::Html,
        })
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Comment(StrTendril::from(text)),
            ns: Namespace::Html,
        })
    }

    /// Append `child` as the last child of `parent`, detaching it first if
    /// it already has a parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        child.detach(&mut self.arena);
        parent.append(child, &mut self.arena);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
