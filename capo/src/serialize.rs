//! HTML5 serializer for the arena DOM.
//!
//! Follows HTML5 serialization rules:
//!
//! - Void elements never get end tags
//! - Text content is escaped
//! - Attribute values are escaped and double-quoted
//! - Raw text elements (script, style, ...) are not escaped
//! - RCDATA elements (title, textarea) escape only `&` and `<`
//! - Foreign content (SVG/MathML) uses self-closing syntax when empty

use std::fmt::Write;

use indextree::NodeId;

use crate::dom::{Document, ElementData, Namespace, NodeKind};

/// Options for HTML serialization.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Whether to sort attributes alphabetically (default: false, source order).
    /// Enable this for deterministic output (snapshots, caching).
    pub sort_attributes: bool,
    /// Whether to escape `</script` sequences in script content as `<\/script`
    /// (default: false, script text is written exactly as parsed)
    pub escape_script_end_tags: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            sort_attributes: false,
            escape_script_end_tags: false,
        }
    }
}

impl SerializeOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable sorting attributes alphabetically for deterministic output.
    pub fn sort_attributes(mut self) -> Self {
        self.sort_attributes = true;
        self
    }

    /// Escape `</script` in script content, for markup that will be embedded
    /// inside another script.
    pub fn escape_script_end_tags(mut self) -> Self {
        self.escape_script_end_tags = true;
        self
    }
}

/// Serialize a whole document: doctype, then every child of the document node.
pub fn serialize_document(doc: &Document, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    let mut ser = Serializer::new(doc, &mut out, opts);
    if let Some(doctype) = &doc.doctype {
        ser.write_str("<!DOCTYPE ");
        ser.write_str(doctype);
        ser.write_str(">");
    }
    ser.write_children(doc.document);
    out
}

/// Serialize a node and its subtree ("outer HTML").
pub fn serialize_node(doc: &Document, id: NodeId, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    Serializer::new(doc, &mut out, opts).write_node(id);
    out
}

/// Serialize the children of a node ("inner HTML").
pub fn serialize_children(doc: &Document, id: NodeId, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    Serializer::new(doc, &mut out, opts).write_children(id);
    out
}

/// HTML5 void elements - these never have end tags.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements - content is written verbatim. `noscript` is included
/// because html5ever parses with scripting enabled.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
];

/// RCDATA elements - only `&` and `<` are escaped.
pub(crate) const RCDATA_ELEMENTS: &[&str] = &["title", "textarea"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Escaped,
    Rcdata,
    Raw,
}

struct Serializer<'a, W: Write> {
    doc: &'a Document,
    out: &'a mut W,
    options: &'a SerializeOptions,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(doc: &'a Document, out: &'a mut W, options: &'a SerializeOptions) -> Self {
        Self { doc, out, options }
    }

    fn write_str(&mut self, s: &str) {
        // Writing into a String cannot fail
        let _ = self.out.write_str(s);
    }

    fn write_char(&mut self, c: char) {
        let _ = self.out.write_char(c);
    }

    fn text_mode(&self, parent: Option<NodeId>) -> TextMode {
        let Some(parent) = parent else {
            return TextMode::Escaped;
        };
        let data = self.doc.get(parent);
        match &data.kind {
            NodeKind::Element(elem) if data.ns == Namespace::Html => {
                if RAW_TEXT_ELEMENTS.contains(&elem.tag()) {
                    TextMode::Raw
                } else if RCDATA_ELEMENTS.contains(&elem.tag()) {
                    TextMode::Rcdata
                } else {
                    TextMode::Escaped
                }
            }
            _ => TextMode::Escaped,
        }
    }

    fn write_children(&mut self, id: NodeId) {
        let doc = self.doc;
        for child in doc.children(id) {
            self.write_node(child);
        }
    }

    fn write_node(&mut self, id: NodeId) {
        let doc = self.doc;
        let data = doc.get(id);
        match &data.kind {
            NodeKind::Document => self.write_children(id),
            NodeKind::Element(elem) => self.write_element(id, elem, data.ns),
            NodeKind::Text(text) => match self.text_mode(doc.parent(id)) {
                TextMode::Raw => {
                    let tag = doc
                        .parent(id)
                        .and_then(|p| doc.element(p))
                        .map(|e| e.tag())
                        .unwrap_or_default();
                    self.write_raw_text(text, tag);
                }
                TextMode::Rcdata => self.write_rcdata_escaped(text),
                TextMode::Escaped => self.write_text_escaped(text),
            },
            NodeKind::Comment(text) => {
                self.write_str("<!--");
                self.write_str(text);
                self.write_str("-->");
            }
        }
    }

    fn write_element(&mut self, id: NodeId, elem: &ElementData, ns: Namespace) {
        let tag = elem.tag();

        self.write_char('<');
        self.write_str(tag);

        if self.options.sort_attributes {
            let mut attrs: Vec<_> = elem.attrs.iter().collect();
            attrs.sort_by_key(|(k, _)| *k);
            for (name, value) in attrs {
                self.write_attr(name, value);
            }
        } else {
            for (name, value) in &elem.attrs {
                self.write_attr(name, value);
            }
        }

        if ns == Namespace::Html && VOID_ELEMENTS.contains(&tag) {
            self.write_char('>');
            return;
        }

        let doc = self.doc;
        if ns != Namespace::Html && doc.children(id).next().is_none() {
            self.write_str("/>");
            return;
        }

        self.write_char('>');
        self.write_children(id);
        self.write_str("</");
        self.write_str(tag);
        self.write_char('>');
    }

    fn write_attr(&mut self, name: &str, value: &str) {
        self.write_char(' ');
        self.write_str(name);
        self.write_str("=\"");
        for c in value.chars() {
            match c {
                '&' => self.write_str("&amp;"),
                '"' => self.write_str("&quot;"),
                '<' => self.write_str("&lt;"),
                '>' => self.write_str("&gt;"),
                _ => self.write_char(c),
            }
        }
        self.write_char('"');
    }

    fn write_text_escaped(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '&' => self.write_str("&amp;"),
                '<' => self.write_str("&lt;"),
                '>' => self.write_str("&gt;"),
                _ => self.write_char(c),
            }
        }
    }

    fn write_rcdata_escaped(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '&' => self.write_str("&amp;"),
                '<' => self.write_str("&lt;"),
                _ => self.write_char(c),
            }
        }
    }

    /// Write raw text content, optionally escaping script end tags.
    fn write_raw_text(&mut self, text: &str, tag: &str) {
        if !(self.options.escape_script_end_tags && tag == "script") {
            self.write_str(text);
            return;
        }

        // ASCII case-insensitive match on bytes; the pattern is ASCII so
        // every match starts on a char boundary.
        const PATTERN: &[u8] = b"</script";
        let bytes = text.as_bytes();
        let mut last_end = 0;
        let mut i = 0;
        while i + PATTERN.len() <= bytes.len() {
            if bytes[i..i + PATTERN.len()].eq_ignore_ascii_case(PATTERN) {
                self.write_str(&text[last_end..i]);
                self.write_str("<\\/script");
                i += PATTERN.len();
                last_end = i;
            } else {
                i += 1;
            }
        }
        self.write_str(&text[last_end..]);
    }
}

// =============================================================================
// Convenience methods on Document
// =============================================================================

impl Document {
    /// Serialize this document to an HTML string with default options.
    pub fn to_html(&self) -> String {
        serialize_document(self, &SerializeOptions::default())
    }

    /// Serialize this document with custom options.
    pub fn to_html_with_options(&self, opts: &SerializeOptions) -> String {
        serialize_document(self, opts)
    }

    /// Serialize one node and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        serialize_node(self, id, &SerializeOptions::default())
    }

    /// Serialize the children of a node.
    pub fn inner_html(&self, id: NodeId) -> String {
        serialize_children(self, id, &SerializeOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn element_with_text(doc: &mut Document, tag: &str, text: &str) -> NodeId {
        let elem = doc.create_element::<&str, &str>(tag, []);
        let text = doc.create_text(text);
        doc.append(elem, text);
        elem
    }

    #[test]
    fn test_void_elements() {
        let mut doc = Document::new();
        let div = doc.create_element::<&str, &str>("div", []);
        let br = doc.create_element::<&str, &str>("br", []);
        let meta = doc.create_element("meta", [("charset", "utf-8")]);
        doc.append(div, br);
        doc.append(div, meta);
        assert_eq!(doc.outer_html(div), r#"<div><br><meta charset="utf-8"></div>"#);
    }

    #[test]
    fn test_text_escaping() {
        let mut doc = Document::new();
        let p = element_with_text(&mut doc, "p", "<script>alert('xss')</script> & co");
        assert_eq!(
            doc.outer_html(p),
            "<p>&lt;script&gt;alert('xss')&lt;/script&gt; &amp; co</p>"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = Document::new();
        let a = doc.create_element("a", [("href", "test?a=1&b=2"), ("title", "Say \"hi\"")]);
        assert_eq!(
            doc.outer_html(a),
            r#"<a href="test?a=1&amp;b=2" title="Say &quot;hi&quot;"></a>"#
        );
    }

    #[test]
    fn test_raw_text_elements() {
        let mut doc = Document::new();
        let style = element_with_text(&mut doc, "style", "a > b { content: \"&\" }");
        assert_eq!(doc.inner_html(style), "a > b { content: \"&\" }");

        let script = element_with_text(&mut doc, "script", "if (a < b && c > d) {}");
        assert_eq!(doc.inner_html(script), "if (a < b && c > d) {}");
    }

    #[test]
    fn test_script_end_tag_escaping_is_opt_in() {
        let mut doc = Document::new();
        let script = element_with_text(&mut doc, "script", "var x = '</SCRIPT>';");
        assert_eq!(doc.inner_html(script), "var x = '</SCRIPT>';");

        let opts = SerializeOptions::new().escape_script_end_tags();
        assert_eq!(
            serialize_children(&doc, script, &opts),
            "var x = '<\\/script>';"
        );
    }

    #[test]
    fn test_script_text_round_trips_unchanged() {
        let html = r#"<head><script>var s = "</scriptx>"; if (a < b && c) {}</script></head>"#;
        assert_eq!(parse(html).to_html(), html);
    }

    #[test]
    fn test_to_html_with_options() {
        let doc = parse(r#"<head><meta name="viewport" content="w"><script>x = "</script-ish>"</script></head>"#);
        let opts = SerializeOptions::new().sort_attributes().escape_script_end_tags();
        assert_eq!(
            doc.to_html_with_options(&opts),
            r#"<head><meta content="w" name="viewport"><script>x = "<\/script-ish>"</script></head>"#
        );
    }

    #[test]
    fn test_rcdata_elements() {
        let mut doc = Document::new();
        let title = element_with_text(&mut doc, "title", "Test & <Demo>");
        assert_eq!(doc.outer_html(title), "<title>Test &amp; &lt;Demo></title>");
    }

    #[test]
    fn test_comment_serialization() {
        let mut doc = Document::new();
        let head = doc.create_element::<&str, &str>("head", []);
        let comment = doc.create_comment(" keep me ");
        doc.append(head, comment);
        assert_eq!(doc.outer_html(head), "<head><!-- keep me --></head>");
    }

    #[test]
    fn test_sorted_attributes() {
        let mut doc = Document::new();
        let elem = doc.create_element("div", [("zebra", "1"), ("alpha", "2"), ("mike", "3")]);
        let opts = SerializeOptions::new().sort_attributes();
        assert_eq!(
            serialize_node(&doc, elem, &opts),
            r#"<div alpha="2" mike="3" zebra="1"></div>"#
        );
        assert_eq!(
            doc.outer_html(elem),
            r#"<div zebra="1" alpha="2" mike="3"></div>"#
        );
    }

    #[test]
    fn test_document_roundtrip() {
        let html = concat!(
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">",
            "<title>T</title></head><body><p class=\"x\">Hi</p></body></html>"
        );
        assert_eq!(parse(html).to_html(), html);
    }

    #[test]
    fn test_foreign_content_self_closing() {
        let doc = parse("<body><svg><rect></rect><circle/></svg></body>");
        let body = doc.body().expect("body");
        assert_eq!(doc.inner_html(body), "<svg><rect/><circle/></svg>");
    }
}
