//! End-to-end tests for head reordering.

mod common;

use capo::{
    Category, Document, NodeId, NodeKind, parse, reorder, reorder_head, reorder_head_element,
};

/// Serialized element children of the first head.
fn head_children(doc: &Document) -> Vec<String> {
    let head = doc.head().expect("document should have a head");
    doc.children(head).map(|id| doc.outer_html(id)).collect()
}

fn weights(doc: &Document, parent: NodeId) -> Vec<u8> {
    doc.element_children(parent)
        .map(|id| doc.weight(id).expect("element"))
        .collect()
}

#[test]
fn scripts_titles_meta_and_styles() {
    common::setup();
    let doc = reorder(parse(concat!(
        r#"<head><script src="a.js" defer></script><title>T</title>"#,
        r#"<meta charset="utf-8"><link rel="stylesheet" href="b.css"></head>"#,
    )));
    assert_eq!(
        head_children(&doc),
        [
            r#"<meta charset="utf-8">"#,
            "<title>T</title>",
            r#"<link rel="stylesheet" href="b.css">"#,
            r#"<script src="a.js" defer=""></script>"#,
        ]
    );
    let head = doc.head().expect("head");
    assert_eq!(weights(&doc, head), [10, 9, 4, 2]);
}

#[test]
fn equal_weights_keep_source_order() {
    common::setup();
    let doc = reorder(parse(
        r#"<head><link rel="preload" href="x"><title>T</title><link rel="preload" href="y"></head>"#,
    ));
    assert_eq!(
        head_children(&doc),
        [
            "<title>T</title>",
            r#"<link rel="preload" href="x">"#,
            r#"<link rel="preload" href="y">"#,
        ]
    );
}

#[test]
fn sync_scripts_keep_author_order() {
    common::setup();
    let doc = reorder(parse(concat!(
        "<head><script>var a = 1;</script><link rel=\"prefetch\" href=\"p\">",
        "<script src=\"b.js\"></script><script>var c = a < 2;</script></head>",
    )));
    assert_eq!(
        head_children(&doc),
        [
            "<script>var a = 1;</script>",
            r#"<script src="b.js"></script>"#,
            "<script>var c = a < 2;</script>",
            r#"<link rel="prefetch" href="p">"#,
        ]
    );
}

#[test]
fn import_styles_outrank_plain_styles() {
    common::setup();
    let doc = reorder(parse(
        "<head><style>body{color:red}</style><style>@import url(f.css);</style></head>",
    ));
    assert_eq!(
        head_children(&doc),
        [
            "<style>@import url(f.css);</style>",
            "<style>body{color:red}</style>"
        ]
    );
    let head = doc.head().expect("head");
    let categories: Vec<_> = doc
        .element_children(head)
        .filter_map(|id| doc.classify(id))
        .collect();
    assert_eq!(categories, [Category::ImportStyles, Category::SyncStyles]);
}

#[test]
fn text_and_comments_are_dropped() {
    common::setup();
    let doc = reorder(parse(
        "<head>\n  <!-- analytics -->\n  <link rel=\"icon\" href=\"f.ico\">\n  <title>T</title>\n</head>",
    ));
    let head = doc.head().expect("head");
    assert!(
        doc.children(head)
            .all(|id| matches!(doc.get(id).kind, NodeKind::Element(_)))
    );
    assert_eq!(
        head_children(&doc),
        ["<title>T</title>", r#"<link rel="icon" href="f.ico">"#]
    );
}

#[test]
fn body_is_left_alone() {
    common::setup();
    let html = concat!(
        "<!DOCTYPE html><html><head><script src=\"late.js\" defer></script><title>T</title></head>",
        "<body>\n<!-- c --><p>b</p><script src=\"z.js\" defer></script><meta charset=\"utf-8\"></body></html>",
    );
    let out = reorder_head(html);
    assert_eq!(
        out,
        concat!(
            "<!DOCTYPE html><html><head><title>T</title><script src=\"late.js\" defer=\"\"></script></head>",
            "<body>\n<!-- c --><p>b</p><script src=\"z.js\" defer=\"\"></script><meta charset=\"utf-8\"></body></html>",
        )
    );
}

#[test]
fn head_children_the_parser_does_not_know_stay_in_head() {
    common::setup();
    let html = reorder_head_element(
        r#"<head><title>T</title><my-el></my-el>stray<meta charset="utf-8"></head>"#,
    );
    assert_eq!(
        html.as_deref(),
        Some(r#"<head><meta charset="utf-8"><title>T</title><my-el></my-el></head>"#)
    );
}

#[test]
fn markup_without_head_is_returned_as_is() {
    common::setup();
    let html = "<body>\n<p>a &lt; b</p>\n<meta charset=\"utf-8\">\n</body>";
    assert_eq!(reorder_head(html), html);
    assert_eq!(reorder_head_element(html), None);
}

#[test]
fn no_head_round_trips_unchanged() {
    common::setup();
    let mut doc = Document::new();
    let div = doc.create_element("div", [("class", "x")]);
    let text = doc.create_text("hello & bye");
    doc.append(doc.document, div);
    doc.append(div, text);
    let before = doc.to_html();

    let doc = reorder(doc);
    assert_eq!(doc.to_html(), before);
    assert_eq!(before, r#"<div class="x">hello &amp; bye</div>"#);
}

#[test]
fn reordering_is_idempotent() {
    common::setup();
    let html = concat!(
        "<head><link rel=\"dns-prefetch\" href=\"//a\"><script src=\"m.js\" type=\"module\"></script>",
        "<link rel=\"modulepreload\" href=\"m.js\"><style>a{}</style><script>1</script>",
        "<style>@import 'x.css';</style><script async src=\"a.js\"></script>",
        "<link rel=\"preconnect\" href=\"https://a\"><title>T</title><base href=\"/\">",
        "<script type=\"application/ld+json\">{}</script><meta name=\"viewport\" content=\"w\"></head>",
    );
    let once = reorder_head(html);
    let twice = reorder_head(&once);
    assert_eq!(once, twice);

    let doc = parse(&once);
    let head = doc.head().expect("head");
    assert_eq!(weights(&doc, head), [10, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
}

/// Small deterministic generator so the property tests need no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as usize
    }
}

const CATALOG: &[&str] = &[
    r#"<meta charset="utf-8">"#,
    "<title>T</title>",
    r#"<link rel="preconnect" href="https://cdn">"#,
    r#"<script src="a.js" async></script>"#,
    "<style>@import 'i.css';</style>",
    "<script>inline()</script>",
    "<style>p{}</style>",
    r#"<link rel="stylesheet" href="s.css">"#,
    r#"<link rel="preload" href="f.woff2" as="font">"#,
    r#"<script src="d.js" defer></script>"#,
    r#"<link rel="prefetch" href="next.html">"#,
    r#"<link rel="icon" href="favicon.ico">"#,
    "<!-- comment -->",
    "\n  ",
    "<my-el></my-el>",
    "stray",
    r#"<script src="ad.js" async defer></script>"#,
];

#[test]
fn weights_are_monotonic_and_ties_are_stable() {
    common::setup();
    let mut rng = Lcg(0x5eed);

    for round in 0..200 {
        let len = rng.next() % 12;
        let mut html = String::from("<head>");
        for i in 0..len {
            let piece = CATALOG[rng.next() % CATALOG.len()];
            if piece.starts_with("<!--") || !piece.starts_with('<') {
                html.push_str(piece);
            } else {
                // tag elements with their source position
                html.push_str(&piece.replacen('>', &format!(" data-i=\"{i}\">"), 1));
            }
        }
        html.push_str("</head>");

        let doc = reorder(parse(&html));
        let head = doc.head().expect("head");
        let elements = (0..len)
            .filter(|i| html.contains(&format!("data-i=\"{i}\"")))
            .count();
        assert_eq!(doc.children(head).count(), elements, "round {round}: {html}");

        let mut previous: Option<(u8, usize)> = None;
        for id in doc.children(head) {
            let elem = doc
                .element(id)
                .unwrap_or_else(|| panic!("round {round}: non-element survived in {html}"));
            let weight = doc.weight(id).expect("element");
            let index: usize = elem
                .attr("data-i")
                .and_then(|i| i.parse().ok())
                .expect("data-i");
            if let Some((prev_weight, prev_index)) = previous {
                assert!(
                    prev_weight > weight || (prev_weight == weight && prev_index < index),
                    "round {round}: ({prev_weight}, {prev_index}) before ({weight}, {index}) in {html}"
                );
            }
            previous = Some((weight, index));
        }
    }
}

fn fill(doc: &mut Document, head: NodeId) {
    let script = doc.create_element("script", [("src", "d.js"), ("defer", "")]);
    let ws = doc.create_text(" ");
    let meta = doc.create_element("meta", [("charset", "utf-8")]);
    doc.append(head, script);
    doc.append(head, ws);
    doc.append(head, meta);
}

/// html > [head, body > [div > head]], plus a second top-level head.
fn multi_head_document() -> (Document, NodeId, NodeId, NodeId) {
    let mut doc = Document::new();
    let html = doc.create_element::<&str, &str>("html", []);
    doc.append(doc.document, html);

    let first = doc.create_element::<&str, &str>("head", []);
    doc.append(html, first);
    fill(&mut doc, first);

    let body = doc.create_element::<&str, &str>("body", []);
    let div = doc.create_element::<&str, &str>("div", []);
    let nested = doc.create_element::<&str, &str>("head", []);
    doc.append(html, body);
    doc.append(body, div);
    doc.append(div, nested);
    fill(&mut doc, nested);

    let second = doc.create_element::<&str, &str>("head", []);
    doc.append(html, second);
    fill(&mut doc, second);

    (doc, first, nested, second)
}

#[test]
fn only_the_first_head_is_reordered() {
    common::setup();
    let (mut doc, first, nested, second) = multi_head_document();

    assert_eq!(doc.reorder_head(), Some(first));

    assert_eq!(
        doc.outer_html(first),
        r#"<head><meta charset="utf-8"><script src="d.js" defer=""></script></head>"#
    );
    let untouched = r#"<head><script src="d.js" defer=""></script> <meta charset="utf-8"></head>"#;
    assert_eq!(doc.outer_html(nested), untouched);
    assert_eq!(doc.outer_html(second), untouched);
}

#[test]
fn only_the_first_parsed_head_is_reordered() {
    common::setup();
    let html = concat!(
        "<html><head><script src=\"d.js\" defer></script> <meta charset=\"utf-8\"></head>",
        "<body><head><script src=\"d.js\" defer></script> <meta charset=\"utf-8\"></head></body></html>",
    );
    assert_eq!(
        reorder_head(html),
        concat!(
            "<html><head><meta charset=\"utf-8\"><script src=\"d.js\" defer=\"\"></script></head>",
            "<body><head><script src=\"d.js\" defer=\"\"></script> <meta charset=\"utf-8\"></head></body></html>",
        )
    );
}

#[test]
fn first_head_in_document_order_wins() {
    common::setup();
    let (mut doc, first, nested, _second) = multi_head_document();
    // With the top-level head gone, the one nested in <body> comes first.
    first.remove_subtree(&mut doc.arena);

    assert_eq!(doc.reorder_head(), Some(nested));
    assert_eq!(
        doc.outer_html(nested),
        r#"<head><meta charset="utf-8"><script src="d.js" defer=""></script></head>"#
    );
}
