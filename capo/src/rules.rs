//! Element classification: which loading-priority bucket a `<head>` child
//! falls into, and how much that bucket weighs.
//!
//! Classification runs an ordered list of detectors, [`DETECTORS`], and the
//! first one that matches decides the category. Detectors overlap (several
//! look at `<script>`), so the order is part of the rule set. Anything no
//! detector claims is [`Category::Other`].
//!
//! Attribute checks come in two flavors and must not be mixed up:
//! presence (`has`), which is true even for an empty value, and value
//! comparison. Value comparisons are exact, except against the keyword lists
//! ([`META_HTTP_EQUIV_KEYWORDS`], preload and prefetch `rel` values), which
//! lower-case the attribute value first. So `rel="Preload"` is a preload but
//! `rel="PRECONNECT"` is not a preconnect.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;

use indexmap::IndexMap;
use indextree::NodeId;
use tendril::StrTendril;

use crate::dom::Document;
use crate::tracing_macros::trace;

/// Read access to an element's attributes.
pub trait Attrs {
    /// Value of the attribute, `None` when absent.
    fn get(&self, name: &str) -> Option<&str>;

    /// Whether the attribute is present. An empty value still counts.
    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl Attrs for IndexMap<String, StrTendril> {
    fn get(&self, name: &str) -> Option<&str> {
        IndexMap::get(self, name).map(|v| v.as_ref())
    }
}

impl<S: BuildHasher> Attrs for HashMap<String, String, S> {
    fn get(&self, name: &str) -> Option<&str> {
        HashMap::get(self, name).map(String::as_str)
    }
}

impl Attrs for [(&str, &str)] {
    fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

impl<const N: usize> Attrs for [(&str, &str); N] {
    fn get(&self, name: &str) -> Option<&str> {
        Attrs::get(self.as_slice(), name)
    }
}

/// Loading-priority bucket of a `<head>` child.
///
/// Variants are declared from lowest to highest weight, so the derived `Ord`
/// agrees with [`Category::weight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Category {
    Other = 0,
    PrefetchPrerender = 1,
    DeferScript = 2,
    Preload = 3,
    SyncStyles = 4,
    SyncScript = 5,
    ImportStyles = 6,
    AsyncScript = 7,
    Preconnect = 8,
    Title = 9,
    Meta = 10,
}

impl Category {
    /// Every category, heaviest first.
    pub const ALL: [Category; 11] = [
        Category::Meta,
        Category::Title,
        Category::Preconnect,
        Category::AsyncScript,
        Category::ImportStyles,
        Category::SyncScript,
        Category::SyncStyles,
        Category::Preload,
        Category::DeferScript,
        Category::PrefetchPrerender,
        Category::Other,
    ];

    /// Sort weight: higher goes earlier in `<head>`.
    pub fn weight(self) -> u8 {
        self as u8
    }

    /// Upper snake case name, e.g. `ASYNC_SCRIPT`.
    pub fn name(self) -> &'static str {
        match self {
            Category::Meta => "META",
            Category::Title => "TITLE",
            Category::Preconnect => "PRECONNECT",
            Category::AsyncScript => "ASYNC_SCRIPT",
            Category::ImportStyles => "IMPORT_STYLES",
            Category::SyncScript => "SYNC_SCRIPT",
            Category::SyncStyles => "SYNC_STYLES",
            Category::Preload => "PRELOAD",
            Category::DeferScript => "DEFER_SCRIPT",
            Category::PrefetchPrerender => "PREFETCH_PRERENDER",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A detector looks at tag name, attributes and (for `<style>` only) the
/// serialized inner content.
pub type Detector = fn(&str, &dyn Attrs, &str) -> bool;

/// Detectors in evaluation order. First match wins.
///
/// This is the weight order except for [`Category::DeferScript`], which is
/// checked right after preconnect: a script with `src`, `async` and `defer`
/// is a deferred script.
pub const DETECTORS: &[(Category, Detector)] = &[
    (Category::Meta, is_meta),
    (Category::Title, is_title),
    (Category::Preconnect, is_preconnect),
    (Category::DeferScript, is_defer_script),
    (Category::AsyncScript, is_async_script),
    (Category::ImportStyles, is_import_styles),
    (Category::SyncScript, is_sync_script),
    (Category::SyncStyles, is_sync_styles),
    (Category::Preload, is_preload),
    (Category::PrefetchPrerender, is_prefetch_prerender),
];

/// `http-equiv` values that make a `<meta>` part of [`Category::Meta`].
pub const META_HTTP_EQUIV_KEYWORDS: &[&str] = &[
    "accept-ch",
    "content-security-policy",
    "content-type",
    "default-style",
    "delegate-ch",
    "origin-trial",
    "x-dns-prefetch-control",
];

const PRELOAD_RELS: &[&str] = &["preload", "modulepreload"];
const PREFETCH_PRERENDER_RELS: &[&str] = &["prefetch", "dns-prefetch", "prerender"];

/// Exact value comparison; false when the attribute is absent.
fn is(attrs: &dyn Attrs, name: &str, expected: &str) -> bool {
    attrs.get(name) == Some(expected)
}

/// Lower-cased value is one of `keywords`; false when absent.
fn any(attrs: &dyn Attrs, name: &str, keywords: &[&str]) -> bool {
    attrs
        .get(name)
        .is_some_and(|value| keywords.contains(&value.to_lowercase().as_str()))
}

/// Category of an element. Total: unknown shapes are [`Category::Other`].
pub fn classify(name: &str, attrs: &dyn Attrs, content: &str) -> Category {
    DETECTORS
        .iter()
        .find(|(_, detect)| detect(name, attrs, content))
        .map_or(Category::Other, |&(category, _)| category)
}

/// Shorthand for `classify(..).weight()`.
pub fn weight(name: &str, attrs: &dyn Attrs, content: &str) -> u8 {
    classify(name, attrs, content).weight()
}

// meta:is([charset], [http-equiv=<keyword>], [name=viewport]), base
pub fn is_meta(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    match name {
        "base" => true,
        "meta" => {
            attrs.has("charset")
                || is(attrs, "name", "viewport")
                || any(attrs, "http-equiv", META_HTTP_EQUIV_KEYWORDS)
        }
        _ => false,
    }
}

pub fn is_title(name: &str, _attrs: &dyn Attrs, _content: &str) -> bool {
    name == "title"
}

// link[rel=preconnect]
pub fn is_preconnect(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    name == "link" && is(attrs, "rel", "preconnect")
}

// script[src][async]
pub fn is_async_script(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    name == "script" && attrs.has("src") && attrs.has("async")
}

/// `<style>` whose content mentions `@import`. A plain substring scan, so an
/// `@import` inside a CSS comment counts too.
pub fn is_import_styles(name: &str, _attrs: &dyn Attrs, content: &str) -> bool {
    name == "style" && content.contains("@import")
}

// script:not([src][defer], [src][type=module], [src][async], [type*=json])
pub fn is_sync_script(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    if name != "script" {
        return false;
    }
    let ty = attrs.get("type").unwrap_or_default();
    let deferred = attrs.has("src")
        && (attrs.has("defer") || attrs.has("async") || ty == "module");
    !(deferred || ty.contains("json"))
}

// link[rel=stylesheet], style
pub fn is_sync_styles(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    match name {
        "style" => true,
        "link" => is(attrs, "rel", "stylesheet"),
        _ => false,
    }
}

// link:is([rel=preload], [rel=modulepreload])
pub fn is_preload(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    name == "link" && any(attrs, "rel", PRELOAD_RELS)
}

// script[src][defer], script:not([src][async])[src][type=module]
pub fn is_defer_script(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    if name != "script" || !attrs.has("src") {
        return false;
    }
    attrs.has("defer") || (is(attrs, "type", "module") && !attrs.has("async"))
}

// link:is([rel=prefetch], [rel=dns-prefetch], [rel=prerender])
pub fn is_prefetch_prerender(name: &str, attrs: &dyn Attrs, _content: &str) -> bool {
    name == "link" && any(attrs, "rel", PREFETCH_PRERENDER_RELS)
}

/// `<meta http-equiv="origin-trial">`, compared exactly. Not a ranking rule.
pub fn is_origin_trial(name: &str, attrs: &dyn Attrs) -> bool {
    name == "meta" && is(attrs, "http-equiv", "origin-trial")
}

/// `<meta http-equiv="Content-Security-Policy">`, compared exactly. Not a
/// ranking rule.
pub fn is_meta_csp(name: &str, attrs: &dyn Attrs) -> bool {
    name == "meta" && is(attrs, "http-equiv", "Content-Security-Policy")
}

impl Document {
    /// Category of an element node, `None` for text, comments and the
    /// document node.
    ///
    /// Only a `<style>` with children is serialized (for the `@import` scan);
    /// every other element is classified from its tag and attributes alone.
    pub fn classify(&self, id: NodeId) -> Option<Category> {
        let elem = self.element(id)?;
        let content = if elem.tag() == "style" && self.children(id).next().is_some() {
            Cow::Owned(self.inner_html(id))
        } else {
            Cow::Borrowed("")
        };
        let category = classify(elem.tag(), &elem.attrs, &content);
        trace!(tag = elem.tag(), %category, "classified");
        Some(category)
    }

    /// Weight of an element node, `None` for non-elements.
    pub fn weight(&self, id: NodeId) -> Option<u8> {
        self.classify(id).map(Category::weight)
    }
}
