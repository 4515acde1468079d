//! Allow-list HTML sanitizer and the [`SafeHtml`] type it produces.
//!
//! Bodies come from a third-party rich-text editor and are treated as
//! hostile. The sanitizer parses the fragment with `scraper` (html5ever),
//! then re-serializes only what the allow-lists below permit:
//!
//! - allowed elements are emitted with their allowed attributes
//! - script-like elements are dropped together with their content
//! - any other element is unwrapped: its tag disappears, its children stay
//! - comments, doctypes and processing instructions are dropped
//!
//! Because the output is produced by our own serializer, nothing from the
//! input reaches the output without being escaped or explicitly allowed.

use scraper::{ElementRef, Html, Node};
use serde::Serialize;
use std::fmt;

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "table", "thead",
    "tbody", "tfoot", "tr", "th", "td", "caption", "colgroup", "col", "blockquote", "a", "img",
    "figure", "figcaption", "strong", "b", "em", "i", "u", "s", "sub", "sup", "code", "pre",
    "mark", "span", "small",
];

const ALLOWED_ATTRS: &[&str] = &[
    "href", "src", "alt", "width", "height", "class", "style", "colspan", "rowspan", "target",
    "rel",
];

/// Elements whose content is never rendered, not even as text.
const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "noscript",
    "template", "textarea", "select", "button", "form", "svg", "math", "head", "title", "base",
    "link", "meta",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img", "col"];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Markup that has passed through [`sanitize`].
///
/// There is no public constructor from an arbitrary string; render call
/// sites that accept `SafeHtml` therefore cannot be handed raw bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filter `html` against the element and attribute allow-lists.
pub fn sanitize(html: &str) -> SafeHtml {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(fragment.root_element(), &mut out);
    SafeHtml(out)
}

fn write_children(parent: ElementRef<'_>, out: &mut String) {
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            write_element(element, out);
        } else if let Node::Text(text) = child.value() {
            push_escaped_text(out, text);
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if DROP_WITH_CONTENT.contains(&name) {
        return;
    }
    if !ALLOWED_TAGS.contains(&name) {
        write_children(element, out);
        return;
    }

    out.push('<');
    out.push_str(name);
    let mut has_rel = false;
    let mut opens_new_tab = false;
    for (attr, value) in element.value().attrs() {
        let Some(value) = allowed_value(attr, value) else {
            continue;
        };
        has_rel |= attr == "rel";
        opens_new_tab |= attr == "target" && value == "_blank";
        push_attr(out, attr, &value);
    }
    if name == "a" && opens_new_tab && !has_rel {
        push_attr(out, "rel", "noopener noreferrer");
    }
    out.push('>');

    if VOID_TAGS.contains(&name) {
        return;
    }
    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// The value to emit for `attr`, or `None` when the attribute must go.
fn allowed_value(attr: &str, value: &str) -> Option<String> {
    if !ALLOWED_ATTRS.contains(&attr) {
        return None;
    }
    match attr {
        "href" | "src" => is_safe_url(value).then(|| value.trim().to_string()),
        "width" | "height" | "colspan" | "rowspan" => {
            let v = value.trim();
            let digits = v.strip_suffix('%').unwrap_or(v);
            (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then(|| v.to_string())
        }
        "target" => matches!(value, "_blank" | "_self" | "_parent" | "_top").then(|| value.to_string()),
        "style" => {
            let lower = value.to_ascii_lowercase();
            let hostile = ["expression(", "javascript:", "url(", "@import", "behavior:"]
                .iter()
                .any(|needle| lower.contains(needle));
            (!hostile).then(|| value.to_string())
        }
        _ => Some(value.to_string()),
    }
}

/// Relative references and a short list of schemes are allowed.
fn is_safe_url(value: &str) -> bool {
    // Browsers ignore embedded whitespace and control characters in schemes
    // (`java\tscript:`), so they are removed before looking at the scheme.
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match compact.find(|c| matches!(c, ':' | '/' | '?' | '#')) {
        Some(i) if compact[i..].starts_with(':') => SAFE_SCHEMES.contains(&&compact[..i]),
        _ => true,
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn push_escaped_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
