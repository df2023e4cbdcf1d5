use std::sync::LazyLock;

use kuchiki::traits::*;
use kuchiki::NodeRef;
use regex::Regex;

static DOCUMENT_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:html|body|div|p|br|table)[\s>/]").unwrap());

pub(super) fn looks_like_html_document(text: &str) -> bool {
    DOCUMENT_HINT.is_match(text)
}

/// Reduces an HTML mail body to its visible text. Block elements become
/// line breaks so that line-oriented stages still see header lines.
pub(super) fn html_to_text(html: &str) -> String {
    let document = kuchiki::parse_html().one(html);
    remove_html_comments(&document);
    remove_elements_by_selector(
        &document,
        "head, script, style, meta, link, title, noscript, xml, img",
    );
    remove_hidden_elements(&document);

    let mut out = String::with_capacity(html.len() / 2);
    collect_text(&document, &mut out);
    out
}

fn remove_html_comments(document: &NodeRef) {
    let nodes: Vec<NodeRef> = document.descendants().collect();
    for node in nodes {
        if node.as_comment().is_some() {
            node.detach();
        }
    }
}

fn remove_elements_by_selector(document: &NodeRef, selector: &str) {
    if let Ok(nodes) = document.select(selector) {
        let nodes: Vec<_> = nodes.collect();
        for node in nodes {
            node.as_node().detach();
        }
    }
}

fn remove_hidden_elements(document: &NodeRef) {
    let nodes: Vec<NodeRef> = document.descendants().collect();
    for node in nodes {
        let element = match node.as_element() {
            Some(value) => value,
            None => continue,
        };
        if is_hidden_element(element) {
            node.detach();
        }
    }
}

fn is_hidden_element(element: &kuchiki::ElementData) -> bool {
    let attrs = element.attributes.borrow();
    if attrs.contains("hidden") {
        return true;
    }
    if let Some(value) = attrs.get("aria-hidden") {
        if value.trim().eq_ignore_ascii_case("true") {
            return true;
        }
    }
    if let Some(style) = attrs.get("style") {
        if style_contains_hidden(style) {
            return true;
        }
    }
    false
}

fn style_contains_hidden(style: &str) -> bool {
    let normalized: String = style
        .to_ascii_lowercase()
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect();
    normalized.contains("display:none")
        || normalized.contains("visibility:hidden")
        || normalized.contains("mso-hide:all")
}

fn collect_text(node: &NodeRef, out: &mut String) {
    for child in node.children() {
        if let Some(text) = child.as_text() {
            out.push_str(&text.borrow());
            continue;
        }
        let Some(element) = child.as_element() else {
            continue;
        };
        let tag = element.name.local.as_ref();
        if tag == "br" {
            out.push('\n');
            continue;
        }
        let block = is_block_tag(tag);
        if block {
            out.push('\n');
        }
        collect_text(&child, out);
        if block {
            out.push('\n');
        }
    }
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "tr"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "blockquote"
            | "pre"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "hr"
    )
}
