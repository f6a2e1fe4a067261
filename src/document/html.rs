// src/document/html.rs
// =============================================================================
// This module extracts links and anchors from HTML embedded in markdown.
//
// Documentation often falls back to raw HTML for things markdown can't do:
// sized images, named anchors for old deep links, and so on. pulldown-cmark
// hands us those chunks verbatim as `Event::Html`, and we use the `scraper`
// crate to read them:
// - `<a href>` and `<img src>` become links
// - any element with an `id`, and `<a name>`, become anchors that `#fragment`
//   links may target
//
// Relative URLs are kept as written: they are resolved against the document
// on disk by the validator, not against a base URL.
// =============================================================================

use scraper::{Html, Selector};
use std::sync::OnceLock;

use super::LinkOrigin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum HtmlItem {
    Link { url: String, origin: LinkOrigin },
    Anchor(String),
}

struct Selectors {
    links: Selector,
    images: Selector,
    anchors: Selector,
}

// The selectors are constants, so failing to parse them is a programming
// error rather than bad input
fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        links: Selector::parse("a[href]").expect("valid selector"),
        images: Selector::parse("img[src]").expect("valid selector"),
        anchors: Selector::parse("[id], a[name]").expect("valid selector"),
    })
}

// Scans one HTML chunk
//
// Chunks are often a lone opening tag like `<a href="x">` (the closing tag
// arrives as a separate event); html5ever happily builds an element from it.
//
// Each item comes with the byte offset, inside `chunk`, of the tag that
// carries it. scraper keeps no source positions, so the tags are found again
// in the text: the n-th `<a>` element with an `href` is the n-th `<a` tag with
// an `href=` attribute. When that can't be matched the offset points at the
// first non-blank character of the chunk.
pub(super) fn scan(chunk: &str) -> Vec<(usize, HtmlItem)> {
    // Comments and closing tags can't carry links
    let trimmed = chunk.trim_start();
    if trimmed.starts_with("<!--") || trimmed.starts_with("</") {
        return Vec::new();
    }

    let fragment = Html::parse_fragment(chunk);
    let selectors = selectors();
    let fallback = chunk.len() - trimmed.len();
    let mut items = Vec::new();

    let ids = attribute_tags(chunk, None, "id");
    let names = attribute_tags(chunk, Some("a"), "name");
    let (mut next_id, mut next_name) = (0, 0);
    for element in fragment.select(&selectors.anchors) {
        let value = element.value();
        let (id, offset) = match value.attr("id") {
            Some(id) => {
                next_id += 1;
                (Some(id), ids.get(next_id - 1))
            }
            None => {
                next_name += 1;
                (value.attr("name"), names.get(next_name - 1))
            }
        };
        if let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) {
            let offset = offset.copied().unwrap_or(fallback);
            items.push((offset, HtmlItem::Anchor(id.to_string())));
        }
    }

    let hrefs = attribute_tags(chunk, Some("a"), "href");
    for (n, element) in fragment.select(&selectors.links).enumerate() {
        if let Some(href) = element.value().attr("href") {
            let item = HtmlItem::Link {
                url: href.to_string(),
                origin: LinkOrigin::Html,
            };
            items.push((hrefs.get(n).copied().unwrap_or(fallback), item));
        }
    }

    let sources = attribute_tags(chunk, Some("img"), "src");
    for (n, element) in fragment.select(&selectors.images).enumerate() {
        if let Some(src) = element.value().attr("src") {
            let item = HtmlItem::Link {
                url: src.to_string(),
                origin: LinkOrigin::Image,
            };
            items.push((sources.get(n).copied().unwrap_or(fallback), item));
        }
    }

    items
}

// Byte offsets of the `<` of every tag (named `tag`, or any tag) carrying an
// `attribute=`, in text order
fn attribute_tags(chunk: &str, tag: Option<&str>, attribute: &str) -> Vec<usize> {
    // ASCII lower-casing keeps byte offsets intact
    let lower = chunk.to_ascii_lowercase();
    let mut offsets = Vec::new();

    for (position, _) in lower.match_indices(attribute) {
        let before = &lower[..position];
        let after = &lower[position + attribute.len()..];
        if !before.ends_with(char::is_whitespace) || !after.trim_start().starts_with('=') {
            continue;
        }
        // The attribute must sit inside an open tag
        let Some(start) = before.rfind('<') else {
            continue;
        };
        if before[start..].contains('>') {
            continue;
        }
        if let Some(tag) = tag {
            let name: String = lower[start + 1..]
                .chars()
                .take_while(char::is_ascii_alphanumeric)
                .collect();
            if name != tag {
                continue;
            }
        }
        offsets.push(start);
    }

    offsets
}
