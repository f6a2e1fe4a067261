// src/document/markdown.rs
// =============================================================================
// This module extracts links and headings from Markdown text.
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Can report the byte range of every event (`into_offset_iter`), which is
//   how each object gets its line and column
//
// Links are recorded whatever their scheme: classification happens later.
// =============================================================================

use pulldown_cmark::{BrokenLink, Event, LinkType, Options, Parser, Tag};
use std::path::Path;

use super::html;
use super::position::LineIndex;
use super::{DocumentObject, Heading, Hyperlink, LinkOrigin, Parsed};
use crate::report::{Finding, Severity};

// A heading whose end event we haven't seen yet
struct OpenHeading {
    offset: usize,
    id: Option<String>,
    title: String,
}

// Walks the markdown events of `text` and appends headings, hyperlinks and
// undefined-reference findings to `parsed`
pub(super) fn extract(text: &str, file: &Path, index: &LineIndex<'_>, parsed: &mut Parsed) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    // `[text][label]` whose label has no definition. Shortcut `[label]` is
    // left alone: square brackets in prose are far too common.
    let mut undefined: Vec<(usize, String)> = Vec::new();

    {
        let callback = &mut |broken: BrokenLink| {
            if matches!(
                broken.link_type,
                LinkType::Reference
                    | LinkType::ReferenceUnknown
                    | LinkType::Collapsed
                    | LinkType::CollapsedUnknown
            ) {
                undefined.push((broken.span.start, broken.reference.to_string()));
            }
            None
        };
        let parser = Parser::new_with_broken_link_callback(text, options, Some(callback));

        let mut heading: Option<OpenHeading> = None;

        for (event, range) in parser.into_offset_iter() {
            match event {
                Event::Start(Tag::Heading(_level, id, _classes)) => {
                    heading = Some(OpenHeading {
                        offset: range.start,
                        id: id.map(str::to_string),
                        title: String::new(),
                    });
                }

                Event::End(Tag::Heading(..)) => {
                    if let Some(open) = heading.take() {
                        let (line, column) = index.position(open.offset);
                        parsed.objects.push(DocumentObject::Heading(Heading {
                            file: file.to_path_buf(),
                            line,
                            column,
                            title: open.title.trim().to_string(),
                            id: open.id,
                        }));
                    }
                }

                Event::Text(fragment) | Event::Code(fragment) => {
                    if let Some(open) = heading.as_mut() {
                        open.title.push_str(&fragment);
                    }
                }

                Event::Start(Tag::Link(link_type, dest_url, _title)) => {
                    let (raw, origin) = match link_type {
                        LinkType::Email => (format!("mailto:{}", dest_url), LinkOrigin::Email),
                        LinkType::Autolink => (dest_url.to_string(), LinkOrigin::Autolink),
                        LinkType::Inline => (dest_url.to_string(), LinkOrigin::Inline),
                        _ => (dest_url.to_string(), LinkOrigin::Reference),
                    };
                    push_link(parsed, file, index, range.start, raw, origin);
                }

                Event::Start(Tag::Image(_link_type, dest_url, _title)) => {
                    let raw = dest_url.to_string();
                    push_link(parsed, file, index, range.start, raw, LinkOrigin::Image);
                }

                Event::Html(chunk) => {
                    // Offsets inside the chunk only hold when it is the source
                    // text verbatim (not stripped of blockquote markers)
                    let source = text.get(range.clone()).unwrap_or_default();
                    let verbatim = source == &*chunk;
                    let lead = source.len() - source.trim_start().len();

                    for (offset, item) in html::scan(&chunk) {
                        let at = range.start + if verbatim { offset } else { lead };
                        match item {
                            html::HtmlItem::Link { url, origin } => {
                                push_link(parsed, file, index, at, url, origin);
                            }
                            html::HtmlItem::Anchor(id) => {
                                let (line, column) = index.position(at);
                                parsed.objects.push(DocumentObject::Heading(Heading {
                                    file: file.to_path_buf(),
                                    line,
                                    column,
                                    title: String::new(),
                                    id: Some(id),
                                }));
                            }
                        }
                    }
                }

                _ => {}
            }
        }
    }

    for (offset, label) in undefined {
        let (line, column) = index.position(offset);
        parsed.findings.push(Finding::new(
            file,
            line,
            column,
            Severity::Suggestion,
            format!("link reference '{}' is not defined", label),
        ));
    }
}

fn push_link(
    parsed: &mut Parsed,
    file: &Path,
    index: &LineIndex<'_>,
    offset: usize,
    raw: String,
    origin: LinkOrigin,
) {
    let (line, column) = index.position(offset);
    parsed.objects.push(DocumentObject::Hyperlink(Hyperlink {
        file: file.to_path_buf(),
        line,
        column,
        raw: raw.trim().to_string(),
        origin,
    }));
}

// Blanks out a leading YAML front matter block
//
// The block is replaced by as many empty lines as it had, so every position
// computed on the returned text is still valid in the original file. Without
// this, pulldown-cmark would read `key: value` followed by `---` as a setext
// heading. The `uid:` entry, if any, is returned alongside.
pub fn strip_front_matter(text: &str) -> (String, Option<String>) {
    let mut lines = text.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return (text.to_string(), None),
    }

    let mut consumed = 1;
    let mut uid = None;
    let mut closed = false;

    for line in lines.by_ref() {
        consumed += 1;
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            closed = true;
            break;
        }
        if let Some(value) = trimmed.strip_prefix("uid:") {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if !value.is_empty() {
                uid = Some(value.to_string());
            }
        }
    }

    if !closed {
        return (text.to_string(), None);
    }

    let mut body = "\n".repeat(consumed);
    body.extend(lines);
    (body, uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Parsed {
        let mut parsed = Parsed::default();
        let index = LineIndex::new(text);
        extract(text, Path::new("doc.md"), &index, &mut parsed);
        parsed
    }

    fn links(parsed: &Parsed) -> Vec<(String, usize, usize)> {
        parsed
            .hyperlinks()
            .map(|l| (l.raw.clone(), l.line, l.column))
            .collect()
    }

    #[test]
    fn test_extract_simple_link() {
        let parsed = parse("Check out [Rust](https://www.rust-lang.org)!");
        assert_eq!(links(&parsed), vec![("https://www.rust-lang.org".to_string(), 1, 11)]);
    }

    #[test]
    fn test_extract_multiple_links() {
        let markdown = r#"
# Resources

- [Rust](https://www.rust-lang.org)
- [Guide](./guide.md#install)
- ![Logo](.attachments/logo.png)
- Mail [me](mailto:test@example.com)
"#;
        let parsed = parse(markdown);
        let raws: Vec<_> = links(&parsed).into_iter().map(|(raw, ..)| raw).collect();
        assert_eq!(
            raws,
            vec![
                "https://www.rust-lang.org",
                "./guide.md#install",
                ".attachments/logo.png",
                "mailto:test@example.com",
            ]
        );
        assert_eq!(links(&parsed)[1].1, 5);
    }

    #[test]
    fn test_empty_link_is_kept() {
        let parsed = parse("an [](  ) empty one and []()");
        let raws: Vec<_> = links(&parsed).into_iter().map(|(raw, ..)| raw).collect();
        assert_eq!(raws, vec!["", ""]);
    }

    #[test]
    fn test_email_autolink_gets_mailto() {
        let parsed = parse("<someone@example.com>");
        let link = parsed.hyperlinks().next().unwrap();
        assert_eq!(link.raw, "mailto:someone@example.com");
        assert_eq!(link.origin, LinkOrigin::Email);
    }

    #[test]
    fn test_reference_links_resolve_through_definitions() {
        let parsed = parse("See [the docs][docs].\n\n[docs]: ./docs/index.md\n");
        let link = parsed.hyperlinks().next().unwrap();
        assert_eq!(link.raw, "./docs/index.md");
        assert_eq!(link.origin, LinkOrigin::Reference);
    }

    #[test]
    fn test_undefined_reference_is_a_suggestion() {
        let parsed = parse("Read [this][nowhere] and [plain brackets].\n");
        assert_eq!(parsed.findings.len(), 1);
        assert_eq!(parsed.findings[0].severity, Severity::Suggestion);
        assert!(parsed.findings[0].message.contains("nowhere"));
    }

    #[test]
    fn test_headings_with_explicit_ids() {
        let parsed = parse("# Getting `started`\n\n## Setup {#custom-setup}\n");
        let headings: Vec<_> = parsed
            .headings()
            .map(|h| (h.title.clone(), h.id.clone(), h.line))
            .collect();
        assert_eq!(
            headings,
            vec![
                ("Getting started".to_string(), None, 1),
                ("Setup".to_string(), Some("custom-setup".to_string()), 3),
            ]
        );
    }

    #[test]
    fn test_html_anchor_becomes_heading_id() {
        let parsed = parse("<a name=\"legacy\"></a>\n\nText <img src=\"pic.png\"> here\n");
        let ids: Vec<_> = parsed.headings().filter_map(|h| h.id.clone()).collect();
        assert_eq!(ids, vec!["legacy"]);
        let raws: Vec<_> = links(&parsed).into_iter().map(|(raw, ..)| raw).collect();
        assert_eq!(raws, vec!["pic.png"]);
    }

    #[test]
    fn test_html_links_are_placed_at_their_tag() {
        let parsed = parse(concat!(
            "Intro\n\n",
            "<div>\n",
            "  <a href=\"deep.md\">x</a>\n",
            "</div>\n\n",
            "Text <img src=\"pic.png\"> here\n",
        ));
        assert_eq!(
            links(&parsed),
            vec![
                ("deep.md".to_string(), 4, 3),
                ("pic.png".to_string(), 7, 6),
            ]
        );
    }

    #[test]
    fn test_links_in_code_are_ignored() {
        let parsed = parse("```\n[not](a-link.md)\n```\n\n`[nor](this.md)`\n");
        assert_eq!(parsed.hyperlinks().count(), 0);
    }

    #[test]
    fn test_front_matter_is_blanked() {
        let (body, uid) = strip_front_matter("---\nuid: 'a.b'\n---\n# Title\n");
        assert_eq!(body, "\n\n\n# Title\n");
        assert_eq!(uid.as_deref(), Some("a.b"));
    }

    #[test]
    fn test_unclosed_front_matter_is_left_alone() {
        let text = "---\nnot front matter\n";
        let (body, uid) = strip_front_matter(text);
        assert_eq!(body, text);
        assert_eq!(uid, None);
    }
}
