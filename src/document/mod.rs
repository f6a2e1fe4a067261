// src/document/mod.rs
// =============================================================================
// This module turns the raw text of one document into typed objects.
//
// Submodules:
// - position: byte offset -> 1-based line/column
// - markdown: links and headings, via pulldown-cmark
// - html: links and anchors inside inline HTML, via scraper
// - table: table well-formedness checks
//
// Parsing never fails. Anything malformed becomes a `Finding` next to the
// objects that were understood.
// =============================================================================

mod html;
mod markdown;
mod position;
mod table;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::report::Finding;

pub use markdown::strip_front_matter;
pub use position::LineIndex;

// Where a link was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOrigin {
    /// `[text](url)`
    Inline,
    /// `[text][ref]`, `[ref][]`, `[ref]` resolved through a definition
    Reference,
    /// `![alt](src)`
    Image,
    /// `<https://...>`
    Autolink,
    /// `<someone@example.com>`
    Email,
    /// `<a href>` / `<img src>` in inline HTML
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    /// Literal title text; empty for HTML anchors
    pub title: String,
    /// Explicit anchor id (`{#id}`, `<a name>`, `id=`)
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hyperlink {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    /// URL or path exactly as written; empty for `[]()`
    pub raw: String,
    pub origin: LinkOrigin,
}

// A table seen by the parser; only used to produce table findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMarker {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub last_line: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DocumentObject {
    Heading(Heading),
    Hyperlink(Hyperlink),
    TableMarker(TableMarker),
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub check_tables: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { check_tables: true }
    }
}

// Everything learned from one document
#[derive(Debug, Default)]
pub struct Parsed {
    pub objects: Vec<DocumentObject>,
    pub findings: Vec<Finding>,
    /// Cross-reference uid declared in the front matter
    pub uid: Option<String>,
}

impl Parsed {
    pub fn hyperlinks(&self) -> impl Iterator<Item = &Hyperlink> {
        self.objects.iter().filter_map(|object| match object {
            DocumentObject::Hyperlink(link) => Some(link),
            _ => None,
        })
    }

    pub fn headings(&self) -> impl Iterator<Item = &Heading> {
        self.objects.iter().filter_map(|object| match object {
            DocumentObject::Heading(heading) => Some(heading),
            _ => None,
        })
    }
}

// Parses one document
//
// `file` is only used to label objects and findings; nothing is read from disk.
pub fn parse_document(text: &str, file: &Path, options: &ParseOptions) -> Parsed {
    let (body, uid) = strip_front_matter(text);
    let index = LineIndex::new(&body);

    let mut parsed = Parsed {
        uid,
        ..Parsed::default()
    };

    markdown::extract(&body, file, &index, &mut parsed);

    if options.check_tables {
        let (tables, findings) = table::validate_tables(&body, file);
        parsed
            .objects
            .extend(tables.into_iter().map(DocumentObject::TableMarker));
        parsed.findings.extend(findings);
    }

    parsed
}
