// src/crawl/walk.rs
// =============================================================================
// This module walks a documentation tree and parses every document in it.
//
// How it works:
// 1. Walk the root folder with walkdir, sorted by name so every run sees the
//    files in the same order
// 2. Skip hidden directories (.git, .attachments, ...) below the root
// 3. Keep files whose extension is a document extension and whose relative
//    path passes the include/exclude rules
// 4. Read and parse each file; failures become findings
//
// Paths handed out are relative to the root. That keeps findings short and
// identical between machines.
// =============================================================================

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::{has_extension, Config};
use crate::document::{parse_document, Heading, Hyperlink, ParseOptions};
use crate::report::{Finding, Severity};

// What the crawler needs from the config
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub parse: ParseOptions,
}

impl From<&Config> for CrawlOptions {
    fn from(config: &Config) -> Self {
        CrawlOptions {
            root: config.root.clone(),
            extensions: config.extensions.clone(),
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            parse: ParseOptions {
                check_tables: config.check_tables,
            },
        }
    }
}

impl CrawlOptions {
    // A path is scanned if it matches an include prefix (or there are none)
    // and matches no exclude prefix
    fn should_scan(&self, relative: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| relative.starts_with(p.as_str()));
        included && !self.exclude.iter().any(|p| relative.starts_with(p.as_str()))
    }
}

// One parsed document
#[derive(Debug, Clone)]
pub struct CrawledDocument {
    /// Path relative to the root
    pub path: PathBuf,
    pub links: Vec<Hyperlink>,
    pub headings: Vec<Heading>,
    /// Cross-reference uid from the front matter
    pub uid: Option<String>,
}

#[derive(Debug, Default)]
pub struct CrawlResult {
    pub documents: Vec<CrawledDocument>,
    pub findings: Vec<Finding>,
    pub files_processed: usize,
}

// Crawls the whole tree
//
// The root itself must exist; the orchestrator checks that before calling.
// Errors while walking (permission denied on a folder, ...) are reported as
// findings against the offending path.
pub fn crawl(options: &CrawlOptions) -> CrawlResult {
    let mut result = CrawlResult::default();

    let walker = WalkDir::new(&options.root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| relative_to(&options.root, p))
                    .unwrap_or_default();
                warn!("Cannot walk {}: {}", path.display(), e);
                result.findings.push(Finding::at_file_start(
                    &path,
                    Severity::Error,
                    format!("cannot read directory entry: {}", e),
                ));
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_extension(entry.path(), &options.extensions) {
            continue;
        }

        let relative = relative_to(&options.root, entry.path());
        if !options.should_scan(&relative.to_string_lossy().replace('\\', "/")) {
            debug!("Skipping excluded {}", relative.display());
            continue;
        }

        result.files_processed += 1;
        match std::fs::read_to_string(entry.path()) {
            Ok(text) => {
                let parsed = parse_document(&text, &relative, &options.parse);
                debug!(
                    "Parsed {}: {} objects, {} findings",
                    relative.display(),
                    parsed.objects.len(),
                    parsed.findings.len()
                );
                let document = CrawledDocument {
                    path: relative,
                    links: parsed.hyperlinks().cloned().collect(),
                    headings: parsed.headings().cloned().collect(),
                    uid: parsed.uid,
                };
                result.findings.extend(parsed.findings);
                result.documents.push(document);
            }
            Err(e) => {
                warn!("Cannot read {}: {}", relative.display(), e);
                result.findings.push(Finding::at_file_start(
                    &relative,
                    Severity::Error,
                    format!("cannot read file: {}", e),
                ));
            }
        }
    }

    result
}

// Every file below a directory named `resource_dir` anywhere in the tree
//
// Returned paths are absolute (root joined with the relative path), in walk
// order.
pub fn list_resource_files(root: &Path, resource_dir: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !is_hidden(entry)
                || entry.file_name() == resource_dir
                || inside_resource_dir(entry, resource_dir)
        })
        .filter_map(Result::ok)
    {
        if entry.file_type().is_file() && inside_resource_dir(&entry, resource_dir) {
            files.push(entry.into_path());
        }
    }

    files
}

fn inside_resource_dir(entry: &DirEntry, resource_dir: &str) -> bool {
    entry
        .path()
        .parent()
        .is_some_and(|parent| parent.components().any(|c| c.as_os_str() == resource_dir))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
