// src/checker/anchors.rs
// =============================================================================
// The heading index: which `#fragment`s exist in which document.
//
// Built once from every crawled heading before the first worker starts, then
// shared read-only between workers, so it needs no locking.
//
// Slugs follow the usual markdown renderers: lower-case, spaces become
// hyphens, punctuation is dropped. Repeated titles in one document get
// `-1`, `-2`, ... suffixes, like GitHub and docfx do.
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::crawl::CrawledDocument;

// Turns a heading title (or a fragment) into its anchor slug
//
// Example: "Getting Started: Step 1!" -> "getting-started-step-1"
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() {
            slug.push('-');
        } else if c == '-' || c == '_' {
            slug.push(c);
        }
    }
    slug
}

#[derive(Debug, Default)]
pub struct HeadingIndex {
    /// Document path (relative to the root) -> anchors it defines
    anchors: HashMap<PathBuf, HashSet<String>>,
}

impl HeadingIndex {
    pub fn build(documents: &[CrawledDocument]) -> Self {
        let mut anchors = HashMap::with_capacity(documents.len());

        for document in documents {
            let mut slugs = HashSet::new();
            let mut seen: HashMap<String, usize> = HashMap::new();

            for heading in &document.headings {
                if let Some(id) = &heading.id {
                    slugs.insert(id.clone());
                    slugs.insert(id.to_lowercase());
                }
                if heading.title.is_empty() {
                    continue;
                }

                let base = slugify(&heading.title);
                let count = seen.entry(base.clone()).or_insert(0);
                let slug = if *count == 0 {
                    base
                } else {
                    format!("{}-{}", base, count)
                };
                *count += 1;
                slugs.insert(slug);
            }

            anchors.insert(document.path.clone(), slugs);
        }

        HeadingIndex { anchors }
    }

    // True if `document` was crawled, i.e. its anchors are known
    pub fn knows(&self, document: &Path) -> bool {
        self.anchors.contains_key(document)
    }

    // True if `document` defines `fragment`, as written or once slugified
    pub fn contains(&self, document: &Path, fragment: &str) -> bool {
        self.anchors.get(document).is_some_and(|slugs| {
            slugs.contains(fragment)
                || slugs.contains(&fragment.to_lowercase())
                || slugs.contains(&slugify(fragment))
        })
    }
}
