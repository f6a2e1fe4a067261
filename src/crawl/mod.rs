// src/crawl/mod.rs
// =============================================================================
// This module handles crawling the documentation tree.
//
// Features:
// - Walks the root folder and keeps files with a document extension
// - Honors include/exclude path prefixes from the config
// - Parses every document independently: one unreadable file never stops
//   the others, it just becomes a finding
//
// Also lists the resource directories, which the orphan check needs.
// =============================================================================

mod walk;

pub use walk::{crawl, list_resource_files, CrawlOptions, CrawlResult, CrawledDocument};
