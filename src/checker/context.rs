// src/checker/context.rs
// Read-only state every validator worker needs. Built once by the pipeline,
// wrapped in an `Arc` and never mutated afterwards (the URL cache inside the
// HTTP checker does its own locking).

use std::collections::HashSet;
use std::path::PathBuf;

use super::anchors::HeadingIndex;
use super::http::HttpChecker;
use crate::config::XrefPolicy;

// Known cross-reference uids
#[derive(Debug, Default)]
pub struct XrefRegistry {
    policy: XrefPolicy,
    uids: HashSet<String>,
}

impl XrefRegistry {
    pub fn new(policy: XrefPolicy, uids: impl IntoIterator<Item = String>) -> Self {
        XrefRegistry {
            policy,
            uids: uids.into_iter().collect(),
        }
    }

    pub fn policy(&self) -> XrefPolicy {
        self.policy
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.uids.contains(uid)
    }
}

#[derive(Debug)]
pub struct ValidationContext {
    /// Canonical root folder; link targets are resolved below it
    pub root: PathBuf,
    pub document_extensions: Vec<String>,
    pub headings: HeadingIndex,
    pub xrefs: XrefRegistry,
    /// URL prefixes accepted without a network check
    pub skip_urls: Vec<String>,
    /// `None` when external checks are disabled
    pub http: Option<HttpChecker>,
}
