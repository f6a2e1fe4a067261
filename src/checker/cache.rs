// src/checker/cache.rs
// Memoizes network check results by normalized URL so a link repeated across
// a documentation tree is only fetched once per run.
//
// Workers share it concurrently. Two workers racing on the same URL may both
// check it; both store the same kind of result, so that's harmless.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

use super::http::LinkCheckResult;

#[derive(Debug, Clone, Default)]
pub struct UrlCache {
    entries: Arc<Mutex<HashMap<String, LinkCheckResult>>>,
}

impl UrlCache {
    pub fn get(&self, url: &str) -> Option<LinkCheckResult> {
        let key = normalize(url);
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&key).cloned())
    }

    pub fn insert(&self, url: &str, result: LinkCheckResult) {
        let key = normalize(url);
        // A poisoned lock only costs us the memoization
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, result);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

// Scheme and host are lower-cased by `url`, default ports dropped and the
// fragment removed, so `HTTPS://Example.com:443/a#x` and
// `https://example.com/a` share an entry
pub fn normalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
