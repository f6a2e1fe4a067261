// src/checker/mod.rs
// =============================================================================
// This module contains all link validation logic.
//
// Submodules:
// - classify: Decides what kind of link a raw target is
// - anchors: Heading slugs per document, for `#fragment` checks
// - context: Read-only state shared by the workers
// - engine: Bounded queue + worker pool that runs the checks
// - local: Checks that only touch the filesystem (or nothing at all)
// - http: Network checks for web and ftp links
// - retry: Fixed-backoff retry loop used by the network checks
// - cache: Per-run memo of network results
//
// This file (mod.rs) is the module root - it re-exports the pieces the
// pipeline and the binary need.
// =============================================================================

mod anchors;
mod cache;
mod classify;
mod context;
mod engine;
mod http;
mod local;
mod retry;

pub use anchors::{slugify, HeadingIndex};
pub use cache::UrlCache;
pub use classify::{classify, Classified, ClassifiedLink, ClassifyOptions, LinkKind};
pub use context::{ValidationContext, XrefRegistry};
pub use engine::{validate, Engine, EngineOptions, EngineOutput, LinkOutcome};
pub use http::{analyze_status, HttpChecker, HttpOptions, LinkCheckResult, LinkStatus};
pub use local::resolve_target;
pub use retry::{with_retry, RetryPolicy};
