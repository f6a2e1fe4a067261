// src/lib.rs
// =============================================================================
// doc-link-guardian as a library.
//
// The binary (src/main.rs) is a thin layer over `pipeline::run`: it parses
// flags, loads the config, runs the pipeline and prints the `Report`.
//
// Modules:
// - document: parses one markdown file into links, headings and tables
// - crawl: walks the tree and parses every document
// - checker: classifies links and validates them on a worker pool
// - orphans: finds resource files no document links to
// - pipeline: ties the stages together
// - config, report, error: shared types
// =============================================================================

pub mod checker;
pub mod config;
pub mod crawl;
pub mod document;
pub mod error;
pub mod orphans;
pub mod pipeline;
pub mod report;

pub use config::Config;
pub use error::Error;
pub use pipeline::run;
pub use report::{Finding, Outcome, Report, Severity, Summary};
