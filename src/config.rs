// src/config.rs
// =============================================================================
// The fully resolved configuration the pipeline runs with.
//
// Sources, lowest priority first:
// 1. Built-in defaults (`Config::default()`)
// 2. `.doclinkguardian.toml` in the root folder, or the file given by --config
// 3. Command-line flags (see `CheckArgs::apply` in the binary)
//
// A missing default config file is fine. A config file that exists but is
// malformed is an error: we never silently fall back to defaults when the
// user wrote a file.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// File name looked up in the root folder when --config is not given
pub const DEFAULT_CONFIG_FILE: &str = ".doclinkguardian.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the documentation tree
    pub root: PathBuf,
    /// Extensions (without the dot) of files treated as documents
    pub extensions: Vec<String>,
    /// Path prefixes (relative to the root) to scan; empty means everything
    pub include: Vec<String>,
    /// Path prefixes (relative to the root) to skip
    pub exclude: Vec<String>,
    /// Validate markdown table structure
    pub check_tables: bool,
    /// Check http(s)/ftp links over the network
    pub check_external: bool,
    /// Report resources nobody links to
    pub check_orphans: bool,
    /// Delete orphaned resources (implies check_orphans)
    pub cleanup_orphans: bool,
    /// Name of the resource directories (there can be several in the tree)
    pub resource_dir: String,
    /// Extensions that make a local link a resource link
    pub resource_extensions: Vec<String>,
    /// Number of validator workers
    pub concurrency: usize,
    /// Capacity of the bounded link queue
    pub queue_capacity: usize,
    /// Per-request timeout for network checks
    pub timeout_secs: u64,
    pub retry: RetryConfig,
    pub user_agent: String,
    /// URL prefixes accepted without a network check
    pub skip_urls: Vec<String>,
    pub xref: XrefConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub attempts: u32,
    /// Fixed pause between two attempts
    pub backoff_ms: u64,
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            attempts: 3,
            backoff_ms: 1000,
        }
    }
}

// What to do with `xref:` links and docfx tabs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XrefPolicy {
    /// Accept every cross-reference without looking it up
    #[default]
    Accept,
    /// Require the uid to be known (configured or declared in front matter)
    Verify,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct XrefConfig {
    pub policy: XrefPolicy,
    /// Uids defined outside the crawled tree (API docs, other repos)
    pub uids: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: PathBuf::from("."),
            extensions: vec!["md".to_string()],
            include: Vec::new(),
            exclude: Vec::new(),
            check_tables: true,
            check_external: false,
            check_orphans: false,
            cleanup_orphans: false,
            resource_dir: ".attachments".to_string(),
            resource_extensions: [
                "png", "jpg", "jpeg", "gif", "svg", "bmp", "webp", "ico", "tif", "tiff", "pdf",
                "zip", "docx", "xlsx", "pptx", "vsdx", "mp4", "mov", "webm", "mp3",
            ]
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
            concurrency: 16,
            queue_capacity: 256,
            timeout_secs: 30,
            retry: RetryConfig::default(),
            user_agent: concat!("doc-link-guardian/", env!("CARGO_PKG_VERSION")).to_string(),
            skip_urls: Vec::new(),
            xref: XrefConfig::default(),
        }
    }
}

impl Config {
    // Loads the config for `root`
    //
    // With `explicit` set the file must exist. Without it we look for
    // `.doclinkguardian.toml` in the root and use defaults when it's absent.
    // The returned config always has `root` set to the given root.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, Error> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => root.join(DEFAULT_CONFIG_FILE),
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                return Ok(Config {
                    root: root.to_path_buf(),
                    ..Config::default()
                });
            }
            Err(source) => return Err(Error::ConfigRead { path, source }),
        };

        let mut config: Config =
            toml::from_str(&content).map_err(|source| Error::ConfigParse { path, source })?;
        config.root = root.to_path_buf();
        Ok(config)
    }

    // Rejects values no run can work with
    pub fn validate(&self) -> Result<(), Error> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig("concurrency must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        if self.retry.attempts == 0 {
            return Err(Error::InvalidConfig("retry.attempts must be at least 1".into()));
        }
        if self.extensions.is_empty() {
            return Err(Error::InvalidConfig("at least one document extension is required".into()));
        }
        if self.resource_dir.is_empty() || self.resource_dir.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!(
                "resource_dir must be a single directory name, got '{}'",
                self.resource_dir
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn orphans_enabled(&self) -> bool {
        self.check_orphans || self.cleanup_orphans
    }

    // True if `path` has one of the document extensions
    pub fn is_document(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions)
    }
}

// Case-insensitive extension match
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
