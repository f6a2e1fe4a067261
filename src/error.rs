// src/error.rs
// =============================================================================
// Errors that abort a whole run.
//
// Anything that goes wrong with a single file or a single link becomes a
// `Finding` instead. Only configuration problems and failures of the runtime
// itself end up here.
// =============================================================================

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A config value that makes the run impossible (zero workers, ...)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The config file exists but could not be read
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys
    #[error("cannot parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The HTTP client could not be built (TLS backend, ...)
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A blocking task or worker panicked
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The validator was fed after its queue was closed
    #[error("link queue is closed")]
    QueueClosed,
}
