// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the CLI structure is described by the structs
// below and clap generates the parsing, `--help` and `--version` for us.
//
// Flags given here override the values from the config file, see
// `CheckArgs::apply`.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use doc_link_guardian::config::{Config, XrefPolicy};

#[derive(Parser, Debug)]
#[command(
    name = "doc-link-guardian",
    version,
    about = "Validate links, anchors and tables in a markdown documentation tree",
    long_about = "doc-link-guardian walks a documentation folder, checks every link \
                  (local files, #anchors, resources and optionally web pages), validates \
                  markdown tables and finds orphaned attachments. \
                  It exits with 1 when errors are found, which makes it a good CI gate."
)]
pub struct Cli {
    /// Log what's happening (debug level) on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a documentation tree
    ///
    /// Example: doc-link-guardian check ./docs --external --orphans
    Check(CheckArgs),

    /// Print the anchor slug a heading title gets
    ///
    /// Example: doc-link-guardian slug "Getting Started: Step 1"
    Slug {
        /// Heading title
        text: String,
    },
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Root folder of the documentation
    pub root: PathBuf,

    /// Config file (default: .doclinkguardian.toml in the root, if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// Don't validate markdown tables
    #[arg(long)]
    pub no_tables: bool,

    /// Check web and ftp links over the network
    #[arg(long)]
    pub external: bool,

    /// Report files in resource folders that no document links to
    #[arg(long)]
    pub orphans: bool,

    /// Delete orphaned resources (implies --orphans)
    #[arg(long)]
    pub cleanup: bool,

    /// Name of the resource folders (default: .attachments)
    #[arg(long)]
    pub resource_dir: Option<String>,

    /// Number of concurrent link checks
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Attempts per web link, the first one included
    #[arg(long)]
    pub retries: Option<u32>,

    /// Timeout per web request, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Check xref: links against known uids instead of accepting them
    #[arg(long)]
    pub xref_verify: bool,
}

impl CheckArgs {
    // Layers the command-line flags over the loaded config
    pub fn apply(&self, config: &mut Config) {
        if self.no_tables {
            config.check_tables = false;
        }
        if self.external {
            config.check_external = true;
        }
        if self.orphans {
            config.check_orphans = true;
        }
        if self.cleanup {
            config.cleanup_orphans = true;
        }
        if let Some(resource_dir) = &self.resource_dir {
            config.resource_dir = resource_dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(retries) = self.retries {
            config.retry.attempts = retries;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if self.xref_verify {
            config.xref.policy = XrefPolicy::Verify;
        }
    }
}
