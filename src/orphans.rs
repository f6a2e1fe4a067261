// src/orphans.rs
// =============================================================================
// Orphaned resources: files in a resource folder that no document links to.
//
// How it works:
// 1. List every file below a directory named `resource_dir` (default
//    `.attachments`) anywhere under the root
// 2. Compare each against the set of resource paths the validator resolved
// 3. Report the difference; with cleanup enabled, delete it as well
//
// Both sides are compared as paths relative to the root. Windows and macOS
// file systems are case-insensitive by default, so there the comparison is
// too.
// =============================================================================

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::crawl::list_resource_files;
use crate::report::{Finding, Severity};

#[derive(Debug, Default)]
pub struct OrphanReport {
    pub findings: Vec<Finding>,
    /// Number of orphaned files found (deleted or not)
    pub orphans: usize,
}

// Reports (and optionally deletes) resource files nothing refers to
//
// `root` must be the same canonical root the links were resolved against;
// `referenced` holds paths relative to it.
pub fn reconcile(
    root: &Path,
    resource_dir: &str,
    referenced: &HashSet<PathBuf>,
    cleanup: bool,
) -> OrphanReport {
    let referenced: HashSet<String> = referenced.iter().map(|path| comparison_key(path)).collect();
    let mut report = OrphanReport::default();

    for file in list_resource_files(root, resource_dir) {
        let relative = file.strip_prefix(root).unwrap_or(&file).to_path_buf();
        if referenced.contains(&comparison_key(&relative)) {
            continue;
        }

        report.orphans += 1;
        if !cleanup {
            report.findings.push(Finding::at_file_start(
                &relative,
                Severity::Warning,
                "orphaned resource",
            ));
            continue;
        }

        match fs::remove_file(&file) {
            Ok(()) => {
                debug!("Deleted orphaned resource {}", relative.display());
                report.findings.push(Finding::at_file_start(
                    &relative,
                    Severity::Warning,
                    "orphaned resource deleted",
                ));
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", file.display(), e);
                report.findings.push(Finding::at_file_start(
                    &relative,
                    Severity::Error,
                    format!("orphaned resource could not be deleted: {}", e),
                ));
            }
        }
    }

    report
}

// Forward slashes everywhere; lower-cased where the file system ignores case
fn comparison_key(path: &Path) -> String {
    let key = path.to_string_lossy().replace('\\', "/");
    if cfg!(any(windows, target_os = "macos")) {
        key.to_lowercase()
    } else {
        key
    }
}
