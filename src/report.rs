// src/report.rs
// =============================================================================
// Findings and the final report handed to the CLI layer.
//
// Every stage of the pipeline produces `Finding`s. They are plain data: the
// pipeline never logs them, it collects them, sorts them by file position and
// derives the run `Outcome` from the worst severity present.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// How serious a finding is
//
// The derive order matters: `Ord` follows declaration order, so
// `Information < Suggestion < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Information,
    Suggestion,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Information => "info",
            Severity::Suggestion => "suggestion",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

// A single validation result, attributable to exactly one file position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// File the finding belongs to, relative to the crawl root
    pub file: PathBuf,
    /// 1-based line
    pub line: usize,
    /// 1-based column (in characters)
    pub column: usize,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn new(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Finding {
            file: file.into(),
            line,
            column,
            severity,
            message: message.into(),
        }
    }

    // Findings about a whole file (unreadable document, orphaned resource)
    // point at its first character
    pub fn at_file_start(file: &Path, severity: Severity, message: impl Into<String>) -> Self {
        Finding::new(file, 1, 1, severity, message)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file.display(),
            self.line,
            self.column,
            self.severity,
            self.message
        )
    }
}

// Sorts findings by (file, line, column)
//
// Severity and message are tie-breakers so two findings at the same position
// always come out in the same order, whatever order the workers finished in.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.line.cmp(&b.line))
            .then(a.column.cmp(&b.column))
            .then(b.severity.cmp(&a.severity))
            .then_with(|| a.message.cmp(&b.message))
    });
}

// The only signal the CLI layer maps to an exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No findings at all
    Clean,
    /// Worst finding is a warning, suggestion or information
    WarningsOnly,
    /// At least one error
    Errors,
}

impl Outcome {
    pub fn from_findings(findings: &[Finding]) -> Self {
        match findings.iter().map(|f| f.severity).max() {
            None => Outcome::Clean,
            Some(Severity::Error) => Outcome::Errors,
            Some(_) => Outcome::WarningsOnly,
        }
    }
}

// Counters shown under the findings table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub files_processed: usize,
    pub links_checked: usize,
    pub links_resolved: usize,
    pub links_failed: usize,
    pub orphans: usize,
    pub errors: usize,
    pub warnings: usize,
    pub suggestions: usize,
    pub information: usize,
}

impl Summary {
    fn count_severities(&mut self, findings: &[Finding]) {
        self.errors = 0;
        self.warnings = 0;
        self.suggestions = 0;
        self.information = 0;
        for finding in findings {
            match finding.severity {
                Severity::Error => self.errors += 1,
                Severity::Warning => self.warnings += 1,
                Severity::Suggestion => self.suggestions += 1,
                Severity::Information => self.information += 1,
            }
        }
    }
}

// Everything a run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub findings: Vec<Finding>,
    pub summary: Summary,
    pub outcome: Outcome,
    /// True when the run stopped early because of a cancellation request
    pub cancelled: bool,
}

impl Report {
    // Sorts the findings and derives the severity counters and the outcome
    pub fn new(mut findings: Vec<Finding>, mut summary: Summary, cancelled: bool) -> Self {
        sort_findings(&mut findings);
        summary.count_severities(&findings);
        let outcome = Outcome::from_findings(&findings);
        Report {
            findings,
            summary,
            outcome,
            cancelled,
        }
    }

    // A run that could not start (e.g. the root folder is missing)
    pub fn aborted(finding: Finding) -> Self {
        Report::new(vec![finding], Summary::default(), false)
    }
}
