// src/document/table.rs
// =============================================================================
// Markdown table validation.
//
// pulldown-cmark silently stops treating a block as a table when its rows
// don't line up, which is exactly the mistake we want to catch. So tables are
// found with a line scanner instead:
//
//   | A | B | C |      <- header, fixes the column count N
//   |---|---|---|      <- separator, must have N segments of 3+ dashes
//   | 1 | 2 | 3 |      <- rows, must have N cells
//
// A table starts at a line containing `|` that is directly followed either
// by a separator-looking line, or (both lines starting with `|`) by a row
// where the separator was forgotten. It runs over the following non-blank
// lines that contain a `|`. Lines inside fenced code blocks are never tables.
//
// Blockquote markers (`> `) are stripped before scanning, so quoted tables
// are checked too; columns still point into the original line. Not handled:
// a table starting on the same line as a list marker (`- | A |`), and tables
// indented four or more spaces, which read as indented code.
// =============================================================================

use std::path::Path;

use super::TableMarker;
use crate::report::{Finding, Severity};

// One source line with its blockquote markers removed
#[derive(Debug, Clone, Copy)]
struct SourceLine<'a> {
    text: &'a str,
    /// Characters removed from the start of the original line
    prefix: usize,
}

impl<'a> SourceLine<'a> {
    fn new(line: &'a str) -> Self {
        let mut text = line;
        let mut prefix = 0;
        loop {
            let trimmed = text.trim_start();
            // Up to three spaces may precede a `>`
            if text.len() - trimmed.len() > 3 {
                break;
            }
            let Some(after) = trimmed.strip_prefix('>') else {
                break;
            };
            let after = after.strip_prefix(' ').unwrap_or(after);
            prefix += text[..text.len() - after.len()].chars().count();
            text = after;
        }
        SourceLine { text, prefix }
    }

    // 1-based column of the first non-blank character in the original line
    fn column(&self) -> usize {
        self.prefix + self.text.chars().take_while(|c| c.is_whitespace()).count() + 1
    }

    fn starts_with_pipe(&self) -> bool {
        self.text.trim_start().starts_with('|')
    }
}

// Tracks ``` / ~~~ fences so tables shown as code are not validated
#[derive(Default)]
struct FenceState {
    open: Option<(char, usize)>,
}

impl FenceState {
    // Returns true if `line` is a fence line or sits inside a fenced block
    fn in_code(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let fence = ['`', '~'].into_iter().find_map(|c| {
            let run = trimmed.chars().take_while(|&x| x == c).count();
            (run >= 3).then_some((c, run))
        });

        match (self.open, fence) {
            (None, Some(found)) => {
                self.open = Some(found);
                true
            }
            (Some((c, len)), Some((fc, flen))) if c == fc && flen >= len => {
                self.open = None;
                true
            }
            (Some(_), _) => true,
            (None, None) => false,
        }
    }
}

// Validates every table of `text`
pub(super) fn validate_tables(text: &str, file: &Path) -> (Vec<TableMarker>, Vec<Finding>) {
    let lines: Vec<SourceLine<'_>> = text.lines().map(SourceLine::new).collect();
    let mut fences = FenceState::default();
    let mut tables = Vec::new();
    let mut findings = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let header = lines[i];
        if fences.in_code(header.text) {
            i += 1;
            continue;
        }

        let starts_table = header.text.contains('|')
            && !is_indented_code(header.text)
            && lines.get(i + 1).is_some_and(|next| {
                is_separator_like(next.text)
                    || (header.starts_with_pipe() && next.starts_with_pipe())
            });
        if !starts_table {
            i += 1;
            continue;
        }

        let columns = count_cells(header.text);
        check_pipes(&header, i, file, &mut findings);
        check_separator(&lines[i + 1], i + 1, columns, file, &mut findings);

        let mut end = i + 2;
        while let Some(row) = lines.get(end) {
            if row.text.trim().is_empty() || !row.text.contains('|') || is_fence(row.text) {
                break;
            }
            check_pipes(row, end, file, &mut findings);
            let cells = count_cells(row.text);
            if cells != columns {
                findings.push(row_finding(
                    file,
                    end,
                    row,
                    format!("table row must have {} columns but has {}", columns, cells),
                ));
            }
            end += 1;
        }

        tables.push(TableMarker {
            file: file.to_path_buf(),
            line: i + 1,
            column: header.column(),
            last_line: end,
            columns,
        });
        i = end;
    }

    (tables, findings)
}

// The separator row sits right under the header
fn check_separator(
    line: &SourceLine<'_>,
    index: usize,
    columns: usize,
    file: &Path,
    findings: &mut Vec<Finding>,
) {
    check_pipes(line, index, file, findings);

    let segments = split_cells(line.text);
    if segments.len() != columns {
        findings.push(row_finding(
            file,
            index,
            line,
            format!(
                "table separator must have {} columns but has {}",
                columns,
                segments.len()
            ),
        ));
    }
    if segments.iter().any(|segment| !segment.contains("---")) {
        findings.push(row_finding(
            file,
            index,
            line,
            "table separator must have at least 3 dashes per column",
        ));
    }
}

fn check_pipes(line: &SourceLine<'_>, index: usize, file: &Path, findings: &mut Vec<Finding>) {
    let trimmed = line.text.trim();
    if !trimmed.starts_with('|') || !ends_with_unescaped_pipe(trimmed) {
        findings.push(row_finding(
            file,
            index,
            line,
            "table rows must start and end with '|'",
        ));
    }
}

fn row_finding(
    file: &Path,
    index: usize,
    line: &SourceLine<'_>,
    message: impl Into<String>,
) -> Finding {
    Finding::new(file, index + 1, line.column(), Severity::Error, message)
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn is_indented_code(line: &str) -> bool {
    line.starts_with('\t') || line.starts_with("    ")
}

// Only pipes, dashes, colons and blanks, with at least one pipe and one dash
fn is_separator_like(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('|')
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':') || c.is_whitespace())
}

fn ends_with_unescaped_pipe(trimmed: &str) -> bool {
    trimmed.ends_with('|') && !trimmed.ends_with("\\|")
}

// Cells of a row: one leading and one trailing pipe are dropped, then the
// rest is split on pipes that aren't escaped with a backslash
fn split_cells(line: &str) -> Vec<String> {
    let mut body = line.trim();
    if let Some(rest) = body.strip_prefix('|') {
        body = rest;
    }
    if ends_with_unescaped_pipe(body) {
        body = &body[..body.len() - 1];
    }

    let mut cells = vec![String::new()];
    let mut escaped = false;
    for c in body.chars() {
        match c {
            '|' if !escaped => cells.push(String::new()),
            _ => {
                escaped = c == '\\' && !escaped;
                if let Some(cell) = cells.last_mut() {
                    cell.push(c);
                }
            }
        }
    }
    cells
}

fn count_cells(line: &str) -> usize {
    split_cells(line).len()
}
