//! Markdown-table parsing of model responses.
//!
//! The vision model is asked for a GFM pipe table but does not always comply
//! cleanly: responses arrive wrapped in ```markdown fences, with CRLF line
//! endings, with prose before or after the table, or with rows whose cell
//! count is off because a description contained a literal `|`. This module
//! cleans the response deterministically, then extracts exactly the rows
//! that match the five-column schema.
//!
//! Nothing is dropped silently: header, separator, and malformed line counts
//! travel up through [`ParseOutcome`] into the run statistics so callers can
//! detect partial extraction.

use crate::menu::{MenuRow, DEFAULT_HEADERS};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// The rows and line-level accounting for one page's response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub rows: Vec<MenuRow>,
    /// Candidate table lines dropped for a column-count mismatch.
    pub malformed_lines: usize,
    /// Header lines recognised and consumed.
    pub header_lines: usize,
    /// Markdown separator lines (`|---|---|…`) skipped.
    pub separator_lines: usize,
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown)?\n(.*)\n```\s*$").unwrap());

/// Strip an outer ```markdown fence and normalise line endings.
///
/// Models sometimes disobey the "no fences" instruction; stripping here
/// keeps the prompt focused on what to extract, not on formatting
/// edge-cases.
pub fn clean_response(input: &str) -> String {
    let unfenced = match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    };
    unfenced.replace("\r\n", "\n").replace('\r', "\n")
}

/// Parse one page's cleaned response into rows.
///
/// A candidate row is a line starting with `|`. Separator lines (`|-` prefix
/// or all-dash cells) and header lines are consumed without producing rows.
/// A candidate whose cell count is not exactly five is counted as malformed
/// and dropped whole — a row with an embedded pipe splits into six or more
/// fragments and must not be truncated into a wrong-but-plausible item.
///
/// A line counts as a header only when all five cells equal the default
/// header labels. Matching on the first cell alone would also swallow a
/// genuine menu item that happens to be named `CategoryTitleDefault`.
pub fn parse_page_table(response: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for line in response.lines() {
        let line = line.trim();
        if !line.starts_with('|') {
            continue;
        }
        if is_separator_line(line) {
            outcome.separator_lines += 1;
            continue;
        }

        let cells = split_row(line);

        if is_header_row(&cells) {
            outcome.header_lines += 1;
            continue;
        }

        match <[String; 5]>::try_from(cells) {
            Ok(cells) => outcome.rows.push(MenuRow::from_cells(cells)),
            Err(cells) => {
                warn!(
                    "Dropping malformed table line ({} cells, want 5): {}",
                    cells.len(),
                    line
                );
                outcome.malformed_lines += 1;
            }
        }
    }

    outcome
}

/// Split a pipe-delimited line into trimmed cell values.
///
/// The first and last fragments sit outside the table's outer pipes and are
/// discarded.
fn split_row(line: &str) -> Vec<String> {
    let fragments: Vec<&str> = line.split('|').collect();
    if fragments.len() < 3 {
        return Vec::new();
    }
    fragments[1..fragments.len() - 1]
        .iter()
        .map(|c| c.trim().to_string())
        .collect()
}

/// A markdown separator line: `|-...` or every cell made of dashes/colons.
fn is_separator_line(line: &str) -> bool {
    if line.starts_with("|-") {
        return true;
    }
    let cells = split_row(line);
    !cells.is_empty()
        && cells
            .iter()
            .all(|c| !c.is_empty() && c.chars().all(|ch| ch == '-' || ch == ':'))
}

fn is_header_row(cells: &[String]) -> bool {
    cells.len() == DEFAULT_HEADERS.len()
        && cells.iter().zip(DEFAULT_HEADERS).all(|(c, h)| c == h)
}
