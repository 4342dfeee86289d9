//! Output types: per-page results, run statistics, and the final bundle.

use crate::error::{PageError, TranslationError};
use crate::language::Language;
use crate::menu::MenuTable;
use serde::{Deserialize, Serialize};

/// The outcome of one page's extraction.
///
/// A failed page carries `error: Some(..)` and zero rows; it never aborts
/// the run on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number across all input files.
    pub page_num: usize,
    /// Number of well-formed rows this page contributed to the table.
    pub rows: usize,
    /// Lines that looked like table rows but had the wrong column count.
    pub malformed_lines: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Retries consumed before success (or giving up).
    pub retries: u8,
    pub error: Option<PageError>,
}

/// Aggregate statistics for one conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    /// Well-formed rows accumulated across all pages.
    pub rows_extracted: usize,
    /// Candidate table lines dropped for a column-count mismatch. Non-zero
    /// means the extraction was partial — surface this to the user.
    pub malformed_lines: usize,
    /// Unique translation requests actually sent to the model.
    pub translation_requests: usize,
    /// Cells filled from the run cache instead of a network call.
    pub translation_cache_hits: usize,
    pub failed_translations: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub render_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub translate_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a conversion run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The declared source language of the menu.
    pub source_language: Language,
    /// The accumulated 25-column table.
    pub table: MenuTable,
    /// Per-page results in page order, including failed pages.
    pub pages: Vec<PageResult>,
    /// Translation requests that failed after retries; their cells are empty.
    pub translation_errors: Vec<TranslationError>,
    pub stats: ConversionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_serialises_to_json() {
        let output = ConversionOutput {
            source_language: Language::En,
            table: MenuTable::new(),
            pages: vec![PageResult {
                page_num: 1,
                rows: 3,
                malformed_lines: 1,
                input_tokens: 100,
                output_tokens: 50,
                duration_ms: 1200,
                retries: 0,
                error: None,
            }],
            translation_errors: vec![],
            stats: ConversionStats::default(),
        };
        let json = serde_json::to_string(&output).expect("serialise");
        let back: ConversionOutput = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back.pages.len(), 1);
        assert_eq!(back.pages[0].malformed_lines, 1);
    }
}
