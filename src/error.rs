//! Error types for the menu2xlsx library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`Menu2XlsxError`] — **Fatal**: the conversion cannot proceed at all
//!   (no input files, unreadable document, provider not configured).
//!   Returned as `Err(Menu2XlsxError)` from the top-level `convert*`
//!   functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (render glitch,
//!   transient API error) but all other pages are fine. Stored inside
//!   [`crate::output::PageResult`] so callers can inspect partial success
//!   rather than losing the whole menu to one bad page.
//!
//! * [`TranslationError`] — **Non-fatal**: one translation request failed
//!   after retries; the affected cells stay empty and the run completes.
//!   Collected in [`crate::output::ConversionOutput::translation_errors`].
//!
//! Parse-quality problems (malformed table lines) are not errors at all:
//! they are counted in [`crate::parser::ParseOutcome`] and surfaced through
//! the run statistics so callers can detect partial extraction.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the menu2xlsx library.
///
/// Page-level failures use [`PageError`] and translation failures use
/// [`TranslationError`]; both are stored in the conversion output rather
/// than propagated here.
#[derive(Debug, Error)]
pub enum Menu2XlsxError {
    // ── Upload-validation errors ──────────────────────────────────────────
    /// The caller supplied no input files at all.
    #[error("No input files given.\nSupply at least one PDF or image (jpg/jpeg/png).")]
    NoInputFiles,

    /// The output base name is empty.
    #[error("Output filename is empty.\nSupply a base name for the .xlsx file (no extension).")]
    EmptyOutputName,

    /// The requested source language is not in the supported set.
    #[error("Unrecognized menu language '{name}'.\nSupported: English, Portuguese, French, German, Spanish (En/Pt/Fr/De/Es).")]
    UnrecognizedLanguage { name: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// No file at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file exists but cannot be read by this process.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The URL parsed but the download did not complete.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is neither a PDF nor a supported image.
    #[error("Unsupported input format for '{path}'\nExpected a PDF or a jpg/jpeg/png image. First bytes: {magic:?}")]
    UnsupportedFormat { path: PathBuf, magic: [u8; 4] },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The PDF structure cannot be parsed (broken header, trailer, or xref).
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF is encrypted and no password was supplied.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// The supplied PDF password does not open the document.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// A raster image failed to decode.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    /// pdfium failed while rendering one specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No usable LLM provider (missing API key, unknown name, …).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A non-retryable model API failure outside the page/translation scope.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// Every page failed after all retries; no table could be extracted.
    #[error("All {total} pages failed after {retries} retries each.\nFirst error: {first_error}")]
    AllPagesFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output workbook file.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// No pdfium shared library could be located or loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The overall conversion continues unless ALL pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation or image encoding failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Vision extraction call failed after retries.
    #[error("Page {page}: extraction failed after {retries} retries: {detail}")]
    ExtractionFailed {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// Extraction call timed out.
    #[error("Page {page}: extraction timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

/// A non-fatal error for a single translation request.
///
/// Identifies the exact `(text, target)` pair so a caller can re-run just
/// the missing cells.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Translation to {target} failed for '{text}': {detail}")]
pub struct TranslationError {
    /// The source-language text that could not be translated.
    pub text: String,
    /// Target language code ("Fr", "De", …).
    pub target: String,
    pub detail: String,
}
