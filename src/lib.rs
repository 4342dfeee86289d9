//! # menu2xlsx
//!
//! Convert restaurant menus (PDF or photo) into a translated Excel workbook
//! using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Menu cards are the worst case for classic OCR: decorative fonts,
//! multi-column layouts, photos behind text, and prices floating far from
//! their dishes. Instead of fighting that, this crate rasterises each page
//! and lets a VLM read it as a human would, emitting a structured item
//! table. Each item's category, subcategory, name, and description are then
//! translated into English, Portuguese, French, German, and Spanish, and
//! the whole thing lands in a single flat `.xlsx` sheet with a fixed
//! 25-column schema that menu-management tools can import directly.
//!
//! ## Pipeline Overview
//!
//! ```text
//! menu.pdf / menu.jpg
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, sniff format
//!  ├─ 2. Render     rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode     JPEG → base64 ImageData
//!  ├─ 4. Extract    concurrent vision calls, one markdown table per page
//!  ├─ 5. Parse      markdown table → 5-column rows (strict column check)
//!  ├─ 6. Translate  per-cell chat calls, deduplicated via a run cache
//!  └─ 7. Workbook   25-column xlsx: 5 source columns + 4 fields × 5 languages
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use menu2xlsx::{convert_to_workbook, ConversionConfig, Language};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ConversionConfig::default();
//!     let (path, output) =
//!         convert_to_workbook(&["menu.pdf"], Language::De, "menu 1", ".", &config).await?;
//!     println!("Wrote {} ({} rows)", path.display(), output.stats.rows_extracted);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `menu2xlsx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | on      | Auto-downloads a pdfium build on first run |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! menu2xlsx = { version = "0.3", default-features = false, features = ["bundled"] }
//! ```
//!
//! ## Partial failure
//!
//! A multi-page scan rarely converts perfectly: a page may time out, a
//! translation may fail. Those are recorded per page
//! ([`PageResult::error`]) and per request
//! ([`ConversionOutput::translation_errors`]) while the run completes.
//! Only "no rows at all" is a fatal [`Menu2XlsxError`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod language;
pub mod menu;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod workbook;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, convert_to_workbook, detect_language};
pub use error::{Menu2XlsxError, PageError, TranslationError};
pub use language::Language;
pub use menu::{MenuRow, MenuTable, TranslatableField};
pub use output::{ConversionOutput, ConversionStats, PageResult};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
