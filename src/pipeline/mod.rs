//! Pipeline stages for menu-to-workbook conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch rendering backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ extract ──▶ translate
//! (URL/path) (pdfium/   (JPEG +    (vision      (chat LLM,
//!             image)     base64)    LLM)         cached)
//! ```
//!
//! 1. [`input`]     — canonicalise each user-supplied path or URL to a local
//!    file and sniff its format (PDF vs raster image)
//! 2. [`render`]    — rasterise PDF pages (in `spawn_blocking` because
//!    pdfium is not async-safe) or decode a single image
//! 3. [`encode`]    — JPEG-encode and base64-wrap each page for the
//!    multimodal API request body
//! 4. [`extract`]   — drive the per-page vision call with retry/backoff
//! 5. [`translate`] — plan, fetch (bounded fan-out, run-scoped cache), and
//!    apply the per-language cell translations
//!
//! Table parsing sits in [`crate::parser`] rather than here: it is pure
//! string work with no I/O and is shared by extraction and its tests.

pub mod encode;
pub mod extract;
pub mod input;
pub mod render;
pub mod translate;
