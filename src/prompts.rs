//! System prompts for extraction, translation, and language classification.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how the model is asked for the
//!    table (e.g. tightening the price rule) requires editing exactly one
//!    place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live model, making prompt regressions easy to catch.

use crate::language::Language;
use crate::menu::DEFAULT_HEADERS;

/// System prompt for converting one menu page image into a markdown table.
///
/// Names the five required columns and the menu's source language. The model
/// is told to emit a GFM pipe table and nothing else; the parser tolerates
/// stray prose anyway, but a clean table keeps the malformed-line count low.
pub fn extraction_system_prompt(source: Language) -> String {
    format!(
        r#"Convert the menu image to a structured table with columns:
- CategoryTitleDefault (Column A) - Category Title
- SubcategoryTitleDefault (Column B) - Subcategory Title (Optional)
- ItemNameDefault (Column C) - Item Name
- ItemDescriptionDefault (Column D) - Item Description (Optional)
- ItemPrice (Column E) - Item Price (just numbers, no currency)

The menu language is {lang}.
If multiple languages appear, only use the {lang} portion.

Output in Markdown table format:
| {headers} |

Output ONLY the table. Do NOT wrap it in ```markdown fences and do NOT add
commentary before or after it."#,
        lang = source.full_name(),
        headers = DEFAULT_HEADERS.join(" | "),
    )
}

/// User-turn text accompanying the page image.
pub const EXTRACTION_USER_PROMPT: &str =
    "Convert this menu image to a structured spreadsheet table.";

/// System prompt for translating one cell of restaurant vocabulary.
pub fn translation_system_prompt(source: Language, target: Language) -> String {
    format!(
        "You are a translator for a restaurant. Assume the intended meaning is \
         restaurant vocabulary. Translate from {} to {}. \
         Return only the translated text.",
        source.full_name(),
        target.full_name(),
    )
}

/// User-turn text for a translation request: the literal source text.
pub fn translation_user_prompt(text: &str) -> String {
    format!("Translate this text:\n{text}")
}

/// System prompt for the language-classification call.
pub const CLASSIFY_SYSTEM_PROMPT: &str = "You classify the language.";

/// User prompt asking the model to map a language name to a supported code.
pub fn classify_user_prompt(name: &str) -> String {
    format!(
        r#"Based on the input '{name}', categorize it as one of the following:
- 'En' for English
- 'Pt' for Portuguese
- 'Fr' for French
- 'De' for German
- 'Es' for Spanish
If it doesn't match any, return 'None'.
Return only the code."#
    )
}
