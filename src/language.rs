//! The closed set of supported languages.
//!
//! The pipeline deals with exactly five languages. Keeping them as an enum
//! (rather than free-form strings) means a translation target can never be a
//! typo: every `(field, language)` cell in the output schema is enumerable at
//! compile time, and the workbook column order falls out of [`Language::ALL`].

use crate::error::Menu2XlsxError;
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One of the five supported menu languages.
///
/// The variant order is the column-block order of the output workbook:
/// En, Pt, Fr, De, Es.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    En,
    Pt,
    Fr,
    De,
    Es,
}

impl Language {
    /// All supported languages, in workbook column order.
    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Pt,
        Language::Fr,
        Language::De,
        Language::Es,
    ];

    /// Two-letter code used as a column-name suffix ("En", "Pt", …).
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "En",
            Language::Pt => "Pt",
            Language::Fr => "Fr",
            Language::De => "De",
            Language::Es => "Es",
        }
    }

    /// Full English name, used in translation prompts.
    pub fn full_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Pt => "Portuguese",
            Language::Fr => "French",
            Language::De => "German",
            Language::Es => "Spanish",
        }
    }

    /// Parse a two-letter code ("En", "pt", "FR", …). Case-insensitive.
    pub fn from_code(code: &str) -> Option<Language> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "pt" => Some(Language::Pt),
            "fr" => Some(Language::Fr),
            "de" => Some(Language::De),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    /// Static lookup from the closed list of human-readable selector names.
    ///
    /// Accepts the regional UI labels ("British English", "European
    /// Portuguese", …), the plain language names, and two-letter codes.
    /// Anything else is the unrecognized sentinel (`None`) — callers that
    /// want fuzzier matching use [`classify_language`] instead.
    pub fn from_ui_name(name: &str) -> Option<Language> {
        let name = name.trim();
        if let Some(lang) = Language::from_code(name) {
            return Some(lang);
        }
        match name.to_ascii_lowercase().as_str() {
            "british english" | "english" => Some(Language::En),
            "european portuguese" | "portuguese" => Some(Language::Pt),
            "european french" | "french" => Some(Language::Fr),
            "german" | "german (germany)" => Some(Language::De),
            "european spanish" | "spanish" => Some(Language::Es),
            _ => None,
        }
    }

    /// The translation targets for a menu in this language: every supported
    /// language except itself.
    pub fn targets(self) -> impl Iterator<Item = Language> {
        Language::ALL.into_iter().filter(move |&l| l != self)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

/// Classify a free-form language name via the chat model.
///
/// One zero-temperature call asking for a bare two-letter code; the model
/// answers `None` for anything outside the supported set, which maps to the
/// unrecognized sentinel here. Use this when the input does not come from the
/// closed selector list — [`Language::from_ui_name`] covers that case without
/// a network round-trip.
pub async fn classify_language(
    provider: &Arc<dyn LLMProvider>,
    name: &str,
) -> Result<Option<Language>, Menu2XlsxError> {
    let messages = vec![
        ChatMessage::system(prompts::CLASSIFY_SYSTEM_PROMPT),
        ChatMessage::user(prompts::classify_user_prompt(name)),
    ];
    let options = CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(8),
        ..Default::default()
    };

    let response = provider
        .chat(&messages, Some(&options))
        .await
        .map_err(|e| Menu2XlsxError::LlmApiError {
            message: format!("language classification failed: {e}"),
        })?;

    let code = response.content.trim();
    debug!("Classified '{}' as '{}'", name, code);
    Ok(Language::from_code(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
    }

    #[test]
    fn ui_names_map_to_codes() {
        assert_eq!(Language::from_ui_name("British English"), Some(Language::En));
        assert_eq!(
            Language::from_ui_name("European Portuguese"),
            Some(Language::Pt)
        );
        assert_eq!(Language::from_ui_name("european french"), Some(Language::Fr));
        assert_eq!(Language::from_ui_name("German (Germany)"), Some(Language::De));
        assert_eq!(Language::from_ui_name("Spanish"), Some(Language::Es));
        assert_eq!(Language::from_ui_name("es"), Some(Language::Es));
    }

    #[test]
    fn unknown_name_is_unrecognized() {
        assert_eq!(Language::from_ui_name("Klingon"), None);
        assert_eq!(Language::from_ui_name(""), None);
        assert_eq!(Language::from_code("zz"), None);
    }

    #[test]
    fn targets_exclude_source() {
        let targets: Vec<Language> = Language::Pt.targets().collect();
        assert_eq!(targets.len(), 4);
        assert!(!targets.contains(&Language::Pt));
        assert!(targets.contains(&Language::En));
    }
}
