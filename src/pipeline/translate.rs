//! Translation of the four text fields into the non-source languages.
//!
//! The client is split into three phases so the interesting logic stays
//! pure and testable without a live model:
//!
//! 1. [`plan_requests`]  — walk the table in row → field → language order
//!    and collect the unique `(text, target)` pairs that need a network
//!    call. Identical text appearing in many rows (think "Starters" as a
//!    category on every page) plans exactly one request per target.
//! 2. [`fetch_translations`] — the only phase with I/O: bounded-concurrency
//!    fan-out with per-call timeout and retry-with-backoff. Failures are
//!    collected, not propagated — the affected cells simply stay empty.
//! 3. [`apply_translations`] — fill every empty target cell from the cache.
//!
//! The [`TranslationCache`] is created per run and owned by the caller.
//! Scoping it to the run (instead of the process) means concurrent
//! conversions can never leak one menu's translations into another's
//! output.

use crate::config::ConversionConfig;
use crate::error::TranslationError;
use crate::language::Language;
use crate::menu::{MenuTable, TranslatableField};
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Run-scoped memo of completed translations, keyed by `(text, target)`.
#[derive(Debug, Default)]
pub struct TranslationCache {
    map: HashMap<(String, Language), String>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str, target: Language) -> Option<&str> {
        self.map
            .get(&(text.to_string(), target))
            .map(String::as_str)
    }

    pub fn insert(&mut self, text: String, target: Language, translated: String) {
        self.map.insert((text, target), translated);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One pending network request: translate `text` into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationRequest {
    pub text: String,
    pub target: Language,
}

/// The deduplicated work list for a table.
#[derive(Debug, Clone, Default)]
pub struct TranslationPlan {
    /// Unique requests, in first-encountered (row → field → language) order.
    pub requests: Vec<TranslationRequest>,
    /// Total empty target cells that will be filled. `cells - requests.len()`
    /// is the number of cells served from the cache.
    pub cells: usize,
}

/// Compute which translations a table still needs.
///
/// A cell needs translation when its field's default value is non-empty, its
/// target language differs from the source, and the cell itself is empty.
/// Pairs already present in `cache` are counted as cells but not planned as
/// requests. A fully-populated table therefore plans zero requests.
pub fn plan_requests(
    table: &MenuTable,
    source: Language,
    cache: &TranslationCache,
) -> TranslationPlan {
    let mut plan = TranslationPlan::default();
    let mut seen: HashMap<(String, Language), ()> = HashMap::new();

    for row in &table.rows {
        for field in TranslatableField::ALL {
            let text = row.default_value(field).trim();
            if text.is_empty() {
                continue;
            }
            for target in source.targets() {
                if !row.translation(field, target).trim().is_empty() {
                    continue;
                }
                plan.cells += 1;
                if cache.get(text, target).is_some() {
                    continue;
                }
                let key = (text.to_string(), target);
                if seen.insert(key, ()).is_none() {
                    plan.requests.push(TranslationRequest {
                        text: text.to_string(),
                        target,
                    });
                }
            }
        }
    }

    plan
}

/// Execute a plan's requests with bounded concurrency, filling the cache.
///
/// Failures are returned rather than propagated: one dead translation
/// leaves its cells empty but never aborts the run.
pub async fn fetch_translations(
    provider: &Arc<dyn LLMProvider>,
    requests: Vec<TranslationRequest>,
    source: Language,
    config: &ConversionConfig,
    cache: &mut TranslationCache,
) -> Vec<TranslationError> {
    let total = requests.len();
    if total == 0 {
        return Vec::new();
    }
    debug!("Fetching {} unique translations", total);

    let done = AtomicUsize::new(0);
    let outcomes: Vec<Result<(TranslationRequest, String), TranslationError>> =
        stream::iter(requests.into_iter().map(|req| {
            let provider = Arc::clone(provider);
            let config_clone = config.clone();
            let done = &done;
            async move {
                let outcome = translate_one(&provider, &req, source, &config_clone).await;
                let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(ref cb) = config_clone.progress_callback {
                    cb.on_translation_progress(n, total);
                }
                outcome.map(|translated| (req, translated))
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok((req, translated)) => cache.insert(req.text, req.target, translated),
            Err(e) => failures.push(e),
        }
    }
    failures
}

/// Fill every empty target cell the cache has an answer for.
///
/// Returns the number of cells written. The source language's own columns
/// are never touched — the default text is not copied into its
/// same-language slot.
pub fn apply_translations(
    table: &mut MenuTable,
    source: Language,
    cache: &TranslationCache,
) -> usize {
    let mut filled = 0;
    for row in &mut table.rows {
        for field in TranslatableField::ALL {
            let text = row.default_value(field).trim().to_string();
            if text.is_empty() {
                continue;
            }
            for target in source.targets() {
                if !row.translation(field, target).trim().is_empty() {
                    continue;
                }
                if let Some(translated) = cache.get(&text, target) {
                    let translated = translated.to_string();
                    row.set_translation(field, target, translated);
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// One translation request with retry/backoff, mirroring the extraction
/// client's strategy.
async fn translate_one(
    provider: &Arc<dyn LLMProvider>,
    req: &TranslationRequest,
    source: Language,
    config: &ConversionConfig,
) -> Result<String, TranslationError> {
    let messages = vec![
        ChatMessage::system(prompts::translation_system_prompt(source, req.target)),
        ChatMessage::user(prompts::translation_user_prompt(&req.text)),
    ];
    let options = CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err = String::from("Unknown error");

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Translation '{}' → {}: retry {}/{} after {}ms",
                req.text, req.target, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                return Ok(response.content.trim().to_string());
            }
            Ok(Err(e)) => {
                last_err = format!("{}", e);
                warn!(
                    "Translation '{}' → {}: attempt {} failed — {}",
                    req.text,
                    req.target,
                    attempt + 1,
                    last_err
                );
            }
            Err(_) => {
                last_err = format!("timed out after {}s", config.api_timeout_secs);
            }
        }
    }

    Err(TranslationError {
        text: req.text.clone(),
        target: req.target.code().to_string(),
        detail: last_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuRow;

    fn row(category: &str, name: &str, price: &str) -> MenuRow {
        MenuRow::from_cells([
            category.into(),
            String::new(),
            name.into(),
            String::new(),
            price.into(),
        ])
    }

    fn table(rows: Vec<MenuRow>) -> MenuTable {
        MenuTable { rows }
    }

    #[test]
    fn fully_populated_table_plans_zero_requests() {
        let mut t = table(vec![row("Starters", "Soup", "5.50")]);
        for field in TranslatableField::ALL {
            for target in Language::En.targets() {
                t.rows[0].set_translation(field, target, "done".into());
            }
        }
        let plan = plan_requests(&t, Language::En, &TranslationCache::new());
        assert!(plan.requests.is_empty());
        assert_eq!(plan.cells, 0);
    }

    #[test]
    fn duplicate_text_plans_one_request_per_target() {
        let t = table(vec![row("Starters", "Soup", "5.50"), row("Starters", "Soup", "7.00")]);
        let plan = plan_requests(&t, Language::En, &TranslationCache::new());
        // Two distinct texts ("Starters", "Soup") × four targets.
        assert_eq!(plan.requests.len(), 8);
        // But both rows' cells are counted: 2 rows × 2 fields × 4 targets.
        assert_eq!(plan.cells, 16);
        let soup_requests = plan
            .requests
            .iter()
            .filter(|r| r.text == "Soup" && r.target == Language::Fr)
            .count();
        assert_eq!(soup_requests, 1);
    }

    #[test]
    fn source_language_is_never_a_target() {
        let t = table(vec![row("Vorspeisen", "Suppe", "4.50")]);
        let plan = plan_requests(&t, Language::De, &TranslationCache::new());
        assert!(plan.requests.iter().all(|r| r.target != Language::De));
        assert_eq!(plan.requests.len(), 8); // 2 texts × 4 targets
    }

    #[test]
    fn empty_default_cells_are_skipped() {
        let t = table(vec![row("Starters", "Soup", "5.50")]);
        // subcategory and description are empty → only 2 texts planned.
        let plan = plan_requests(&t, Language::En, &TranslationCache::new());
        assert!(plan.requests.iter().all(|r| !r.text.is_empty()));
        assert_eq!(plan.requests.len(), 8);
    }

    #[test]
    fn cached_pairs_are_not_replanned() {
        let t = table(vec![row("Starters", "Soup", "5.50")]);
        let mut cache = TranslationCache::new();
        cache.insert("Soup".into(), Language::Fr, "Soupe".into());
        let plan = plan_requests(&t, Language::En, &cache);
        assert_eq!(plan.requests.len(), 7);
        assert_eq!(plan.cells, 8);
    }

    #[test]
    fn apply_fills_from_cache_and_leaves_misses_empty() {
        let mut t = table(vec![row("Starters", "Soup", "5.50"), row("Starters", "Soup", "7.00")]);
        let mut cache = TranslationCache::new();
        cache.insert("Soup".into(), Language::Fr, "Soupe".into());
        cache.insert("Starters".into(), Language::Fr, "Entrées".into());

        let filled = apply_translations(&mut t, Language::En, &cache);
        // Both rows get both French cells; German/Spanish/Portuguese missing.
        assert_eq!(filled, 4);
        for r in &t.rows {
            assert_eq!(r.translation(TranslatableField::ItemName, Language::Fr), "Soupe");
            assert_eq!(r.translation(TranslatableField::ItemName, Language::De), "");
            // The source language's own column stays empty.
            assert_eq!(r.translation(TranslatableField::ItemName, Language::En), "");
        }
    }

    #[test]
    fn apply_never_overwrites_existing_cells() {
        let mut t = table(vec![row("Starters", "Soup", "5.50")]);
        t.rows[0].set_translation(TranslatableField::ItemName, Language::Fr, "Potage".into());
        let mut cache = TranslationCache::new();
        cache.insert("Soup".into(), Language::Fr, "Soupe".into());

        apply_translations(&mut t, Language::En, &cache);
        assert_eq!(
            t.rows[0].translation(TranslatableField::ItemName, Language::Fr),
            "Potage"
        );
    }

    #[test]
    fn plan_then_apply_round_trip() {
        let mut t = table(vec![row("Starters", "Soup", "5.50")]);
        let mut cache = TranslationCache::new();
        let plan = plan_requests(&t, Language::En, &cache);
        // Simulate the fetch phase.
        for req in &plan.requests {
            cache.insert(
                req.text.clone(),
                req.target,
                format!("{}-{}", req.text, req.target.code()),
            );
        }
        let filled = apply_translations(&mut t, Language::En, &cache);
        assert_eq!(filled, plan.cells);
        // Nothing left to do.
        let replan = plan_requests(&t, Language::En, &cache);
        assert!(replan.requests.is_empty());
        assert_eq!(replan.cells, 0);
    }
}
