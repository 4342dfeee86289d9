//! Conversion entry points: menu documents in, workbook (or table) out.
//!
//! [`convert`] is the primary API: it accepts any mix of PDF and image
//! inputs, extracts one accumulated table across all of their pages, and
//! optionally fills the translation columns. [`convert_to_workbook`] adds
//! the final step of writing the `.xlsx` file.
//!
//! Partial failure is the normal case for a multi-page scan: individual
//! pages and individual translations may fail without aborting the run.
//! Only "nothing at all could be extracted" is fatal.

use crate::config::ConversionConfig;
use crate::error::Menu2XlsxError;
use crate::language::Language;
use crate::menu::{MenuRow, MenuTable};
use crate::output::{ConversionOutput, ConversionStats, PageResult};
use crate::pipeline::{encode, extract, input, render, translate};
use crate::workbook;
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one or more menu documents into a single accumulated table.
///
/// Inputs may be local paths or HTTP/HTTPS URLs, PDFs or jpg/jpeg/png
/// images, in any mix. Pages are numbered continuously across inputs in
/// argument order, and extracted rows keep that page order in the table.
///
/// # Returns
/// `Ok(ConversionOutput)` as long as at least one page produced rows —
/// check `output.stats.failed_pages` and `output.translation_errors` for
/// partial failures.
///
/// # Errors
/// Fatal only: no inputs, unreadable/unsupported documents, no provider,
/// or every single page failing.
pub async fn convert(
    inputs: &[impl AsRef<str>],
    source: Language,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Menu2XlsxError> {
    let total_start = Instant::now();

    if inputs.is_empty() {
        return Err(Menu2XlsxError::NoInputFiles);
    }
    info!(
        "Starting conversion of {} input(s), source language {}",
        inputs.len(),
        source.full_name()
    );

    let provider = resolve_provider(config).await?;

    // ── Resolve and rasterise every input, concatenating page sequences ──
    let render_start = Instant::now();
    let mut page_images = Vec::new();
    for input_str in inputs {
        let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
        let mut pages = render::render_input(&resolved, config).await?;
        debug!(
            "Input '{}' contributed {} page(s)",
            input_str.as_ref(),
            pages.len()
        );
        page_images.append(&mut pages);
        // `resolved` (and any temp download) lives until here.
    }
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    let total_pages = page_images.len();
    info!("Rendered {} pages in {}ms", total_pages, render_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    // ── Encode pages; an encode failure costs that page, not the run ─────
    let mut encoded: Vec<(usize, ImageData)> = Vec::with_capacity(total_pages);
    let mut encode_failures: Vec<PageResult> = Vec::new();
    for (idx, img) in page_images.iter().enumerate() {
        let page_num = idx + 1;
        match encode::encode_page(img) {
            Ok(data) => encoded.push((page_num, data)),
            Err(e) => {
                warn!("Failed to encode page {}: {}", page_num, e);
                encode_failures.push(PageResult {
                    page_num,
                    rows: 0,
                    malformed_lines: 0,
                    input_tokens: 0,
                    output_tokens: 0,
                    duration_ms: 0,
                    retries: 0,
                    error: Some(crate::error::PageError::RenderFailed {
                        page: page_num,
                        detail: format!("Image encoding failed: {e}"),
                    }),
                });
            }
        }
    }
    drop(page_images);

    // ── Extract all pages concurrently ───────────────────────────────────
    let extract_start = Instant::now();
    let mut page_outcomes = extract_concurrent(&provider, encoded, source, config).await;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    for failure in encode_failures {
        page_outcomes.push((failure, Vec::new()));
    }
    // Rows must land in the table in page order regardless of completion order.
    page_outcomes.sort_by_key(|(pr, _)| pr.page_num);

    let mut table = MenuTable::new();
    let mut pages: Vec<PageResult> = Vec::with_capacity(page_outcomes.len());
    for (page_result, rows) in page_outcomes {
        table.rows.extend(rows);
        pages.push(page_result);
    }

    let processed = pages.iter().filter(|p| p.error.is_none()).count();
    let failed = pages.iter().filter(|p| p.error.is_some()).count();

    if processed == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| format!("{}", e))
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Menu2XlsxError::AllPagesFailed {
            total: pages.len(),
            retries: config.max_retries,
            first_error,
        });
    }

    // ── Translate the four text fields into the other four languages ─────
    let translate_start = Instant::now();
    let mut translation_errors = Vec::new();
    let mut translation_requests = 0;
    let mut translation_cache_hits = 0;
    if config.translate && !table.is_empty() {
        let translation_provider = resolve_translation_provider(config, &provider)?;
        let mut cache = translate::TranslationCache::new();
        let plan = translate::plan_requests(&table, source, &cache);
        translation_requests = plan.requests.len();
        info!(
            "Translating: {} unique requests for {} cells",
            plan.requests.len(),
            plan.cells
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_translation_start(plan.requests.len());
        }
        translation_errors = translate::fetch_translations(
            &translation_provider,
            plan.requests,
            source,
            config,
            &mut cache,
        )
        .await;
        let filled = translate::apply_translations(&mut table, source, &cache);
        let successful = translation_requests - translation_errors.len();
        translation_cache_hits = filled.saturating_sub(successful);
        debug!(
            "Translation: {} cells filled, {} cache hits, {} failures",
            filled,
            translation_cache_hits,
            translation_errors.len()
        );
    }
    let translate_duration_ms = translate_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        rows_extracted: table.len(),
        malformed_lines: pages.iter().map(|p| p.malformed_lines).sum(),
        translation_requests,
        translation_cache_hits,
        failed_translations: translation_errors.len(),
        total_input_tokens: pages.iter().map(|p| p.input_tokens as u64).sum(),
        total_output_tokens: pages.iter().map(|p| p.output_tokens as u64).sum(),
        render_duration_ms,
        extract_duration_ms,
        translate_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {}/{} pages, {} rows, {}ms total",
        processed, total_pages, stats.rows_extracted, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total_pages, processed);
    }

    Ok(ConversionOutput {
        source_language: source,
        table,
        pages,
        translation_errors,
        stats,
    })
}

/// Convert menu documents and write the workbook to `output_dir`.
///
/// The file is named `<base_name>.xlsx` with the base name used verbatim —
/// `"menu 1"` yields `menu 1.xlsx`. Written atomically (temp + rename).
///
/// Returns the written path together with the full conversion output.
pub async fn convert_to_workbook(
    inputs: &[impl AsRef<str>],
    source: Language,
    base_name: &str,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<(PathBuf, ConversionOutput), Menu2XlsxError> {
    if base_name.trim().is_empty() {
        return Err(Menu2XlsxError::EmptyOutputName);
    }

    let output = convert(inputs, source, config).await?;

    let path = workbook::output_path(output_dir.as_ref(), base_name);
    let table = output.table.clone();
    let path_clone = path.clone();
    tokio::task::spawn_blocking(move || workbook::write_workbook(&table, &path_clone))
        .await
        .map_err(|e| Menu2XlsxError::Internal(format!("Workbook task panicked: {}", e)))??;

    Ok((path, output))
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    inputs: &[impl AsRef<str>],
    source: Language,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Menu2XlsxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Menu2XlsxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, source, config))
}

/// Classify a free-form language name into the supported set via the model.
///
/// Used when the caller has a user-supplied language string that
/// [`Language::from_ui_name`] could not match. Returns `Ok(None)` when the
/// model's answer is not one of the five supported languages either.
pub async fn detect_language(
    name: &str,
    config: &ConversionConfig,
) -> Result<Option<Language>, Menu2XlsxError> {
    let provider = resolve_provider(config).await?;
    crate::language::classify_language(&provider, name).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Menu2XlsxError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Menu2XlsxError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the vision provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is. Useful in
///    tests or when the caller needs custom middleware.
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    matching API key (`OPENAI_API_KEY`, etc.) from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    honoured before auto-detection so an explicit model choice wins even
///    when multiple API keys are present.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — with an
///    explicit preference for OpenAI when `OPENAI_API_KEY` is set.
async fn resolve_provider(
    config: &ConversionConfig,
) -> Result<Arc<dyn LLMProvider>, Menu2XlsxError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4o");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    // Prefer OpenAI when its key is present so users with multiple provider
    // keys get a vision-capable default unless they ask for another provider.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4o");
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Menu2XlsxError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Resolve the provider used for translation and classification calls.
///
/// Translation is a text-only task, so `translation_model` lets callers pick
/// a cheaper non-vision model. Without it the vision provider is reused.
fn resolve_translation_provider(
    config: &ConversionConfig,
    vision_provider: &Arc<dyn LLMProvider>,
) -> Result<Arc<dyn LLMProvider>, Menu2XlsxError> {
    let Some(ref model) = config.translation_model else {
        return Ok(Arc::clone(vision_provider));
    };

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }
    // No way to honour the model override; the vision provider still works.
    warn!(
        "translation_model '{}' set but no provider name or OPENAI_API_KEY; \
        reusing the vision provider",
        model
    );
    Ok(Arc::clone(vision_provider))
}

/// Fan every encoded page out to the model with bounded concurrency.
async fn extract_concurrent(
    provider: &Arc<dyn LLMProvider>,
    pages: Vec<(usize, ImageData)>,
    source: Language,
    config: &ConversionConfig,
) -> Vec<(PageResult, Vec<MenuRow>)> {
    let total_pages = pages.len();
    stream::iter(pages.into_iter().map(|(page_num, img_data)| {
        let provider = Arc::clone(provider);
        let config_clone = config.clone();
        async move {
            if let Some(ref cb) = config_clone.progress_callback {
                cb.on_page_start(page_num, total_pages);
            }
            let (result, rows) =
                extract::extract_page(&provider, page_num, img_data, source, &config_clone).await;
            if let Some(ref cb) = config_clone.progress_callback {
                match &result.error {
                    None => cb.on_page_complete(page_num, total_pages, result.rows),
                    Some(e) => cb.on_page_error(page_num, total_pages, e.to_string()),
                }
            }
            (result, rows)
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_input_list_is_rejected() {
        let config = ConversionConfig::default();
        let inputs: Vec<&str> = Vec::new();
        let err = convert(&inputs, Language::En, &config).await.unwrap_err();
        assert!(matches!(err, Menu2XlsxError::NoInputFiles));
    }

    #[tokio::test]
    async fn empty_output_name_is_rejected() {
        let config = ConversionConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let err = convert_to_workbook(&["menu.pdf"], Language::En, "  ", dir.path(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Menu2XlsxError::EmptyOutputName));
    }

    #[tokio::test]
    async fn missing_input_file_is_fatal() {
        let config = ConversionConfig::default();
        let err = convert(&["/no/such/menu.pdf"], Language::De, &config)
            .await
            .unwrap_err();
        // Input resolution fails before any provider is needed only if a
        // provider resolves first; both are acceptable fatal errors here.
        assert!(matches!(
            err,
            Menu2XlsxError::FileNotFound { .. } | Menu2XlsxError::ProviderNotConfigured { .. }
        ));
    }
}
