//! Vision extraction: build the per-page request and parse the response.
//!
//! This module converts a rasterised page image into one vision API call and
//! returns the rows it yielded. It is intentionally thin — all prompt
//! engineering lives in [`crate::prompts`] and all response parsing in
//! [`crate::parser`], so either can change without touching retry or
//! error-handling logic here.
//!
//! ## Retry Strategy
//!
//! Under a concurrent fan-out the model API frequently answers 429 or 503;
//! both are transient. Each attempt waits `retry_backoff_ms * 2^attempt`
//! before the next, so the default 500 ms base with 3 retries backs off
//! 500 ms, then 1 s, then 2 s per page.

use crate::config::ConversionConfig;
use crate::error::PageError;
use crate::language::Language;
use crate::menu::MenuRow;
use crate::output::PageResult;
use crate::parser;
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Extract one page's table rows via the vision model.
///
/// ## Message Layout
///
/// The request contains (in order):
/// 1. **System message** — the five-column extraction prompt naming the
///    menu's source language
/// 2. **User message** — a short instruction plus the page JPEG as a base64
///    image attachment
///
/// ## Return Value
///
/// Always returns `(PageResult, Vec<MenuRow>)` — never propagates the error
/// upward, so a single bad page doesn't abort the entire menu. Callers check
/// `result.error` to decide whether the page contributed rows.
pub async fn extract_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image_data: ImageData,
    source: Language,
    config: &ConversionConfig,
) -> (PageResult, Vec<MenuRow>) {
    let start = Instant::now();

    let messages = vec![
        ChatMessage::system(prompts::extraction_system_prompt(source)),
        ChatMessage::user_with_images(prompts::EXTRACTION_USER_PROMPT, vec![image_data]),
    ];

    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "Page {}: {} input tokens, {} output tokens, {:?}",
                    page_num, response.prompt_tokens, response.completion_tokens, duration
                );

                let cleaned = parser::clean_response(&response.content);
                let outcome = parser::parse_page_table(&cleaned);

                let result = PageResult {
                    page_num,
                    rows: outcome.rows.len(),
                    malformed_lines: outcome.malformed_lines,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt as u8,
                    error: None,
                };
                return (result, outcome.rows);
            }
            Ok(Err(e)) => {
                let err_msg = format!("{}", e);
                warn!("Page {}: attempt {} failed — {}", page_num, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
            Err(_) => {
                warn!(
                    "Page {}: attempt {} timed out after {}s",
                    page_num,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(format!("timed out after {}s", config.api_timeout_secs));
            }
        }
    }

    // Retries exhausted; the page contributes no rows.
    let duration = start.elapsed();
    let err_msg = last_err.unwrap_or_else(|| "Unknown error".to_string());

    let result = PageResult {
        page_num,
        rows: 0,
        malformed_lines: 0,
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: duration.as_millis() as u64,
        retries: config.max_retries as u8,
        error: Some(PageError::ExtractionFailed {
            page: page_num,
            retries: config.max_retries as u8,
            detail: err_msg,
        }),
    };
    (result, Vec::new())
}

/// Build `CompletionOptions` from the conversion config.
fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_pins_temperature_to_zero() {
        let config = ConversionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(2048));
    }
}
