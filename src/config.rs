//! Configuration types for menu-to-workbook conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads and to diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::Menu2XlsxError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for a menu conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use menu2xlsx::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .concurrency(8)
///     .model("gpt-4o")
///     .translate(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Maximum rendered page dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap on pdfium output. An A3 menu card rendered at high density
    /// could produce an enormous bitmap; this caps either dimension, scaling
    /// the other proportionally, and matches the image-size sweet spot for
    /// GPT-4-class vision models.
    pub max_rendered_pixels: u32,

    /// Number of concurrent model API calls (pages and translation cells). Default: 8.
    ///
    /// Both per-page extraction and per-cell translation are independent
    /// network-bound calls; fanning them out typically cuts wall-clock time
    /// from minutes to seconds for a multi-item menu. Lower this if you hit
    /// rate-limit errors (`429`).
    pub concurrency: usize,

    /// Vision model identifier, e.g. "gpt-4o", "claude-sonnet-4-20250514".
    /// `None` falls back to the provider's default model.
    pub model: Option<String>,

    /// Model used for translation and language classification. If None, falls
    /// back to `model`. The original workflow used a cheaper text model for
    /// translations than for vision extraction; this keeps that option open.
    pub translation_model: Option<String>,

    /// Provider name ("openai", "anthropic", "ollama", …). When both this
    /// and `provider` are `None`, the provider is auto-detected from the
    /// environment.
    pub provider_name: Option<String>,

    /// A ready-made provider handle; wins over `provider_name` when set.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every model call. Default: 0.0.
    ///
    /// Pinned to the minimum so repeated runs on identical input are as
    /// stable as the model allows. Extraction and translation are both
    /// transcription-style tasks; creativity only hurts.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 2048.
    ///
    /// A dense menu page can run past 1 000 output tokens; setting this too
    /// low silently truncates the table mid-row and every truncated row is
    /// then dropped by the column-count check.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient model API failure. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient. Permanent errors (bad API
    /// key, 400) are not retried — they surface as page or translation
    /// errors immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubling per attempt. Default: 500.
    ///
    /// The default sequence is 500 ms, 1 s, 2 s. Doubling keeps N concurrent
    /// workers from hammering a recovering API endpoint in lockstep.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Fill the per-language columns via translation calls. Default: true.
    ///
    /// With this off the output workbook still carries the full 25-column
    /// schema; the 20 language columns are simply left empty.
    pub translate: bool,

    /// Timeout in seconds for downloading URL inputs. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional progress callback receiving page and translation events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 2000,
            concurrency: 8,
            model: None,
            translation_model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            password: None,
            translate: true,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("translation_model", &self.translation_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("translate", &self.translate)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn translation_model(mut self, model: impl Into<String>) -> Self {
        self.config.translation_model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn translate(mut self, v: bool) -> Self {
        self.config.translate = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Menu2XlsxError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Menu2XlsxError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Menu2XlsxError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
