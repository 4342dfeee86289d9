//! CLI binary for menu2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use menu2xlsx::{
    convert, convert_to_workbook, detect_language, ConversionConfig, ConversionProgressCallback,
    Language, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar for the page phase, then a second
/// for the translation fan-out. Works correctly when pages complete
/// out-of-order (concurrent mode).
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of pages that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_conversion_start` (called before any pages are processed).
    fn new_dynamic() -> Arc<Self> {
        // Length is unknown until on_conversion_start; start as a spinner.
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening menu…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once a phase total is known.
    fn activate_bar(&self, prefix: &str, total: usize, unit: &str) {
        let progress_style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(prefix.to_string());
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know the actual page count.
        self.activate_bar("Extracting", total_pages, "pages");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting menu items from {total_pages} page(s)…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, rows: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{rows:>3} items")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: String) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per page: truncate long error messages.
        let msg = truncate_for_log(&error, 80);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_translation_start(&self, total_requests: usize) {
        if total_requests == 0 {
            return;
        }
        self.activate_bar("Translating", total_requests, "texts");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Translating {total_requests} unique texts…"))
        ));
    }

    fn on_translation_progress(&self, done: usize, _total: usize) {
        self.bar.set_position(done as u64);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

/// Cap a log message at `max` bytes without splitting a UTF-8 character,
/// appending an ellipsis when anything was cut.
///
/// Error details routinely carry non-ASCII text (file names, localized
/// provider messages), so a byte-indexed slice would panic whenever the cut
/// lands inside a multi-byte character.
fn truncate_for_log(msg: &str, max: usize) -> String {
    if msg.len() <= max {
        return msg.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut end = 0;
    for (idx, ch) in msg.char_indices() {
        if idx + ch.len_utf8() > budget {
            break;
        }
        end = idx + ch.len_utf8();
    }
    format!("{}\u{2026}", &msg[..end])
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # German menu card to "menu 1.xlsx"
  menu2xlsx --language German -o "menu 1" karte.pdf

  # Photographed menu, multiple pages as separate images
  menu2xlsx --language French -o bistro page1.jpg page2.jpg

  # Skip the translation phase (source columns only)
  menu2xlsx --language Spanish --no-translate -o carta carta.pdf

  # Use a specific vision model and a cheaper translation model
  menu2xlsx --model gpt-4o --translation-model gpt-4.1-nano \
      --language English -o menu menu.pdf

  # Convert from a URL
  menu2xlsx --language Portuguese -o ementa https://example.com/ementa.pdf

  # Structured JSON (table + per-page stats) instead of a workbook
  menu2xlsx --language German --json karte.pdf > karte.json

OUTPUT SCHEMA (25 columns, one row per menu item):
  CategoryTitleDefault  SubcategoryTitleDefault  ItemNameDefault
  ItemDescriptionDefault  ItemPrice
  + {CategoryTitle, SubcategoryTitle, ItemName, ItemDescription} × {En, Pt, Fr, De, Es}

  The four *Default columns hold the menu's own language; ItemPrice is
  copied verbatim and never translated.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Convert:         menu2xlsx --language German -o "menu 1" karte.pdf

  PDFium (~30 MB) is downloaded automatically on first run and cached.
  To use an existing pdfium copy: PDFIUM_LIB_PATH=/path/to/libpdfium menu2xlsx ...
"#;

/// Convert restaurant menus (PDF or photo) to a translated Excel workbook.
#[derive(Parser, Debug)]
#[command(
    name = "menu2xlsx",
    version,
    about = "Convert restaurant menus (PDF or photos) to a translated Excel workbook using Vision LLMs",
    long_about = "Extract menu items from PDF or image files (local or URLs) with a Vision \
Language Model, translate them into English, Portuguese, French, German, and Spanish, and \
write everything into a single flat .xlsx sheet. Supports OpenAI, Anthropic, Google Gemini, \
and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Menu documents: local PDF/jpg/jpeg/png paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// The menu's own language: a name ("German", "European Portuguese")
    /// or a two-letter code (En/Pt/Fr/De/Es).
    #[arg(
        short,
        long,
        env = "MENU2XLSX_LANGUAGE",
        long_help = "The language the menu is written in. Accepts the five supported names \
(English, Portuguese, French, German, Spanish), regional labels like \"British English\", \
or two-letter codes. Unrecognised names are classified via the model as a fallback."
    )]
    language: String,

    /// Output workbook base name (no extension); "menu 1" → "menu 1.xlsx".
    #[arg(short, long, env = "MENU2XLSX_OUTPUT", default_value = "menu")]
    output: String,

    /// Directory the workbook is written into.
    #[arg(long, env = "MENU2XLSX_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Vision LLM model ID (e.g. gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Text model for translation/classification; defaults to the vision model.
    #[arg(
        long,
        env = "MENU2XLSX_TRANSLATION_MODEL",
        long_help = "Translation is text-only, so a cheaper non-vision model (e.g. \
gpt-4.1-nano) can handle it while the vision model reads the pages."
    )]
    translation_model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Skip the translation phase; the 20 language columns stay empty.
    #[arg(long, env = "MENU2XLSX_NO_TRANSLATE")]
    no_translate: bool,

    /// Maximum rendered page dimension in pixels.
    #[arg(long, env = "MENU2XLSX_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=8000))]
    max_pixels: u32,

    /// Number of concurrent model API calls.
    #[arg(short, long, env = "MENU2XLSX_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "MENU2XLSX_PASSWORD")]
    password: Option<String>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "MENU2XLSX_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Retries per page/translation on LLM failure.
    #[arg(long, env = "MENU2XLSX_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Output structured JSON (table + stats) to stdout instead of a workbook.
    #[arg(long, env = "MENU2XLSX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MENU2XLSX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MENU2XLSX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MENU2XLSX_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MENU2XLSX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "MENU2XLSX_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure PDFium engine is available ────────────────────────────────
    // When compiled with `--features bundled`, the pdfium shared library was
    // embedded at compile time. We just extract it (if needed) and continue.
    // Without `bundled`, the first run downloads the library (~30 MB) and
    // caches it; subsequent startups skip this block entirely.
    #[cfg(feature = "bundled")]
    {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_bundled())
            .context("Failed to extract bundled PDFium engine")?;
    }

    #[cfg(not(feature = "bundled"))]
    if !pdfium_auto::is_pdfium_cached() {
        if !cli.quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.set_message("Connecting…");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            // block_in_place instead of spawn_blocking: the progress closure
            // borrows the bar, so a 'static bound would not hold.
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                            bar.set_prefix("PDF engine");
                        }
                        bar.set_position(downloaded);
                    } else {
                        bar.set_position(downloaded);
                    }
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        } else {
            // Quiet mode downloads without a bar; failures still propagate.
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Resolve the menu language ────────────────────────────────────────
    let source = match Language::from_ui_name(&cli.language) {
        Some(lang) => lang,
        None => {
            // Free-form name ("Deutsch", "Castellano") — ask the model.
            if !cli.quiet {
                eprintln!(
                    "{} Language '{}' not in the known list; classifying via the model…",
                    cyan("◆"),
                    cli.language
                );
            }
            detect_language(&cli.language, &config)
                .await
                .context("Language classification failed")?
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "Unrecognized menu language '{}'.\n\
                        Supported: English, Portuguese, French, German, Spanish (En/Pt/Fr/De/Es).",
                        cli.language
                    )
                })?
        }
    };

    // ── Run conversion ───────────────────────────────────────────────────
    if cli.json {
        let output = convert(&cli.inputs, source, &config)
            .await
            .context("Conversion failed")?;
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");

        if !cli.quiet {
            eprintln!(
                "Extracted {} rows from {}/{} pages in {}ms",
                output.stats.rows_extracted,
                output.stats.processed_pages,
                output.stats.total_pages,
                output.stats.total_duration_ms
            );
        }
        return Ok(());
    }

    let (path, output) = convert_to_workbook(&cli.inputs, source, &cli.output, &cli.output_dir, &config)
        .await
        .context("Conversion failed")?;
    let stats = &output.stats;

    // Summary line (callback already printed the per-page log).
    if !cli.quiet {
        eprintln!(
            "{}  {} rows from {}/{} pages  {}ms  →  {}",
            if stats.failed_pages == 0 && stats.failed_translations == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&stats.rows_extracted.to_string()),
            stats.processed_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        if stats.malformed_lines > 0 {
            eprintln!(
                "   {} table lines dropped (wrong column count) — check the workbook",
                red(&stats.malformed_lines.to_string())
            );
        }
        if stats.failed_translations > 0 {
            eprintln!(
                "   {} translations failed; their cells are empty",
                red(&stats.failed_translations.to_string())
            );
        }
        if stats.translation_requests > 0 {
            eprintln!(
                "   {} translation requests  /  {} cells filled from cache",
                dim(&stats.translation_requests.to_string()),
                dim(&stats.translation_cache_hits.to_string()),
            );
        }
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .max_rendered_pixels(cli.max_pixels)
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .translate(!cli.no_translate)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Apply fields the builder doesn't have required setters for here.
    config.model = cli.model.clone();
    config.translation_model = cli.translation_model.clone();
    config.provider_name = cli.provider.clone();
    config.password = cli.password.clone();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        // 78 ASCII bytes, then a 2-byte char straddling the cut point.
        let msg = format!("{}ü and more detail", "x".repeat(78));
        let out = truncate_for_log(&msg, 80);
        assert!(out.ends_with('\u{2026}'));
        assert!(out.starts_with(&"x".repeat(78)));
        assert!(!out.contains('ü'), "straddling char must be cut whole");
    }

    #[test]
    fn truncation_passes_short_messages_through() {
        assert_eq!(truncate_for_log("boom", 80), "boom");
        let exactly_80 = "y".repeat(80);
        assert_eq!(truncate_for_log(&exactly_80, 80), exactly_80);
    }

    #[test]
    fn truncation_of_all_multibyte_text_never_panics() {
        let msg = "Speisekarte_Müller.pdf: Ränderung fehlgeschlagen — äöüß".repeat(4);
        let out = truncate_for_log(&msg, 80);
        assert!(out.len() <= 80 + '\u{2026}'.len_utf8());
    }

    #[test]
    fn provider_flag_reads_the_documented_env_var() {
        let cmd = Cli::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id() == "provider")
            .expect("provider arg exists");
        assert_eq!(
            arg.get_env().and_then(|e| e.to_str()),
            Some("EDGEQUAKE_LLM_PROVIDER"),
            "help text and library fallback both name EDGEQUAKE_LLM_PROVIDER"
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
