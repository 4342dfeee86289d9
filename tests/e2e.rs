//! End-to-end integration tests for menu2xlsx.
//!
//! These tests use real menu files in `./test_cases/` and make live LLM API
//! calls.  They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_convert_german_menu -- --nocapture

use menu2xlsx::{
    convert, convert_to_workbook, ConversionConfig, ConversionOutput, Language, MenuTable,
    TranslatableField,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no menu file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Assert the extracted table passes basic quality checks.
fn assert_table_quality(output: &ConversionOutput, context: &str) {
    let table = &output.table;

    assert!(!table.is_empty(), "[{context}] No rows extracted");

    // Every row must have a name or a category — a fully blank row means the
    // parser accepted noise.
    for (i, row) in table.rows.iter().enumerate() {
        let has_content = !row.default_value(TranslatableField::ItemName).is_empty()
            || !row.default_value(TranslatableField::CategoryTitle).is_empty();
        assert!(has_content, "[{context}] Row {i} is entirely blank");
    }

    // A real menu has prices on most item rows.
    let priced = table.rows.iter().filter(|r| !r.item_price.is_empty()).count();
    assert!(
        priced * 2 >= table.len(),
        "[{context}] Less than half the rows have a price ({priced}/{})",
        table.len()
    );

    // Header rows from the model must never leak into the data.
    assert!(
        !table
            .rows
            .iter()
            .any(|r| r.default_value(TranslatableField::CategoryTitle) == "CategoryTitleDefault"),
        "[{context}] A header row leaked into the table"
    );

    println!(
        "[{context}] ✓  {} rows, {} priced, quality checks passed",
        table.len(),
        priced
    );
}

/// Assert that translated cells are filled for every target language.
fn assert_translations_filled(output: &ConversionOutput, source: Language, context: &str) {
    let named_rows: Vec<_> = output
        .table
        .rows
        .iter()
        .filter(|r| !r.default_value(TranslatableField::ItemName).is_empty())
        .collect();
    assert!(!named_rows.is_empty(), "[{context}] No named rows");

    for target in source.targets() {
        let filled = named_rows
            .iter()
            .filter(|r| !r.translation(TranslatableField::ItemName, target).is_empty())
            .count();
        // Individual translations may fail; most must succeed.
        assert!(
            filled * 2 >= named_rows.len(),
            "[{context}] Only {filled}/{} ItemName cells translated to {target}",
            named_rows.len()
        );
    }
    println!("[{context}] ✓  translations present for all targets");
}

/// Build a minimal two-page PDF in memory: page 1 landscape, page 2 portrait.
///
/// The differing orientations make document order observable in the rendered
/// output without needing any page content.
fn two_page_pdf() -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>",
        "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>",
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 400 200] >>",
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 400] >>",
    ];
    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    pdf.push_str("0000000000 65535 f \n");
    for off in offsets {
        pdf.push_str(&format!("{off:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    pdf.into_bytes()
}

// ── Rendering tests (pdfium, no LLM) ─────────────────────────────────────────

/// Gated on E2E_ENABLED for the pdfium library, but makes no model calls.
#[tokio::test]
async fn test_two_page_pdf_renders_exactly_two_pages_in_order() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    use menu2xlsx::pipeline::{input::resolve_input, render::render_input};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("karte.pdf");
    std::fs::write(&path, two_page_pdf()).unwrap();

    let resolved = resolve_input(path.to_str().unwrap(), 10)
        .await
        .expect("generated PDF must resolve");
    let config = ConversionConfig::default();
    let pages = render_input(&resolved, &config)
        .await
        .expect("render should succeed");

    assert_eq!(pages.len(), 2, "two-page PDF must yield exactly two images");
    // Document order: the landscape page renders first, the portrait second.
    assert!(
        pages[0].width() > pages[0].height(),
        "page 1 must be landscape, got {}x{}",
        pages[0].width(),
        pages[0].height()
    );
    assert!(
        pages[1].height() > pages[1].width(),
        "page 2 must be portrait, got {}x{}",
        pages[1].width(),
        pages[1].height()
    );
}

// ── Live conversion tests (LLM + pdfium) ─────────────────────────────────────

/// Gated e2e test: full German menu PDF → table + translations.
#[tokio::test]
async fn test_convert_german_menu_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("speisekarte.pdf"));

    let config = ConversionConfig::builder()
        .concurrency(4)
        .build()
        .expect("config must build");

    let output = convert(&[path.to_str().unwrap()], Language::De, &config)
        .await
        .expect("convert() should succeed");

    assert_table_quality(&output, "german-pdf");
    assert_translations_filled(&output, Language::De, "german-pdf");
    assert_eq!(output.source_language, Language::De);
    assert!(output.stats.rows_extracted > 0);
    assert!(output.stats.total_input_tokens > 0);
}

/// Gated e2e test: photographed menu (single JPEG) without translation.
#[tokio::test]
async fn test_convert_photo_no_translate() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("menu_photo.jpg"));

    let config = ConversionConfig::builder()
        .translate(false)
        .build()
        .expect("config must build");

    let output = convert(&[path.to_str().unwrap()], Language::En, &config)
        .await
        .expect("convert() should succeed");

    assert_table_quality(&output, "photo");
    assert_eq!(output.stats.translation_requests, 0);
    // Translation off: every language cell must be empty.
    for row in &output.table.rows {
        for target in Language::En.targets() {
            assert!(row.translation(TranslatableField::ItemName, target).is_empty());
        }
    }
}

/// Gated e2e test: two inputs concatenate into one table, then a workbook.
#[tokio::test]
async fn test_convert_multi_input_to_workbook() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("speisekarte.pdf"));
    let photo = test_cases_dir().join("menu_photo.jpg");
    if !photo.exists() {
        println!("SKIP — test file not found: {}", photo.display());
        return;
    }

    let config = ConversionConfig::builder()
        .translate(false)
        .build()
        .expect("config must build");

    let inputs = [pdf.to_str().unwrap(), photo.to_str().unwrap()];
    let (path, output) =
        convert_to_workbook(&inputs, Language::De, "menu 1", output_dir(), &config)
            .await
            .expect("convert_to_workbook() should succeed");

    // Base name verbatim, spaces preserved.
    assert!(path.ends_with("menu 1.xlsx"), "got: {}", path.display());
    assert!(path.exists());

    // Pages from the second input continue the numbering of the first.
    let max_page = output.pages.iter().map(|p| p.page_num).max().unwrap_or(0);
    assert_eq!(max_page, output.stats.total_pages);
    assert!(output.stats.total_pages >= 2);

    // The workbook is a zip container.
    let bytes = std::fs::read(&path).expect("workbook readable");
    assert_eq!(&bytes[..2], b"PK");
}

// ── Offline tests (no LLM, no network) ───────────────────────────────────────

#[test]
fn test_workbook_schema_is_25_columns() {
    let headers = MenuTable::headers();
    assert_eq!(headers.len(), 25);
    assert_eq!(headers[0], "CategoryTitleDefault");
    assert_eq!(headers[4], "ItemPrice");
    // Language blocks follow in En, Pt, Fr, De, Es order.
    assert_eq!(headers[5], "CategoryTitleEn");
    assert_eq!(headers[24], "ItemDescriptionEs");
}

#[test]
fn test_config_builder_round_trip() {
    let config = ConversionConfig::builder()
        .concurrency(4)
        .max_tokens(1024)
        .translate(false)
        .model("gpt-4o")
        .translation_model("gpt-4.1-nano")
        .build()
        .expect("config must build");

    assert_eq!(config.concurrency, 4);
    assert_eq!(config.max_tokens, 1024);
    assert!(!config.translate);
    assert_eq!(config.model.as_deref(), Some("gpt-4o"));
    assert_eq!(config.translation_model.as_deref(), Some("gpt-4.1-nano"));
}

#[tokio::test]
async fn test_convert_rejects_empty_inputs() {
    let config = ConversionConfig::default();
    let inputs: Vec<&str> = vec![];
    let err = convert(&inputs, Language::En, &config).await.unwrap_err();
    assert!(err.to_string().contains("No input files"));
}

#[tokio::test]
async fn test_convert_rejects_empty_output_name() {
    let config = ConversionConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let err = convert_to_workbook(&["menu.pdf"], Language::En, "", dir.path(), &config)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("filename is empty"));
}

#[test]
fn test_language_names_resolve_without_network() {
    assert_eq!(Language::from_ui_name("German"), Some(Language::De));
    assert_eq!(Language::from_ui_name("British English"), Some(Language::En));
    assert_eq!(Language::from_ui_name("pt"), Some(Language::Pt));
    assert_eq!(Language::from_ui_name("Klingon"), None);
}
