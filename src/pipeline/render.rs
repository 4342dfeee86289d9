//! Rasterisation: turn each input document into a sequence of page images.
//!
//! PDFs render page by page through pdfium; a raster image input decodes
//! into a one-element sequence, its colour mode preserved until the encoder
//! forces RGB.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local internals; calling it from an
//! async context directly is unsound and would also pin a Tokio worker
//! thread for the whole CPU-heavy render. All pdfium work therefore runs
//! inside `tokio::task::spawn_blocking`, as does single-image decoding.

use crate::config::ConversionConfig;
use crate::error::Menu2XlsxError;
use crate::pipeline::input::{InputKind, ResolvedInput};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Rasterise one resolved input into its page images, in document order.
///
/// A PDF yields one image per page; an image input yields exactly one.
pub async fn render_input(
    input: &ResolvedInput,
    config: &ConversionConfig,
) -> Result<Vec<DynamicImage>, Menu2XlsxError> {
    match input.kind() {
        InputKind::Pdf => render_pdf_pages(input.path(), config).await,
        InputKind::Image => decode_image(input.path()).await,
    }
}

/// Rasterise every page of a PDF.
async fn render_pdf_pages(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<Vec<DynamicImage>, Menu2XlsxError> {
    let path = pdf_path.to_path_buf();
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_pdf_pages_blocking(&path, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| Menu2XlsxError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of PDF page rendering.
fn render_pdf_pages_blocking(
    pdf_path: &Path,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<DynamicImage>, Menu2XlsxError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Menu2XlsxError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Menu2XlsxError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Menu2XlsxError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| Menu2XlsxError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Menu2XlsxError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(image);
    }

    Ok(results)
}

/// Decode a single raster image into a one-element page sequence.
async fn decode_image(path: &Path) -> Result<Vec<DynamicImage>, Menu2XlsxError> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let img = image::open(&path).map_err(|e| Menu2XlsxError::ImageDecodeFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!(
            "Decoded image {} → {}x{} px",
            path.display(),
            img.width(),
            img.height()
        );
        Ok(vec![img])
    })
    .await
    .map_err(|e| Menu2XlsxError::Internal(format!("Decode task panicked: {}", e)))?
}

/// Page count of a PDF without rendering anything.
pub async fn page_count(pdf_path: &Path, password: Option<&str>) -> Result<usize, Menu2XlsxError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        let pdfium = Pdfium::default();
        let document = pdfium.load_pdf_from_file(&path, pwd.as_deref()).map_err(|e| {
            Menu2XlsxError::CorruptPdf {
                path: path.clone(),
                detail: format!("{:?}", e),
            }
        })?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| Menu2XlsxError::Internal(format!("Page-count task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::resolve_input;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    #[tokio::test]
    async fn single_image_input_yields_one_page() {
        // Write a real PNG so both the sniffer and the decoder accept it.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 10, 10])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.png");
        std::fs::write(&path, &bytes).unwrap();

        let resolved = resolve_input(path.to_str().unwrap(), 10).await.unwrap();
        let config = ConversionConfig::default();
        let pages = render_input(&resolved, &config).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].width(), 8);
    }

    #[tokio::test]
    async fn corrupt_image_surfaces_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        // Valid PNG magic, garbage body.
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0, 1, 2, 3]).unwrap();

        let resolved = resolve_input(path.to_str().unwrap(), 10).await.unwrap();
        let config = ConversionConfig::default();
        let err = render_input(&resolved, &config).await.unwrap_err();
        assert!(matches!(err, Menu2XlsxError::ImageDecodeFailed { .. }));
    }
}
