//! Image encoding: `DynamicImage` → base64 JPEG wrapped in `ImageData`.
//!
//! Vision APIs (OpenAI, Anthropic, Gemini) accept images as base64 data-URIs
//! embedded in the JSON request body. Menu pages are photographs and colour
//! scans far more often than crisp text renders, so JPEG's photographic
//! compression keeps request bodies small without costing the model anything
//! it needs; any non-RGB colour mode (RGBA PNGs, grayscale scans) is forced
//! to 3-channel RGB first because the JPEG encoder rejects alpha channels.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a page image as base64 JPEG ready for the vision API.
///
/// ## Why `detail: "high"`?
/// OpenAI's tiling algorithm divides images into 512 px tiles. `detail:
/// "high"` enables the full tile budget, so small-print menu items and
/// prices stay legible to the model.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let rgb = match img {
        DynamicImage::ImageRgb8(_) => img.clone(),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };

    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/jpeg").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    #[test]
    fn encode_rgba_image_converts_to_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 128])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/jpeg");
        assert!(!data.data.is_empty());
        // Verify it's valid base64 holding a JPEG (SOI marker).
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_grayscale_image() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 4, Luma([42])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/jpeg");
    }
}
