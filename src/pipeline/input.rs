//! Input resolution: normalise user-supplied paths or URLs to local files
//! and classify them as PDF or raster image.
//!
//! ## Why download to a temp file?
//!
//! pdfium only opens file-system paths, never byte buffers, so URL inputs
//! land in a `TempDir` whose cleanup rides on `ResolvedInput`'s drop — no
//! stray files even on panic. Format sniffing reads magic bytes rather than
//! trusting extensions, so a mislabelled upload fails with a meaningful
//! error instead of a decoder crash.

use crate::error::Menu2XlsxError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The sniffed format of one input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Multi-page document; every page becomes one page image.
    Pdf,
    /// Single raster image; a one-element page sequence.
    Image,
}

/// A classified input document ready for rendering.
#[derive(Debug)]
pub enum ResolvedInput {
    /// The input was already a local file.
    Local { path: PathBuf, kind: InputKind },
    /// The input was a URL; the document sits in a temp directory whose
    /// `TempDir` handle keeps it alive until processing completes.
    Downloaded {
        path: PathBuf,
        kind: InputKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    /// Path to the document regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            ResolvedInput::Local { kind, .. } => *kind,
            ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Whether an input string should be treated as a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Classify a document by its leading magic bytes.
///
/// `%PDF` → PDF; PNG signature or JPEG SOI marker → image; anything else is
/// unsupported.
pub fn sniff_kind(magic: &[u8]) -> Option<InputKind> {
    if magic.starts_with(b"%PDF") {
        Some(InputKind::Pdf)
    } else if magic.starts_with(&[0x89, b'P', b'N', b'G']) || magic.starts_with(&[0xFF, 0xD8, 0xFF])
    {
        Some(InputKind::Image)
    } else {
        None
    }
}

/// Resolve one input string to a local, format-classified document.
///
/// URLs are downloaded into a temp directory; local paths are checked for
/// existence and readability before classification.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Menu2XlsxError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, Menu2XlsxError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Menu2XlsxError::FileNotFound { path });
    }

    let mut magic = [0u8; 4];
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            if f.read_exact(&mut magic).is_err() {
                return Err(Menu2XlsxError::UnsupportedFormat { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Menu2XlsxError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Menu2XlsxError::FileNotFound { path });
        }
    }

    let kind = sniff_kind(&magic).ok_or(Menu2XlsxError::UnsupportedFormat {
        path: path.clone(),
        magic,
    })?;

    debug!("Resolved local {:?} input: {}", kind, path.display());
    Ok(ResolvedInput::Local { path, kind })
}

/// Download a URL to a temporary directory and return the classified path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Menu2XlsxError> {
    info!("Downloading input from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Menu2XlsxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Menu2XlsxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Menu2XlsxError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Menu2XlsxError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);

    let temp_dir = TempDir::new().map_err(|e| Menu2XlsxError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Menu2XlsxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let mut magic = [0u8; 4];
    if bytes.len() >= 4 {
        magic.copy_from_slice(&bytes[..4]);
    }
    let kind = sniff_kind(&magic).ok_or_else(|| Menu2XlsxError::UnsupportedFormat {
        path: file_path.clone(),
        magic,
    })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Menu2XlsxError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {:?} input to: {}", kind, file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.bin".to_string()
}
