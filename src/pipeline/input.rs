//! Input resolution: normalise a user-supplied path or URL to a local file,
//! and classify it by extension.
//!
//! URLs are downloaded into a `TempDir` that lives as long as the
//! [`ResolvedInput`], so the file is cleaned up even if the preview fails.
//! PDFs are checked for the `%PDF` magic before they reach pdfium, which
//! turns "renamed a JPEG to .pdf" into a readable error instead of a pdfium
//! load failure.

use crate::error::PreviewError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Broad class of an uploaded file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// JPEG or PNG: one page, decoded directly.
    Image,
    /// PDF: one page per PDF page, rasterised by pdfium.
    Pdf,
    /// Word or PowerPoint: converted to PDF first.
    Office,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "ppt", "pptx"];

impl SourceKind {
    /// Classify a file by its (case-insensitive) extension.
    pub fn detect(path: &Path) -> Result<Self, PreviewError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| PreviewError::UnsupportedFormat {
            detail: format!(
                "expected one of {}, pdf, {}",
                IMAGE_EXTENSIONS.join(", "),
                OFFICE_EXTENSIONS.join(", ")
            ),
            extension: ext,
        })
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::Image)
        } else if ext == "pdf" {
            Some(SourceKind::Pdf)
        } else if OFFICE_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::Office)
        } else {
            None
        }
    }
}

/// The resolved input: either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, PreviewError> {
    if input.trim().is_empty() {
        return Err(PreviewError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and read permission.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, PreviewError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(PreviewError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PreviewError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PreviewError::FileNotFound { path });
        }
    }

    debug!("Resolved local input: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Verify a file starts with the `%PDF` magic bytes.
pub fn verify_pdf_magic(path: &Path) -> Result<(), PreviewError> {
    let mut f = std::fs::File::open(path).map_err(|e| PreviewError::io(path, e))?;
    let mut magic = [0u8; 4];
    match f.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => Ok(()),
        Ok(()) => Err(PreviewError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        Err(_) => Err(PreviewError::CorruptPdf {
            path: path.to_path_buf(),
            detail: "file is shorter than a PDF header".into(),
        }),
    }
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, PreviewError> {
    info!("Downloading input from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PreviewError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PreviewError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PreviewError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PreviewError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let filename = extract_filename(url, content_type.as_deref());

    let temp_dir = TempDir::new().map_err(|e| PreviewError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| PreviewError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PreviewError::io(&file_path, e))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Pick a filename from the URL path, falling back to the content type for
/// the extension.
fn extract_filename(url: &str, content_type: Option<&str>) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    let ext = match mime.as_deref() {
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        Some("application/msword") => "doc",
        Some("application/vnd.ms-powerpoint") => "ppt",
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => "docx",
        Some("application/vnd.openxmlformats-officedocument.presentationml.presentation") => "pptx",
        _ => "pdf",
    };
    format!("downloaded.{ext}")
}
