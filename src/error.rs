//! Error types for the print-preview library.
//!
//! Everything fatal is a [`PreviewError`]. There is no page-level partial
//! success: the first failing page aborts the preview, the upload's image
//! directory is removed, and the error propagates to the caller. The
//! top-level handler (the CLI, or whatever hosts the library) turns it into a
//! user-facing error page via [`crate::gallery::render_error_page`].
//!
//! [`PreviewError::category`] folds the variants into the coarse taxonomy a
//! caller usually branches on: unsupported format, invalid option,
//! conversion failure, or I/O failure.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the print-preview library.
#[derive(Debug, Error)]
pub enum PreviewError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Request validation ────────────────────────────────────────────────
    /// The file extension is not one we can preview, or an office document
    /// arrived while no converter is available.
    #[error("Unsupported file type '{extension}': {detail}")]
    UnsupportedFormat { extension: String, detail: String },

    /// One of the four finishing options is outside its domain.
    #[error("Invalid value '{value}' for {field} (expected one of: {expected})")]
    InvalidOption {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The file claims to be a PDF but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The external office-to-PDF converter failed or produced nothing.
    #[error("Document conversion failed for '{path}': {detail}")]
    ConversionFailed { path: PathBuf, detail: String },

    /// An image input could not be decoded, or an annotated page could not
    /// be encoded.
    #[error("Image codec error for '{path}': {detail}")]
    ImageDecode { path: PathBuf, detail: String },

    /// A raster with no pixels reached the annotator.
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read or write a file in the upload workspace.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF rendering needs a PDFium shared library. You can:\n\
  • Install it system-wide (e.g. libpdfium.so on the loader path).\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error taxonomy surfaced to users and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UnsupportedFormat,
    InvalidOption,
    ConversionFailure,
    IoFailure,
    Input,
    Internal,
}

impl PreviewError {
    /// Shorthand for wrapping an [`std::io::Error`] with the path it hit.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PreviewError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PreviewError::UnsupportedFormat { .. } => ErrorCategory::UnsupportedFormat,
            PreviewError::InvalidOption { .. } => ErrorCategory::InvalidOption,
            PreviewError::NotAPdf { .. }
            | PreviewError::CorruptPdf { .. }
            | PreviewError::PasswordRequired { .. }
            | PreviewError::WrongPassword { .. }
            | PreviewError::RasterisationFailed { .. }
            | PreviewError::ConversionFailed { .. }
            | PreviewError::ImageDecode { .. }
            | PreviewError::PdfiumBindingFailed(_) => ErrorCategory::ConversionFailure,
            PreviewError::Io { .. }
            | PreviewError::FileNotFound { .. }
            | PreviewError::PermissionDenied { .. } => ErrorCategory::IoFailure,
            PreviewError::InvalidInput { .. }
            | PreviewError::DownloadFailed { .. }
            | PreviewError::DownloadTimeout { .. }
            | PreviewError::EmptyImage { .. } => ErrorCategory::Input,
            PreviewError::InvalidConfig(_) | PreviewError::Internal(_) => ErrorCategory::Internal,
        }
    }
}
