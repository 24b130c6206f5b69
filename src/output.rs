//! Result types returned by the preview entry points.
//!
//! Everything here is `Serialize` so the CLI's `--json` mode, or a web
//! handler, can hand the whole preview to a client in one document.

use crate::options::FinishingOptions;
use crate::pipeline::input::SourceKind;
use crate::raster::PixelDepth;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One annotated page as written to the image directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Page identifier, e.g. `page-0001`.
    pub id: String,
    /// File name inside `{image_dir}/{upload_id}/`.
    pub file_name: String,
    /// Full path of the stored image.
    pub path: PathBuf,
    /// Static URL the gallery links to.
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub depth: PixelDepth,
    /// Encoded size in bytes.
    pub bytes: usize,
}

/// What was uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Original file name as given by the caller.
    pub file_name: String,
    pub kind: SourceKind,
}

/// Timing and counts for one preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewStats {
    pub total_pages: usize,
    /// Bytes written to the image directory.
    pub total_bytes: usize,
    /// Time spent turning the upload into page rasters.
    pub normalize_duration_ms: u64,
    /// Time spent annotating, encoding and writing pages.
    pub annotate_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Complete result of a preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewOutput {
    /// Per-upload identifier; names the upload's directories.
    pub upload_id: String,
    pub source: SourceInfo,
    pub options: FinishingOptions,
    /// Pages in document order.
    pub pages: Vec<AnnotatedPage>,
    /// Self-contained HTML gallery.
    pub gallery_html: String,
    pub stats: PreviewStats,
}

/// Document facts gathered without annotating anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub kind: SourceKind,
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub pdf_version: Option<String>,
}
