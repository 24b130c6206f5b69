//! Per-upload directory scoping.
//!
//! Every preview gets a fresh UUID and two private directories:
//!
//! ```text
//! {upload_dir}/{upload_id}/   source file + conversion output
//! {image_dir}/{upload_id}/    annotated pages, served statically
//! ```
//!
//! Two uploads of `report.pdf` at the same moment therefore never write to
//! the same path, and a failed preview can remove everything it wrote
//! without touching anyone else's files.

use crate::error::PreviewError;
use crate::pipeline::encode::OutputFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());

/// Reduce an uploaded file stem to `[A-Za-z0-9_-]`, so it is safe in a path
/// and in a URL. Empty results fall back to `document`.
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(stem, "_");
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.chars().take(64).collect()
    }
}

/// The two directories owned by one upload.
#[derive(Debug, Clone)]
pub struct UploadWorkspace {
    id: Uuid,
    upload_dir: PathBuf,
    image_dir: PathBuf,
}

impl UploadWorkspace {
    /// Allocate a new upload id and create its directories.
    pub async fn create(upload_root: &Path, image_root: &Path) -> Result<Self, PreviewError> {
        Self::create_with_id(Uuid::new_v4(), upload_root, image_root).await
    }

    pub async fn create_with_id(id: Uuid, upload_root: &Path, image_root: &Path) -> Result<Self, PreviewError> {
        let ws = Self {
            id,
            upload_dir: upload_root.join(id.to_string()),
            image_dir: image_root.join(id.to_string()),
        };
        for dir in [&ws.upload_dir, &ws.image_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PreviewError::io(dir, e))?;
        }
        debug!("Created workspace {}", id);
        Ok(ws)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Copy the source file into the upload directory under a sanitised name,
    /// keeping its extension.
    pub async fn store_source(&self, source: &Path) -> Result<PathBuf, PreviewError> {
        let stem = source
            .file_stem()
            .map(|s| sanitize_stem(&s.to_string_lossy()))
            .unwrap_or_else(|| "document".to_string());
        let file_name = match source.extension() {
            Some(ext) => format!("{}.{}", stem, ext.to_string_lossy().to_ascii_lowercase()),
            None => stem,
        };
        let dest = self.upload_dir.join(file_name);
        tokio::fs::copy(source, &dest)
            .await
            .map_err(|e| PreviewError::io(&dest, e))?;
        Ok(dest)
    }

    /// File name for an annotated page, e.g. `report_page_3.png`.
    pub fn page_file_name(stem: &str, page_num: usize, format: OutputFormat) -> String {
        format!("{}_page_{}.{}", sanitize_stem(stem), page_num, format.extension())
    }

    /// Path of an annotated page inside the image directory.
    pub fn page_path(&self, file_name: &str) -> PathBuf {
        self.image_dir.join(file_name)
    }

    /// Static URL of an annotated page.
    pub fn page_url(&self, static_prefix: &str, file_name: &str) -> String {
        format!("{}/{}/{}", static_prefix.trim_end_matches('/'), self.id, file_name)
    }

    /// Remove the image directory. Used when a preview fails part-way.
    pub async fn discard_images(&self) {
        remove_dir_logged(&self.image_dir).await;
    }

    /// Remove the upload directory (source and conversion output).
    pub async fn discard_uploads(&self) {
        remove_dir_logged(&self.upload_dir).await;
    }
}

async fn remove_dir_logged(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!("Removed {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_stem("report-2024_final"), "report-2024_final");
        assert_eq!(sanitize_stem("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_stem("Q3 results (draft)"), "Q3_results_draft");
        assert_eq!(sanitize_stem("..."), "document");
        assert_eq!(sanitize_stem(&"a".repeat(200)).len(), 64);
    }

    #[test]
    fn page_names_follow_stem_page_n_pattern() {
        assert_eq!(
            UploadWorkspace::page_file_name("deck", 3, OutputFormat::Png),
            "deck_page_3.png"
        );
        assert_eq!(
            UploadWorkspace::page_file_name("my scan", 1, OutputFormat::Jpeg),
            "my_scan_page_1.jpg"
        );
    }

    #[tokio::test]
    async fn workspaces_never_share_directories() {
        let root = tempfile::tempdir().unwrap();
        let uploads = root.path().join("uploads");
        let images = root.path().join("images");

        let a = UploadWorkspace::create(&uploads, &images).await.unwrap();
        let b = UploadWorkspace::create(&uploads, &images).await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.image_dir(), b.image_dir());
        assert!(a.upload_dir().is_dir());
        assert!(b.image_dir().is_dir());
        assert!(a.image_dir().starts_with(&images));
    }

    #[tokio::test]
    async fn page_url_includes_upload_id() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::nil();
        let ws = UploadWorkspace::create_with_id(id, &root.path().join("u"), &root.path().join("i"))
            .await
            .unwrap();
        assert_eq!(
            ws.page_url("/static/", "doc_page_1.png"),
            "/static/00000000-0000-0000-0000-000000000000/doc_page_1.png"
        );
    }

    #[tokio::test]
    async fn store_source_sanitises_name_and_discard_removes_it() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("My Report.PDF");
        std::fs::write(&src, b"%PDF-1.4").unwrap();

        let ws = UploadWorkspace::create(&root.path().join("u"), &root.path().join("i"))
            .await
            .unwrap();
        let stored = ws.store_source(&src).await.unwrap();
        assert_eq!(stored.file_name().unwrap(), "My_Report.pdf");
        assert!(stored.is_file());

        ws.discard_uploads().await;
        ws.discard_images().await;
        assert!(!ws.upload_dir().exists());
        assert!(!ws.image_dir().exists());
        // Second discard is a quiet no-op.
        ws.discard_images().await;
    }
}
