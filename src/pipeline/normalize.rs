//! Format normalisation: any supported upload becomes an ordered list of
//! page rasters.
//!
//! ```text
//! Image  ──────────────────────────────▶ decode ──▶ [page]
//! Pdf    ──▶ %PDF check ──▶ pdfium ──────────────▶ [page, page, …]
//! Office ──▶ converter ──▶ PDF ──▶ pdfium ───────▶ [page, page, …]
//! ```

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::pipeline::input::{verify_pdf_magic, SourceKind};
use crate::pipeline::office::{convert_to_pdf, DocumentConverter, SofficeConverter};
use crate::pipeline::render::render_pages;
use crate::raster::RasterImage;
use crate::workspace::UploadWorkspace;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Turn `source` into page rasters according to its kind.
///
/// Office documents are converted into the workspace's upload directory
/// first. A PDF with no pages yields an empty list.
pub async fn normalize(
    source: &Path,
    kind: SourceKind,
    config: &PreviewConfig,
    workspace: &UploadWorkspace,
) -> Result<Vec<RasterImage>, PreviewError> {
    match kind {
        SourceKind::Image => Ok(vec![decode_image(source).await?]),
        SourceKind::Pdf => render_pdf(source, config).await,
        SourceKind::Office => {
            let converter = resolve_converter(config);
            let pdf = convert_office(source, converter, workspace.upload_dir()).await?;
            render_pdf(&pdf, config).await
        }
    }
}

/// The configured converter, or LibreOffice if a runnable copy is on `PATH`.
pub fn resolve_converter(config: &PreviewConfig) -> Option<Arc<dyn DocumentConverter>> {
    resolve_converter_in(config, std::env::var_os("PATH").as_deref())
}

/// [`resolve_converter`] against an explicit `PATH`-style list.
pub fn resolve_converter_in(
    config: &PreviewConfig,
    path_var: Option<&OsStr>,
) -> Option<Arc<dyn DocumentConverter>> {
    if let Some(ref c) = config.converter {
        return Some(Arc::clone(c));
    }
    let detected = SofficeConverter::detect_in(path_var?)?;
    debug!("Using office converter at {}", detected.program().display());
    Some(Arc::new(detected))
}

/// Decode a JPEG or PNG into a single page.
pub async fn decode_image(path: &Path) -> Result<RasterImage, PreviewError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let decoded = image::open(&path).map_err(|e| PreviewError::ImageDecode {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!(
            "Decoded {} ({}x{})",
            path.display(),
            decoded.width(),
            decoded.height()
        );
        RasterImage::new(decoded)
    })
    .await
    .map_err(|e| PreviewError::Internal(format!("Decode task panicked: {}", e)))?
}

async fn render_pdf(path: &Path, config: &PreviewConfig) -> Result<Vec<RasterImage>, PreviewError> {
    verify_pdf_magic(path)?;
    let pages = render_pages(path, config).await?;
    info!("Rasterised {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

/// Convert an office document to PDF inside `dest_dir`.
///
/// Without a converter the document kind is unsupported in this deployment.
pub async fn convert_office(
    source: &Path,
    converter: Option<Arc<dyn DocumentConverter>>,
    dest_dir: &Path,
) -> Result<PathBuf, PreviewError> {
    let Some(converter) = converter else {
        return Err(PreviewError::UnsupportedFormat {
            extension: source
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default(),
            detail: "office documents need a converter; none is configured and soffice is not on PATH"
                .into(),
        });
    };

    info!("Converting {} with {}", source.display(), converter.name());
    let source = source.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();
    tokio::task::spawn_blocking(move || convert_to_pdf(converter.as_ref(), &source, &dest_dir))
        .await
        .map_err(|e| PreviewError::Internal(format!("Conversion task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::office::TargetFormat;
    use crate::raster::PixelDepth;
    use image::{Rgb, RgbImage};

    struct FailingConverter;

    impl DocumentConverter for FailingConverter {
        fn name(&self) -> &str {
            "failing"
        }

        fn convert(&self, input: &Path, _target: TargetFormat, out_dir: &Path) -> Result<PathBuf, PreviewError> {
            std::fs::write(out_dir.join("half.pdf"), b"%PDF").unwrap();
            Err(PreviewError::ConversionFailed {
                path: input.to_path_buf(),
                detail: "exit status 1".into(),
            })
        }
    }

    async fn workspace(root: &Path) -> UploadWorkspace {
        UploadWorkspace::create(&root.join("uploads"), &root.join("images"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn image_becomes_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.png");
        RgbImage::from_pixel(40, 30, Rgb([10, 200, 30])).save(&src).unwrap();
        let ws = workspace(dir.path()).await;

        let pages = normalize(&src, SourceKind::Image, &PreviewConfig::default(), &ws)
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dimensions(), (40, 30));
        assert_eq!(pages[0].depth(), PixelDepth::Rgb8);
    }

    #[tokio::test]
    async fn garbage_image_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.jpg");
        std::fs::write(&src, b"definitely not a jpeg").unwrap();

        let err = decode_image(&src).await.unwrap_err();
        assert!(matches!(err, PreviewError::ImageDecode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn pdf_without_magic_is_rejected_before_pdfium() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fake.pdf");
        std::fs::write(&src, b"PK\x03\x04 zip in disguise").unwrap();
        let ws = workspace(dir.path()).await;

        let err = normalize(&src, SourceKind::Pdf, &PreviewConfig::default(), &ws)
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn office_without_converter_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("memo.docx");
        std::fs::write(&src, b"docx").unwrap();

        let err = convert_office(&src, None, dir.path()).await.unwrap_err();
        match err {
            PreviewError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "docx"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unrunnable_soffice_on_path_leaves_office_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        std::fs::write(bin.join("soffice"), b"").unwrap();
        let path_var = std::env::join_paths([&bin]).unwrap();
        let src = dir.path().join("memo.docx");
        std::fs::write(&src, b"docx").unwrap();

        let converter = resolve_converter_in(&PreviewConfig::default(), Some(path_var.as_os_str()));
        assert!(converter.is_none());

        let err = convert_office(&src, converter, dir.path()).await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::UnsupportedFormat);
    }

    #[tokio::test]
    async fn failing_converter_leaves_upload_dir_clean() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("deck.pptx");
        std::fs::write(&src, b"pptx").unwrap();
        let ws = workspace(dir.path()).await;
        let config = PreviewConfig::builder()
            .converter(Arc::new(FailingConverter))
            .build()
            .unwrap();

        let err = normalize(&src, SourceKind::Office, &config, &ws).await.unwrap_err();
        assert!(matches!(err, PreviewError::ConversionFailed { .. }));
        assert_eq!(std::fs::read_dir(ws.upload_dir()).unwrap().count(), 0);
    }

    #[test]
    fn configured_converter_wins_over_path_lookup() {
        let config = PreviewConfig::builder()
            .converter(Arc::new(FailingConverter))
            .build()
            .unwrap();
        assert_eq!(resolve_converter(&config).unwrap().name(), "failing");
    }
}
