//! PDF rasterisation: render every page to a [`RasterImage`] via pdfium.
//!
//! pdfium is CPU-bound and not async-safe, so all calls run inside
//! `tokio::task::spawn_blocking`. Pages are rendered at `dpi / 72` times
//! their size in points, then capped so neither edge exceeds
//! `max_rendered_pixels`.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::output::DocumentInfo;
use crate::pipeline::input::SourceKind;
use crate::raster::RasterImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to a pdfium library.
///
/// `lib_path` may name the library file itself or the directory holding it.
/// Without one, the working directory is tried first, then the system loader.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, PreviewError> {
    let bindings = match lib_path {
        Some(p) if p.is_file() => Pdfium::bind_to_library(p),
        Some(p) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PreviewError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Rasterise every page of a PDF, in page order.
///
/// A PDF with no pages yields an empty vector.
pub async fn render_pages(pdf_path: &Path, config: &PreviewConfig) -> Result<Vec<RasterImage>, PreviewError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();
    let lib_path = config.pdfium_lib_path.clone();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, dpi, max_pixels, password.as_deref(), lib_path.as_deref())
    })
    .await
    .map_err(|e| PreviewError::Internal(format!("Render task panicked: {}", e)))?
}

fn load_error(pdf_path: &Path, password: Option<&str>, e: PdfiumError) -> PreviewError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            PreviewError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            PreviewError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        PreviewError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<Vec<RasterImage>, PreviewError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let mut results = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| PreviewError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let (width, height) = page_pixel_size(page.width().value, page.height().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new().set_target_size(width, height);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PreviewError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let raster = RasterImage::new(bitmap.as_image()).map_err(|e| PreviewError::RasterisationFailed {
            page: idx + 1,
            detail: e.to_string(),
        })?;
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            raster.width(),
            raster.height()
        );

        results.push(raster);
    }

    Ok(results)
}

/// Pixel size of a page rendered at `dpi`, scaled down so neither side
/// exceeds `max_pixels`. Aspect ratio is kept and neither side drops below 1.
pub fn page_pixel_size(width_pts: f32, height_pts: f32, dpi: u32, max_pixels: u32) -> (i32, i32) {
    let scale = f64::from(dpi) / 72.0;
    let mut width = f64::from(width_pts) * scale;
    let mut height = f64::from(height_pts) * scale;

    let longest = width.max(height);
    let limit = f64::from(max_pixels.max(1));
    if longest > limit {
        let shrink = limit / longest;
        width *= shrink;
        height *= shrink;
    }
    (width.round().max(1.0) as i32, height.round().max(1.0) as i32)
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentInfo, PreviewError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());
    let lib: Option<PathBuf> = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref(), lib.as_deref()))
        .await
        .map_err(|e| PreviewError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentInfo, PreviewError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password, e))?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentInfo {
        kind: SourceKind::Pdf,
        page_count: pages.len() as usize,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        pdf_version: Some(format!("{:?}", document.version())),
    })
}
