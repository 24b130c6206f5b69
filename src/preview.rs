//! Preview entry points.
//!
//! A preview runs start to finish or not at all. The first page that fails
//! aborts the run, and the upload's image directory is removed so a client
//! never sees half a document.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::gallery::{render_gallery, GalleryEntry};
use crate::options::{FinishingOptions, FormFields};
use crate::output::{AnnotatedPage, DocumentInfo, PreviewOutput, PreviewStats, SourceInfo};
use crate::pipeline::annotate::annotate_page;
use crate::pipeline::encode::{encode_image, to_data_uri, OutputFormat};
use crate::pipeline::input::{self, verify_pdf_magic, SourceKind};
use crate::pipeline::normalize::{convert_office, decode_image, normalize, resolve_converter};
use crate::pipeline::render;
use crate::raster::RasterImage;
use crate::workspace::UploadWorkspace;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Preview a local file or HTTP/HTTPS URL with the given finishing options.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - `UnsupportedFormat` for an unknown extension, or an office document
///   with no converter available
/// - `ConversionFailed`, `NotAPdf`, `CorruptPdf`, ... when the upload cannot
///   be turned into pages
/// - `Io` when the workspace cannot be written
pub async fn preview(
    input_str: impl AsRef<str>,
    options: &FinishingOptions,
    config: &PreviewConfig,
) -> Result<PreviewOutput, PreviewError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting preview of {} with {}", input_str, options);

    // ── Step 1: Resolve and classify input ───────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let kind = SourceKind::detect(resolved.path())?;
    let file_name = resolved
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    // ── Step 2: Allocate the upload workspace ────────────────────────────
    let workspace = UploadWorkspace::create(&config.upload_dir, &config.image_dir).await?;
    debug!("Upload {} classified as {:?}", workspace.id(), kind);

    let source = SourceInfo { file_name, kind };
    let result = run(resolved.path(), source, options, config, &workspace, total_start).await;

    match &result {
        Ok(_) => {
            if config.discard_uploads {
                workspace.discard_uploads().await;
            }
        }
        Err(e) => {
            warn!("Preview {} failed: {}", workspace.id(), e);
            workspace.discard_images().await;
            workspace.discard_uploads().await;
        }
    }
    result
}

/// Parse raw option strings, then preview.
///
/// Invalid option values fail before anything is read or written.
pub async fn preview_form(
    input_str: impl AsRef<str>,
    form: &FormFields,
    config: &PreviewConfig,
) -> Result<PreviewOutput, PreviewError> {
    let options = FinishingOptions::parse(form)?;
    preview(input_str, &options, config).await
}

/// Preview an upload held in memory.
///
/// `file_name` supplies the extension used to classify the bytes; any
/// directory part is ignored. The bytes are staged in a temp directory that
/// is removed when this returns.
pub async fn preview_from_bytes(
    bytes: &[u8],
    file_name: &str,
    options: &FinishingOptions,
    config: &PreviewConfig,
) -> Result<PreviewOutput, PreviewError> {
    let name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| PreviewError::InvalidInput {
            input: file_name.to_string(),
        })?;
    let staging = tempfile::tempdir().map_err(|e| PreviewError::Internal(format!("tempdir: {e}")))?;
    let path = staging.path().join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| PreviewError::io(&path, e))?;
    // `staging` is dropped (and the file deleted) when `preview` returns
    preview(path.to_string_lossy(), options, config).await
}

/// Preview and write the gallery HTML to `output_path`.
///
/// Uses atomic write (temp file + rename) so the path never holds a partial
/// gallery.
pub async fn preview_to_file(
    input_str: impl AsRef<str>,
    options: &FinishingOptions,
    output_path: impl AsRef<Path>,
    config: &PreviewConfig,
) -> Result<PreviewOutput, PreviewError> {
    let output = preview(input_str, options, config).await?;
    write_atomic(output_path.as_ref(), &output.gallery_html).await?;
    Ok(output)
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), PreviewError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PreviewError::io(parent, e))?;
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| PreviewError::io(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PreviewError::io(path, e))
}

/// Synchronous wrapper around [`preview`].
///
/// Creates a temporary tokio runtime internally.
pub fn preview_sync(
    input_str: impl AsRef<str>,
    options: &FinishingOptions,
    config: &PreviewConfig,
) -> Result<PreviewOutput, PreviewError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PreviewError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(preview(input_str, options, config))
}

/// Describe an upload without annotating or storing anything.
///
/// Images report one page. Office documents are converted in a temp
/// directory to count their pages.
pub async fn inspect(input_str: impl AsRef<str>, config: &PreviewConfig) -> Result<DocumentInfo, PreviewError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let path = resolved.path();
    let lib = config.pdfium_lib_path.as_deref();
    let password = config.password.as_deref();

    match SourceKind::detect(path)? {
        SourceKind::Image => {
            decode_image(path).await?;
            Ok(DocumentInfo {
                kind: SourceKind::Image,
                page_count: 1,
                title: None,
                author: None,
                subject: None,
                creator: None,
                producer: None,
                pdf_version: None,
            })
        }
        SourceKind::Pdf => {
            verify_pdf_magic(path)?;
            render::extract_metadata(path, password, lib).await
        }
        SourceKind::Office => {
            let scratch =
                tempfile::tempdir().map_err(|e| PreviewError::Internal(format!("tempdir: {e}")))?;
            let pdf = convert_office(path, resolve_converter(config), scratch.path()).await?;
            let mut info = render::extract_metadata(&pdf, None, lib).await?;
            info.kind = SourceKind::Office;
            Ok(info)
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    input_path: &Path,
    source: SourceInfo,
    options: &FinishingOptions,
    config: &PreviewConfig,
    workspace: &UploadWorkspace,
    total_start: Instant,
) -> Result<PreviewOutput, PreviewError> {
    // ── Step 3: Store the upload and normalise it into pages ─────────────
    let normalize_start = Instant::now();
    let rasters = match store_and_normalize(input_path, source.kind, config, workspace).await {
        Ok(r) => r,
        Err(e) => {
            notify_complete(config, 0, 0);
            return Err(e);
        }
    };
    let normalize_duration_ms = normalize_start.elapsed().as_millis() as u64;
    let total_pages = rasters.len();
    info!("Normalised into {} pages in {}ms", total_pages, normalize_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_preview_start(total_pages);
    }

    // ── Step 4: Annotate, encode and write every page ────────────────────
    let stem = Path::new(&source.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let annotate_start = Instant::now();
    let written = process_pages(rasters, options, config, workspace, &stem).await;
    let annotate_duration_ms = annotate_start.elapsed().as_millis() as u64;

    let written = match written {
        Ok(w) => w,
        Err(e) => {
            notify_complete(config, total_pages, 0);
            return Err(e);
        }
    };

    // ── Step 5: Build the gallery ────────────────────────────────────────
    let entries: Vec<GalleryEntry> = written
        .iter()
        .map(|w| {
            let entry = GalleryEntry::from(&w.page);
            match &w.data_uri {
                Some(uri) => entry.with_src(uri.clone()),
                None => entry,
            }
        })
        .collect();
    let title = format!("Print preview: {}", source.file_name);
    let gallery_html = render_gallery(&entries, &title);

    let pages: Vec<AnnotatedPage> = written.into_iter().map(|w| w.page).collect();
    let stats = PreviewStats {
        total_pages,
        total_bytes: pages.iter().map(|p| p.bytes).sum(),
        normalize_duration_ms,
        annotate_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Preview {} complete: {} pages, {} bytes, {}ms total",
        workspace.id(),
        stats.total_pages,
        stats.total_bytes,
        stats.total_duration_ms
    );

    notify_complete(config, total_pages, pages.len());

    Ok(PreviewOutput {
        upload_id: workspace.id().to_string(),
        source,
        options: *options,
        pages,
        gallery_html,
        stats,
    })
}

async fn store_and_normalize(
    input_path: &Path,
    kind: SourceKind,
    config: &PreviewConfig,
    workspace: &UploadWorkspace,
) -> Result<Vec<RasterImage>, PreviewError> {
    let stored = workspace.store_source(input_path).await?;
    normalize(&stored, kind, config, workspace).await
}

fn notify_complete(config: &PreviewConfig, total_pages: usize, success_count: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_preview_complete(total_pages, success_count);
    }
}

/// A stored page plus its inline form when the gallery embeds images.
struct WrittenPage {
    page: AnnotatedPage,
    data_uri: Option<String>,
}

/// Everything a blocking page job needs, owned.
#[derive(Clone)]
struct PageJob {
    options: FinishingOptions,
    format: OutputFormat,
    jpeg_quality: u8,
    inline: bool,
}

/// Process pages concurrently, bounded by `config.concurrency`, and return
/// them in page order.
///
/// After the first failure no new page starts; pages already running are
/// allowed to finish so nothing writes into the image directory after the
/// caller removes it.
async fn process_pages(
    rasters: Vec<RasterImage>,
    options: &FinishingOptions,
    config: &PreviewConfig,
    workspace: &UploadWorkspace,
    stem: &str,
) -> Result<Vec<WrittenPage>, PreviewError> {
    let total_pages = rasters.len();
    let aborted = Arc::new(AtomicBool::new(false));
    let job = PageJob {
        options: *options,
        format: config.output_format,
        jpeg_quality: config.jpeg_quality,
        inline: config.inline_images,
    };

    let results: Vec<Option<Result<WrittenPage, PreviewError>>> =
        stream::iter(rasters.into_iter().enumerate().map(|(idx, raster)| {
            let page_num = idx + 1;
            let file_name = UploadWorkspace::page_file_name(stem, page_num, job.format);
            let path = workspace.page_path(&file_name);
            let url = workspace.page_url(&config.static_url_prefix, &file_name);
            let job = job.clone();
            let aborted = Arc::clone(&aborted);
            let callback = config.progress_callback.clone();
            async move {
                if aborted.load(Ordering::SeqCst) {
                    return None;
                }
                if let Some(ref cb) = callback {
                    cb.on_page_start(page_num, total_pages);
                }

                let result = tokio::task::spawn_blocking(move || {
                    write_page(page_num, &raster, &job, file_name, path, url)
                })
                .await
                .map_err(|e| PreviewError::Internal(format!("Page task panicked: {}", e)))
                .and_then(|r| r);

                match &result {
                    Ok(w) => {
                        if let Some(ref cb) = callback {
                            cb.on_page_complete(page_num, total_pages, w.page.bytes);
                        }
                    }
                    Err(e) => {
                        aborted.store(true, Ordering::SeqCst);
                        if let Some(ref cb) = callback {
                            cb.on_page_error(page_num, total_pages, &e.to_string());
                        }
                    }
                }
                Some(result)
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let mut written = results.into_iter().flatten().collect::<Result<Vec<_>, _>>()?;
    written.sort_by_key(|w| w.page.page_num);
    Ok(written)
}

/// Annotate one page, encode it and write it to the image directory.
fn write_page(
    page_num: usize,
    raster: &RasterImage,
    job: &PageJob,
    file_name: String,
    path: PathBuf,
    url: String,
) -> Result<WrittenPage, PreviewError> {
    let annotated = annotate_page(page_num, raster, &job.options);
    let bytes = encode_image(&annotated.image, job.format, job.jpeg_quality)
        .map_err(|e| encode_error(&path, e))?;
    std::fs::write(&path, &bytes).map_err(|e| PreviewError::io(&path, e))?;
    debug!("Wrote page {} to {}", page_num, path.display());

    let data_uri = job.inline.then(|| to_data_uri(&bytes, job.format));
    let (width, height) = annotated.image.dimensions();
    Ok(WrittenPage {
        page: AnnotatedPage {
            page_num,
            id: annotated.id,
            file_name,
            path,
            url,
            width,
            height,
            depth: annotated.image.depth(),
            bytes: bytes.len(),
        },
        data_uri,
    })
}

fn encode_error(path: &Path, e: image::ImageError) -> PreviewError {
    PreviewError::ImageDecode {
        path: path.to_path_buf(),
        detail: format!("encoding failed: {}", e),
    }
}
