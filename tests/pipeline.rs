//! End-to-end tests for the preview pipeline.
//!
//! Image inputs need nothing beyond the crate itself. PDF tests bind to a
//! real pdfium library and are skipped unless `PDFIUM_LIB_PATH` points at
//! one:
//!
//!   PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test pipeline -- --nocapture

use image::{Rgb, RgbImage};
use print_preview::{
    preview, preview_form, preview_sync, Binding, ColorMode, DocumentConverter, ErrorCategory,
    FinishingOptions, FormFields, Orientation, PixelDepth, PreviewConfig, PreviewError,
    PreviewProgressCallback, Punch, TargetFormat,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("print_preview=debug")
        .with_test_writer()
        .try_init();
}

fn config_in(root: &Path) -> PreviewConfig {
    PreviewConfig::builder()
        .upload_dir(root.join("uploaded_files"))
        .image_dir(root.join("pdf_images"))
        .build()
        .unwrap()
}

fn write_image(path: &Path, w: u32, h: u32) {
    RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 180]))
        .save(path)
        .unwrap();
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Skip unless a pdfium library has been provided.
macro_rules! pdfium_or_skip {
    () => {{
        match std::env::var_os("PDFIUM_LIB_PATH") {
            Some(p) => PathBuf::from(p),
            None => {
                println!("SKIP: set PDFIUM_LIB_PATH to run pdfium-backed tests");
                return;
            }
        }
    }};
}

/// A single-page PDF with a 144×72 pt media box. The xref offsets are not
/// exact; pdfium rebuilds the table on load.
const ONE_PAGE_PDF: &[u8] = b"%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 144 72] >> endobj
xref
0 4
0000000000 65535 f
0000000009 00000 n
0000000058 00000 n
0000000115 00000 n
trailer << /Size 4 /Root 1 0 R >>
startxref
186
%%EOF
";

struct CountingCallback {
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl PreviewProgressCallback for CountingCallback {
    fn on_preview_start(&self, total_pages: usize) {
        self.started.store(total_pages, Ordering::SeqCst);
    }

    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _bytes: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Stands in for LibreOffice: copies a fixed PDF into the output directory.
struct FixtureConverter {
    pdf: &'static [u8],
}

impl DocumentConverter for FixtureConverter {
    fn name(&self) -> &str {
        "fixture"
    }

    fn convert(&self, input: &Path, target: TargetFormat, out_dir: &Path) -> Result<PathBuf, PreviewError> {
        let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
        let out = out_dir.join(format!("{stem}.{}", target.extension()));
        std::fs::write(&out, self.pdf).map_err(|e| PreviewError::io(&out, e))?;
        Ok(out)
    }
}

struct BrokenConverter;

impl DocumentConverter for BrokenConverter {
    fn name(&self) -> &str {
        "broken"
    }

    fn convert(&self, input: &Path, _target: TargetFormat, out_dir: &Path) -> Result<PathBuf, PreviewError> {
        std::fs::write(out_dir.join("partial.pdf"), b"%PDF-1.4 trunc").unwrap();
        Err(PreviewError::ConversionFailed {
            path: input.to_path_buf(),
            detail: "soffice exited with status 77".into(),
        })
    }
}

// ── Image uploads ────────────────────────────────────────────────────────────

#[tokio::test]
async fn jpeg_upload_end_to_end() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("Holiday Photo.jpg");
    write_image(&src, 320, 240);
    let callback = Arc::new(CountingCallback {
        started: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });
    let config = PreviewConfig::builder()
        .upload_dir(dir.path().join("uploaded_files"))
        .image_dir(dir.path().join("pdf_images"))
        .progress_callback(callback.clone())
        .build()
        .unwrap();
    let options = FinishingOptions::new(
        ColorMode::BlackAndWhite,
        Orientation::Portrait,
        Punch::ThreeHoles,
        Binding::CornerStaple,
    );

    let out = preview(src.to_string_lossy(), &options, &config).await.unwrap();

    assert_eq!(out.source.file_name, "Holiday Photo.jpg");
    assert_eq!(out.stats.total_pages, 1);
    let page = &out.pages[0];
    assert_eq!(page.id, "page-0001");
    assert_eq!(page.file_name, "Holiday_Photo_page_1.png");
    assert_eq!((page.width, page.height), (320, 240));
    assert_eq!(page.depth, PixelDepth::Gray8);

    // The stored file decodes back to the annotated page.
    let stored = image::open(&page.path).unwrap();
    assert_eq!((stored.width(), stored.height()), (320, 240));
    assert_eq!(stored.to_luma8().get_pixel(20, 60).0[0], 128);

    // The source was kept in the upload's own directory.
    let upload_dir = dir.path().join("uploaded_files").join(&out.upload_id);
    assert!(upload_dir.join("Holiday_Photo.jpg").is_file());

    assert!(out.gallery_html.contains(&page.url));
    assert_eq!(callback.started.load(Ordering::SeqCst), 1);
    assert_eq!(callback.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_uploads_of_the_same_name_stay_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let a_dir = dir.path().join("a");
    let b_dir = dir.path().join("b");
    std::fs::create_dir_all(&a_dir).unwrap();
    std::fs::create_dir_all(&b_dir).unwrap();
    write_image(&a_dir.join("scan.png"), 100, 200);
    write_image(&b_dir.join("scan.png"), 300, 100);
    let config = config_in(dir.path());

    let portrait = FinishingOptions::default();
    let landscape = FinishingOptions::new(
        ColorMode::Color,
        Orientation::Landscape,
        Punch::None,
        Binding::None,
    );
    let a_src = a_dir.join("scan.png");
    let b_src = b_dir.join("scan.png");
    let (a, b) = tokio::join!(
        preview(a_src.to_string_lossy(), &portrait, &config),
        preview(b_src.to_string_lossy(), &landscape, &config),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.upload_id, b.upload_id);
    assert_eq!(a.pages[0].file_name, b.pages[0].file_name);
    assert_ne!(a.pages[0].path, b.pages[0].path);
    assert_eq!((a.pages[0].width, a.pages[0].height), (100, 200));
    assert_eq!((b.pages[0].width, b.pages[0].height), (100, 300));
    assert_eq!(entries(&dir.path().join("pdf_images")), 2);
}

#[test]
fn sync_wrapper_runs_outside_a_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("page.png");
    write_image(&src, 64, 64);

    let out = preview_sync(src.to_string_lossy(), &FinishingOptions::default(), &config_in(dir.path())).unwrap();
    assert_eq!(out.pages.len(), 1);
}

// ── Rejections ───────────────────────────────────────────────────────────────

#[test]
fn sepia_is_rejected_before_any_file_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("page.png");
    write_image(&src, 64, 64);
    let form = FormFields::new("sepia", "portrait", "no_hole", "no_staple");

    let err = tokio_test::block_on(preview_form(src.to_string_lossy(), &form, &config_in(dir.path())))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidOption);
    assert!(!dir.path().join("uploaded_files").exists());
    assert!(!dir.path().join("pdf_images").exists());
}

#[test]
fn form_accepts_camel_case_values() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("page.png");
    write_image(&src, 200, 300);
    let form = FormFields::new("blackAndWhite", "landscape", "twoHoles", "cornerStaple");

    let out = tokio_test::block_on(preview_form(src.to_string_lossy(), &form, &config_in(dir.path()))).unwrap();
    assert_eq!(out.options.punch, Punch::TwoHoles);
    assert_eq!((out.pages[0].width, out.pages[0].height), (300, 200));
}

#[tokio::test]
async fn failing_converter_aborts_and_cleans_up() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("minutes.doc");
    std::fs::write(&src, b"\xD0\xCF\x11\xE0 legacy word").unwrap();
    let config = PreviewConfig::builder()
        .upload_dir(dir.path().join("uploaded_files"))
        .image_dir(dir.path().join("pdf_images"))
        .converter(Arc::new(BrokenConverter))
        .build()
        .unwrap();

    let err = preview(src.to_string_lossy(), &FinishingOptions::default(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, PreviewError::ConversionFailed { .. }));
    assert_eq!(err.category(), ErrorCategory::ConversionFailure);
    assert_eq!(entries(&dir.path().join("pdf_images")), 0);
    assert_eq!(entries(&dir.path().join("uploaded_files")), 0);
}

#[tokio::test]
async fn unknown_extension_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("sheet.xlsx");
    std::fs::write(&src, b"PK").unwrap();

    let err = preview(src.to_string_lossy(), &FinishingOptions::default(), &config_in(dir.path()))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedFormat);
}

// ── pdfium-backed ────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_are_rasterised_and_annotated() {
    let lib = pdfium_or_skip!();
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("card.pdf");
    std::fs::write(&src, ONE_PAGE_PDF).unwrap();
    let config = PreviewConfig::builder()
        .upload_dir(dir.path().join("uploaded_files"))
        .image_dir(dir.path().join("pdf_images"))
        .pdfium_lib_path(lib)
        .build()
        .unwrap();

    let out = preview(src.to_string_lossy(), &FinishingOptions::default(), &config)
        .await
        .unwrap();
    assert_eq!(out.pages.len(), 1);
    // 144x72 pt at the default 150 dpi
    assert_eq!((out.pages[0].width, out.pages[0].height), (300, 150));
}

#[tokio::test]
async fn office_documents_go_through_the_converter() {
    let lib = pdfium_or_skip!();
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("deck.pptx");
    std::fs::write(&src, b"PK\x03\x04").unwrap();
    let config = PreviewConfig::builder()
        .upload_dir(dir.path().join("uploaded_files"))
        .image_dir(dir.path().join("pdf_images"))
        .pdfium_lib_path(lib)
        .converter(Arc::new(FixtureConverter { pdf: ONE_PAGE_PDF }))
        .build()
        .unwrap();
    let options = FinishingOptions::new(
        ColorMode::Color,
        Orientation::Landscape,
        Punch::None,
        Binding::None,
    );

    let out = preview(src.to_string_lossy(), &options, &config).await.unwrap();
    assert_eq!(out.pages.len(), 1);
    // A wide page turned a quarter comes out tall.
    assert_eq!((out.pages[0].width, out.pages[0].height), (150, 300));
    let upload_dir = dir.path().join("uploaded_files").join(&out.upload_id);
    assert!(upload_dir.join("deck.pdf").is_file());
}
