//! # print-preview
//!
//! Show what a document will look like once it is printed and finished:
//! grayscale or colour, portrait or landscape, punched, stapled.
//!
//! An upload (JPEG, PNG, PDF, or a Word/PowerPoint file) is normalised into
//! page images, each page gets the requested finishing drawn onto it, and
//! the result is stored per upload and wrapped in an HTML carousel.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, classify by extension
//!  ├─ 2. Normalise  image decode / pdfium rasterisation / office → PDF → pdfium
//!  ├─ 3. Annotate   grayscale → rotate → punch holes → staple (pure, per page)
//!  ├─ 4. Encode     PNG or JPEG, written under {image_dir}/{upload_id}/
//!  └─ 5. Gallery    standalone HTML carousel linking (or embedding) the pages
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use print_preview::{preview, FinishingOptions, PreviewConfig};
//! use print_preview::{Binding, ColorMode, Orientation, Punch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PreviewConfig::default();
//!     let options = FinishingOptions::new(
//!         ColorMode::BlackAndWhite,
//!         Orientation::Portrait,
//!         Punch::TwoHoles,
//!         Binding::CornerStaple,
//!     );
//!     let output = preview("report.pdf", &options, &config).await?;
//!     std::fs::write("preview.html", &output.gallery_html)?;
//!     eprintln!("{} pages under upload {}", output.pages.len(), output.upload_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `print-preview` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! PDF and office inputs need a pdfium shared library, found via
//! [`PreviewConfig::pdfium_lib_path`], the working directory, or the system
//! loader. Office inputs also need a [`DocumentConverter`]; LibreOffice's
//! `soffice` is picked up from `PATH` when none is configured.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod gallery;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod raster;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PreviewConfig, PreviewConfigBuilder};
pub use error::{ErrorCategory, PreviewError};
pub use gallery::{render_error_page, render_gallery, GalleryEntry};
pub use options::{Binding, ColorMode, FinishingOptions, FormFields, Orientation, Punch};
pub use output::{AnnotatedPage, DocumentInfo, PreviewOutput, PreviewStats, SourceInfo};
pub use pipeline::annotate::{annotate, AnnotatedImage};
pub use pipeline::encode::OutputFormat;
pub use pipeline::input::SourceKind;
pub use pipeline::office::{DocumentConverter, SofficeConverter, TargetFormat};
pub use preview::{inspect, preview, preview_form, preview_from_bytes, preview_sync, preview_to_file};
pub use progress::{NoopProgressCallback, PreviewProgressCallback, ProgressCallback};
pub use raster::{PixelDepth, RasterImage};
pub use workspace::UploadWorkspace;
