//! Configuration types for document previews.
//!
//! All preview behaviour is controlled through [`PreviewConfig`], built via
//! its [`PreviewConfigBuilder`]. The finishing options themselves are not
//! part of the config: they change per upload, while the config describes the
//! deployment (where files go, how pages are rendered, how the gallery links
//! to them).

use crate::error::PreviewError;
use crate::pipeline::encode::OutputFormat;
use crate::pipeline::office::DocumentConverter;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a preview run.
///
/// # Example
/// ```rust
/// use print_preview::PreviewConfig;
///
/// let config = PreviewConfig::builder()
///     .dpi(150)
///     .upload_dir("/srv/preview/uploads")
///     .image_dir("/srv/preview/images")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PreviewConfig {
    /// Rendering DPI used when rasterising PDF pages. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Longest edge, in pixels, of a rendered PDF page. Default: 5000.
    ///
    /// A safety cap independent of DPI: an A0 poster at 150 DPI would be
    /// about 5000 × 7000 px, and larger pages are scaled down to fit.
    pub max_rendered_pixels: u32,

    /// Number of pages annotated and encoded at once. Default: 4.
    pub concurrency: usize,

    /// Root for raw uploads and conversion scratch files. Default: `uploaded_files`.
    ///
    /// Each upload gets its own `{upload_dir}/{upload_id}/` subdirectory.
    pub upload_dir: PathBuf,

    /// Root for annotated images served statically. Default: `pdf_images`.
    ///
    /// Each upload gets its own `{image_dir}/{upload_id}/` subdirectory.
    pub image_dir: PathBuf,

    /// URL prefix under which `image_dir` is served. Default: `/static`.
    pub static_url_prefix: String,

    /// Embed pages as base64 data URIs instead of linking to static URLs. Default: false.
    pub inline_images: bool,

    /// Encoding of stored preview images. Default: PNG.
    pub output_format: OutputFormat,

    /// JPEG quality (1–100) when `output_format` is JPEG. Default: 85.
    pub jpeg_quality: u8,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Office-to-PDF converter. If None, `soffice`/`libreoffice` is looked up
    /// on `PATH` when an office document arrives.
    pub converter: Option<Arc<dyn DocumentConverter>>,

    /// Path to the pdfium library file or the directory holding it.
    /// If None, the working directory and then the system loader are tried.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Delete `{upload_dir}/{upload_id}/` once the preview is written. Default: false.
    pub discard_uploads: bool,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 5000,
            concurrency: 4,
            upload_dir: PathBuf::from("uploaded_files"),
            image_dir: PathBuf::from("pdf_images"),
            static_url_prefix: "/static".to_string(),
            inline_images: false,
            output_format: OutputFormat::default(),
            jpeg_quality: 85,
            password: None,
            converter: None,
            pdfium_lib_path: None,
            download_timeout_secs: 120,
            discard_uploads: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PreviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("upload_dir", &self.upload_dir)
            .field("image_dir", &self.image_dir)
            .field("static_url_prefix", &self.static_url_prefix)
            .field("inline_images", &self.inline_images)
            .field("output_format", &self.output_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("converter", &self.converter.as_ref().map(|c| c.name()))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("discard_uploads", &self.discard_uploads)
            .finish()
    }
}

impl PreviewConfig {
    /// Create a new builder for `PreviewConfig`.
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PreviewConfig`].
#[derive(Debug)]
pub struct PreviewConfigBuilder {
    config: PreviewConfig,
}

impl PreviewConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn static_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.static_url_prefix = prefix.into();
        self
    }

    pub fn inline_images(mut self, v: bool) -> Self {
        self.config.inline_images = v;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn discard_uploads(mut self, v: bool) -> Self {
        self.config.discard_uploads = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PreviewConfig, PreviewError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(PreviewError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(PreviewError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.upload_dir.as_os_str().is_empty() || c.image_dir.as_os_str().is_empty() {
            return Err(PreviewError::InvalidConfig(
                "upload_dir and image_dir must be non-empty".into(),
            ));
        }
        if c.upload_dir == c.image_dir {
            return Err(PreviewError::InvalidConfig(format!(
                "upload_dir and image_dir must differ (both are '{}')",
                c.upload_dir.display()
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PreviewConfig::default();
        assert_eq!(c.dpi, 150);
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.upload_dir, PathBuf::from("uploaded_files"));
        assert_eq!(c.image_dir, PathBuf::from("pdf_images"));
        assert_eq!(c.static_url_prefix, "/static");
        assert_eq!(c.output_format, OutputFormat::Png);
        assert!(!c.inline_images);
    }

    #[test]
    fn setters_clamp_out_of_range_values() {
        let c = PreviewConfig::builder()
            .dpi(9000)
            .concurrency(0)
            .jpeg_quality(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.jpeg_quality, 1);
    }

    #[test]
    fn rejects_shared_upload_and_image_dir() {
        let err = PreviewConfig::builder()
            .upload_dir("same")
            .image_dir("same")
            .build()
            .unwrap_err();
        assert!(matches!(err, PreviewError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_password() {
        let c = PreviewConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("redacted"));
    }
}
