//! Progress-callback trait for per-page preview events.
//!
//! Inject an [`Arc<dyn PreviewProgressCallback>`] via
//! [`crate::config::PreviewConfigBuilder::progress_callback`] to receive
//! events as the pipeline annotates each page. Pages are processed
//! concurrently, so the trait is `Send + Sync` and events for different
//! pages may arrive out of order.
//!
//! # Example
//!
//! ```rust
//! use print_preview::{PreviewConfig, PreviewProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PreviewProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = PreviewConfig::builder()
//!     .progress_callback(counter as Arc<dyn PreviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the preview pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `on_page_*` may be called concurrently from
/// different threads.
pub trait PreviewProgressCallback: Send + Sync {
    /// Called once the document has been normalised into pages.
    fn on_preview_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is annotated.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been annotated and written.
    ///
    /// `bytes` is the encoded size of the stored image.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, bytes: usize) {
        let _ = (page_num, total_pages, bytes);
    }

    /// Called when a page fails. The preview aborts after this.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once when the preview ends, successfully or not. Both counts
    /// are zero if the upload never made it to pages.
    fn on_preview_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PreviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PreviewConfig`].
pub type ProgressCallback = Arc<dyn PreviewProgressCallback>;
