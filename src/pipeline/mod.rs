//! Pipeline stages for document print previews.
//!
//! Each submodule implements one transformation step and is testable on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──────────────────▶ annotate ──▶ encode
//! (path/URL) │                            (pure)       (PNG/JPEG)
//!            ├─ image: decode
//!            ├─ pdf:   render (pdfium)
//!            └─ office: office ──▶ render
//! ```
//!
//! 1. [`input`]    : resolve the path or URL to a local file and classify it
//! 2. [`office`]   : office-to-PDF conversion behind [`office::DocumentConverter`]
//! 3. [`render`]   : rasterise PDF pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 4. [`normalize`]: dispatch on the source kind, producing page rasters
//! 5. [`annotate`] : grayscale, rotation, punch holes and staple marks;
//!    a pure function of (raster, options)
//! 6. [`encode`]   : PNG/JPEG bytes and data URIs for the gallery

pub mod annotate;
pub mod encode;
pub mod input;
pub mod normalize;
pub mod office;
pub mod render;
