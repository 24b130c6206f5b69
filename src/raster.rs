//! The page raster every pipeline stage passes along.
//!
//! [`RasterImage`] only ever holds 8-bit grayscale or 24-bit RGB pixels.
//! Whatever the decoder or pdfium hands back (RGBA bitmaps, 16-bit PNGs,
//! gray+alpha) is folded into one of those two layouts on construction, so
//! the annotator only has two cases to handle. A raster with zero width or
//! height cannot be constructed.

use crate::error::PreviewError;
use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Pixel layout of a [`RasterImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelDepth {
    /// One 8-bit luma channel.
    Gray8,
    /// Three 8-bit colour channels.
    Rgb8,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pixels {
    Gray(GrayImage),
    Rgb(RgbImage),
}

/// An immutable page image: width, height and either gray or RGB pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: Pixels,
}

impl RasterImage {
    /// Normalise a decoded image into a raster.
    ///
    /// Alpha is discarded. Luma layouts become [`PixelDepth::Gray8`], all
    /// others become [`PixelDepth::Rgb8`].
    pub fn new(image: DynamicImage) -> Result<Self, PreviewError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PreviewError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        let pixels = match image {
            DynamicImage::ImageLuma8(buf) => Pixels::Gray(buf),
            DynamicImage::ImageRgb8(buf) => Pixels::Rgb(buf),
            img @ (DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)) => Pixels::Gray(img.to_luma8()),
            other => Pixels::Rgb(other.to_rgb8()),
        };
        Ok(Self { pixels })
    }

    pub fn from_rgb(buf: RgbImage) -> Result<Self, PreviewError> {
        Self::new(DynamicImage::ImageRgb8(buf))
    }

    pub fn from_gray(buf: GrayImage) -> Result<Self, PreviewError> {
        Self::new(DynamicImage::ImageLuma8(buf))
    }

    /// Stages produce buffers whose dimensions derive from a non-empty input,
    /// so they bypass the emptiness check.
    pub(crate) fn from_pixels(pixels: Pixels) -> Self {
        Self { pixels }
    }

    pub(crate) fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::Gray(buf) => buf.width(),
            Pixels::Rgb(buf) => buf.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::Gray(buf) => buf.height(),
            Pixels::Rgb(buf) => buf.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn depth(&self) -> PixelDepth {
        match &self.pixels {
            Pixels::Gray(_) => PixelDepth::Gray8,
            Pixels::Rgb(_) => PixelDepth::Rgb8,
        }
    }

    /// Raw interleaved samples (1 or 3 bytes per pixel, row-major).
    pub fn as_bytes(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Gray(buf) => buf.as_raw(),
            Pixels::Rgb(buf) => buf.as_raw(),
        }
    }

    /// The pixel at `(x, y)` as RGB; gray pixels are replicated across
    /// channels.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        match &self.pixels {
            Pixels::Gray(buf) => {
                let l = buf.get_pixel(x, y).0[0];
                [l, l, l]
            }
            Pixels::Rgb(buf) => buf.get_pixel(x, y).0,
        }
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match &self.pixels {
            Pixels::Gray(buf) => DynamicImage::ImageLuma8(buf.clone()),
            Pixels::Rgb(buf) => DynamicImage::ImageRgb8(buf.clone()),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self.pixels {
            Pixels::Gray(buf) => DynamicImage::ImageLuma8(buf),
            Pixels::Rgb(buf) => DynamicImage::ImageRgb8(buf),
        }
    }
}
