//! Page annotation: draw print finishing onto a page raster.
//!
//! [`annotate`] is a chain of four pure stages, always in this order:
//!
//! ```text
//! reduce_color ──▶ orient ──▶ punch_marks ──▶ binding_mark
//! ```
//!
//! Mark geometry is computed against the image coming out of [`orient`], so
//! on a landscape page the holes run down the left edge of the rotated
//! canvas. Every stage returns a fresh [`RasterImage`] and leaves its input
//! untouched; there is no shared state, so pages can be annotated on as many
//! threads as the caller likes.
//!
//! Marks use fixed pixel offsets and sizes, independent of resolution. A mark
//! that would not fit entirely on the canvas is skipped rather than clipped.

use crate::options::{Binding, ColorMode, FinishingOptions, Orientation, Punch};
use crate::raster::{Pixels, RasterImage};
use image::imageops;
use image::{GrayImage, Luma, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut, Canvas};
use imageproc::point::Point;
use tracing::debug;

/// Opaque neutral gray used for every mark, in colour and grayscale alike.
pub const MARK_GRAY: u8 = 128;

/// Radius of a punch hole in pixels.
pub const PUNCH_RADIUS: i32 = 10;

/// Horizontal centre of every punch hole.
pub const PUNCH_CENTER_X: i32 = 20;

/// Staple quadrilateral in the top-left corner (a slightly tilted bar).
pub const STAPLE_VERTICES: [(i32, i32); 4] = [(35, 40), (75, 30), (77, 35), (37, 45)];

/// One annotated page, ready to be encoded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Stable identifier derived from the page number, e.g. `page-0003`.
    pub id: String,
    pub image: RasterImage,
}

impl AnnotatedImage {
    pub fn new(page_num: usize, image: RasterImage) -> Self {
        Self {
            page_num,
            id: page_id(page_num),
            image,
        }
    }
}

/// Identifier for a 1-indexed page; sorts lexically in page order up to 9999.
pub fn page_id(page_num: usize) -> String {
    format!("page-{page_num:04}")
}

/// Apply all four finishing options to `image`.
pub fn annotate(image: &RasterImage, options: &FinishingOptions) -> RasterImage {
    let img = reduce_color(image, options.color_mode);
    let img = orient(&img, options.orientation);
    let img = punch_marks(&img, options.punch);
    binding_mark(&img, options.binding)
}

/// Annotate a numbered page and wrap it with its identifier.
pub fn annotate_page(page_num: usize, image: &RasterImage, options: &FinishingOptions) -> AnnotatedImage {
    AnnotatedImage::new(page_num, annotate(image, options))
}

// ── Stage 1: colour ──────────────────────────────────────────────────────────

/// ITU-R 601-2 luma in 16.16 fixed point: the weights sum to 65536 so white
/// stays 255.
fn luma(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

/// Collapse to single-channel gray for [`ColorMode::BlackAndWhite`].
pub fn reduce_color(image: &RasterImage, mode: ColorMode) -> RasterImage {
    match (mode, image.pixels()) {
        (ColorMode::Color, _) | (ColorMode::BlackAndWhite, Pixels::Gray(_)) => image.clone(),
        (ColorMode::BlackAndWhite, Pixels::Rgb(buf)) => {
            let gray = GrayImage::from_fn(buf.width(), buf.height(), |x, y| {
                Luma([luma(buf.get_pixel(x, y).0)])
            });
            RasterImage::from_pixels(Pixels::Gray(gray))
        }
    }
}

// ── Stage 2: orientation ─────────────────────────────────────────────────────

/// Rotate 90° counter-clockwise for [`Orientation::Landscape`], expanding the
/// canvas so nothing is cropped.
pub fn orient(image: &RasterImage, orientation: Orientation) -> RasterImage {
    match orientation {
        Orientation::Portrait => image.clone(),
        Orientation::Landscape => RasterImage::from_pixels(match image.pixels() {
            Pixels::Gray(buf) => Pixels::Gray(imageops::rotate270(buf)),
            Pixels::Rgb(buf) => Pixels::Rgb(imageops::rotate270(buf)),
        }),
    }
}

// ── Stage 3: punch holes ─────────────────────────────────────────────────────

/// Hole centres for a canvas of the given size.
///
/// Returns an empty list for [`Punch::None`], and also when any hole of the
/// set would extend past the canvas edge.
pub fn punch_centers(width: u32, height: u32, punch: Punch) -> Vec<(i32, i32)> {
    let h = i64::from(height);
    let ys: Vec<i64> = match punch {
        Punch::None => return Vec::new(),
        Punch::TwoHoles => vec![h / 3, 2 * h / 3],
        Punch::ThreeHoles => vec![h / 4, h / 2, 3 * h / 4],
    };

    let r = i64::from(PUNCH_RADIUS);
    let fits_x = i64::from(PUNCH_CENTER_X) + r < i64::from(width);
    let fits_y = ys.iter().all(|&y| y - r >= 0 && y + r < h);
    if !fits_x || !fits_y {
        debug!(width, height, ?punch, "canvas too small for punch holes, skipping");
        return Vec::new();
    }

    ys.into_iter()
        .map(|y| (PUNCH_CENTER_X, y as i32))
        .collect()
}

fn fill_circles<C: Canvas>(canvas: &mut C, centers: &[(i32, i32)], color: C::Pixel) {
    for &center in centers {
        draw_filled_circle_mut(canvas, center, PUNCH_RADIUS, color);
    }
}

/// Draw filled gray punch holes along the left edge.
pub fn punch_marks(image: &RasterImage, punch: Punch) -> RasterImage {
    let centers = punch_centers(image.width(), image.height(), punch);
    if centers.is_empty() {
        return image.clone();
    }
    let pixels = match image.pixels() {
        Pixels::Gray(buf) => {
            let mut out = buf.clone();
            fill_circles(&mut out, &centers, Luma([MARK_GRAY]));
            Pixels::Gray(out)
        }
        Pixels::Rgb(buf) => {
            let mut out = buf.clone();
            fill_circles(&mut out, &centers, Rgb([MARK_GRAY; 3]));
            Pixels::Rgb(out)
        }
    };
    RasterImage::from_pixels(pixels)
}

// ── Stage 4: binding ─────────────────────────────────────────────────────────

/// Whether the staple quadrilateral fits on a canvas of this size.
pub fn staple_fits(width: u32, height: u32) -> bool {
    let max_x = STAPLE_VERTICES.iter().map(|v| v.0).max().unwrap_or(0);
    let max_y = STAPLE_VERTICES.iter().map(|v| v.1).max().unwrap_or(0);
    i64::from(max_x) < i64::from(width) && i64::from(max_y) < i64::from(height)
}

fn fill_staple<C: Canvas>(canvas: &mut C, color: C::Pixel) {
    let poly = STAPLE_VERTICES.map(|(x, y)| Point::new(x, y));
    draw_polygon_mut(canvas, &poly, color);
}

/// Draw the corner staple for [`Binding::CornerStaple`].
pub fn binding_mark(image: &RasterImage, binding: Binding) -> RasterImage {
    match binding {
        Binding::None => image.clone(),
        Binding::CornerStaple if !staple_fits(image.width(), image.height()) => {
            debug!(
                width = image.width(),
                height = image.height(),
                "canvas too small for staple mark, skipping"
            );
            image.clone()
        }
        Binding::CornerStaple => {
            let pixels = match image.pixels() {
                Pixels::Gray(buf) => {
                    let mut out = buf.clone();
                    fill_staple(&mut out, Luma([MARK_GRAY]));
                    Pixels::Gray(out)
                }
                Pixels::Rgb(buf) => {
                    let mut out = buf.clone();
                    fill_staple(&mut out, Rgb([MARK_GRAY; 3]));
                    Pixels::Rgb(out)
                }
            };
            RasterImage::from_pixels(pixels)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelDepth;
    use image::RgbImage;

    fn white(width: u32, height: u32) -> RasterImage {
        RasterImage::from_rgb(RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))).unwrap()
    }

    #[test]
    fn luma_matches_601_weights() {
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([255, 0, 0]), 76);
        assert_eq!(luma([0, 255, 0]), 150);
        assert_eq!(luma([0, 0, 255]), 29);
    }

    #[test]
    fn black_and_white_collapses_to_gray() {
        let img = white(8, 4);
        let out = reduce_color(&img, ColorMode::BlackAndWhite);
        assert_eq!(out.depth(), PixelDepth::Gray8);
        assert_eq!(out.dimensions(), (8, 4));
        assert_eq!(out.rgb_at(3, 3), [255, 255, 255]);
    }

    #[test]
    fn color_mode_is_a_no_op() {
        let img = white(8, 4);
        assert_eq!(reduce_color(&img, ColorMode::Color), img);
    }

    #[test]
    fn landscape_rotates_counter_clockwise() {
        let mut buf = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        buf.put_pixel(0, 0, Rgb([255, 0, 0]));
        let img = RasterImage::from_rgb(buf).unwrap();

        let out = orient(&img, Orientation::Landscape);
        assert_eq!(out.dimensions(), (2, 3));
        // Top-left ends up bottom-left after a quarter turn counter-clockwise.
        assert_eq!(out.rgb_at(0, 2), [255, 0, 0]);
        assert_eq!(out.rgb_at(0, 0), [0, 0, 0]);
    }

    #[test]
    fn two_hole_geometry_on_900px_page() {
        assert_eq!(punch_centers(600, 900, Punch::TwoHoles), vec![(20, 300), (20, 600)]);
    }

    #[test]
    fn three_hole_geometry() {
        assert_eq!(
            punch_centers(600, 800, Punch::ThreeHoles),
            vec![(20, 200), (20, 400), (20, 600)]
        );
        assert!(punch_centers(600, 800, Punch::None).is_empty());
    }

    #[test]
    fn holes_skipped_when_canvas_too_short() {
        // 19px: h/3 = 6, the top hole would poke out above y=0.
        assert!(punch_centers(100, 19, Punch::TwoHoles).is_empty());
        assert!(punch_centers(100, 39, Punch::ThreeHoles).is_empty());
        let img = white(100, 19);
        assert_eq!(punch_marks(&img, Punch::TwoHoles), img);
    }

    #[test]
    fn holes_skipped_when_canvas_too_narrow() {
        assert!(punch_centers(30, 900, Punch::TwoHoles).is_empty());
        assert_eq!(punch_centers(31, 900, Punch::TwoHoles).len(), 2);
    }

    #[test]
    fn punch_paints_gray_at_centres_only() {
        let img = white(200, 300);
        let out = punch_marks(&img, Punch::TwoHoles);
        assert_eq!(out.rgb_at(20, 100), [MARK_GRAY; 3]);
        assert_eq!(out.rgb_at(20, 200), [MARK_GRAY; 3]);
        assert_eq!(out.rgb_at(150, 150), [255, 255, 255]);
        assert_eq!(out.rgb_at(20, 150), [255, 255, 255]);
        // Input untouched.
        assert_eq!(img.rgb_at(20, 100), [255, 255, 255]);
    }

    #[test]
    fn staple_drawn_in_corner() {
        let img = white(200, 300);
        let out = binding_mark(&img, Binding::CornerStaple);
        assert_eq!(out.rgb_at(56, 37), [MARK_GRAY; 3]);
        assert_eq!(out.rgb_at(5, 5), [255, 255, 255]);
        assert_eq!(out.rgb_at(100, 100), [255, 255, 255]);
    }

    #[test]
    fn staple_skipped_on_tiny_canvas() {
        assert!(!staple_fits(77, 100));
        assert!(!staple_fits(100, 45));
        assert!(staple_fits(78, 46));
        let img = white(60, 60);
        assert_eq!(binding_mark(&img, Binding::CornerStaple), img);
    }

    #[test]
    fn marks_on_gray_canvas_stay_gray() {
        let img = RasterImage::from_gray(GrayImage::from_pixel(200, 300, Luma([255]))).unwrap();
        let out = annotate(
            &img,
            &FinishingOptions::new(
                ColorMode::Color,
                Orientation::Portrait,
                Punch::ThreeHoles,
                Binding::CornerStaple,
            ),
        );
        assert_eq!(out.depth(), PixelDepth::Gray8);
        assert_eq!(out.rgb_at(20, 75), [MARK_GRAY; 3]);
    }

    #[test]
    fn page_ids_are_zero_padded() {
        assert_eq!(page_id(1), "page-0001");
        assert_eq!(page_id(42), "page-0042");
        let annotated = annotate_page(3, &white(10, 10), &FinishingOptions::default());
        assert_eq!(annotated.id, "page-0003");
        assert_eq!(annotated.page_num, 3);
    }
}
