//! Image compositing for branded output.
//!
//! This module turns one source photo plus a brand logo into a branded
//! full-resolution JPEG and a small preview thumbnail. Compositing is a pure
//! function over bitmap data: no network, no shared state, and every
//! intermediate pixel buffer is dropped before the function returns so that
//! large galleries never accumulate decoded surfaces.
//!
//! # Passes
//!
//! When a logo is supplied it is drawn twice, in order:
//!
//! 1. **Watermark pass** - logo scaled to 80% of the output width, centered
//!    on both axes, blended at 40% opacity.
//! 2. **Corner pass** - logo scaled to 25% of the output width, full
//!    opacity, anchored at the suggested corner and offset by the padding
//!    value rescaled from the 1000-unit reference frame.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba, RgbaImage};
use std::io::Cursor;

use crate::advisor::{Corner, PlacementSuggestion};
use crate::error::{BrandError, Result};

/// Watermark pass: fraction of the output width covered by the logo.
pub const WATERMARK_SCALE: f32 = 0.80;

/// Watermark pass: blend opacity.
pub const WATERMARK_OPACITY: f32 = 0.40;

/// Corner pass: fraction of the output width covered by the logo.
pub const CORNER_SCALE: f32 = 0.25;

/// Padding values are authored against a 1000-unit-wide virtual canvas and
/// rescaled linearly to the actual output width.
pub const PADDING_REFERENCE_WIDTH: f32 = 1000.0;

/// Side length of the square preview thumbnail.
pub const THUMBNAIL_SIDE: u32 = 150;

/// JPEG quality for the full-resolution output.
const FULL_QUALITY: u8 = 100;

/// JPEG quality for the preview thumbnail.
const THUMBNAIL_QUALITY: u8 = 70;

/// Run-level compositing options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeOptions {
    /// Force a square output canvas of side `max(width, height)`, with the
    /// source scale-fit and centered on a white background.
    pub force_square: bool,
}

/// Encoded output of one compositing call.
#[derive(Debug, Clone)]
pub struct BrandedImage {
    /// Full-resolution branded JPEG at maximum quality.
    pub full_res: Vec<u8>,
    /// Reduced-quality square thumbnail for UI preview only.
    pub thumbnail: Vec<u8>,
    /// Output canvas width in pixels.
    pub width: u32,
    /// Output canvas height in pixels.
    pub height: u32,
}

/// Composite a branded image from raw source bytes.
///
/// Decodes the source, applies the watermark and corner passes when a logo
/// is present, and encodes both the full-resolution result and a thumbnail.
/// The decoded logo is shared read-only across calls; callers decode it once
/// per run.
pub fn compose(
    source: &[u8],
    logo: Option<&DynamicImage>,
    placement: &PlacementSuggestion,
    options: &ComposeOptions,
) -> Result<BrandedImage> {
    let source = image::load_from_memory(source)
        .map_err(|e| BrandError::Decode(format!("Failed to decode source image: {e}")))?;
    let (src_w, src_h) = source.dimensions();

    let (out_w, out_h) = if options.force_square {
        let side = src_w.max(src_h);
        (side, side)
    } else {
        (src_w, src_h)
    };
    if out_w == 0 || out_h == 0 {
        return Err(BrandError::Compositing(
            "Output surface has zero dimensions".into(),
        ));
    }

    // White background; visible in the letterbox bands of square output.
    let mut canvas: RgbaImage = ImageBuffer::from_pixel(out_w, out_h, Rgba([255, 255, 255, 255]));

    let (fit_w, fit_h) = fit_within(src_w, src_h, out_w, out_h);
    let source = source.into_rgba8();
    let fitted = if (fit_w, fit_h) == (src_w, src_h) {
        source
    } else {
        imageops::resize(&source, fit_w, fit_h, FilterType::CatmullRom)
    };
    imageops::overlay(
        &mut canvas,
        &fitted,
        i64::from((out_w - fit_w) / 2),
        i64::from((out_h - fit_h) / 2),
    );
    drop(fitted);

    if let Some(logo) = logo {
        let logo = logo.to_rgba8();

        // Watermark pass.
        let (wm_w, wm_h) = scale_to_width(logo.width(), logo.height(), out_w, WATERMARK_SCALE);
        let mut watermark = imageops::resize(&logo, wm_w, wm_h, FilterType::CatmullRom);
        scale_alpha(&mut watermark, WATERMARK_OPACITY);
        imageops::overlay(
            &mut canvas,
            &watermark,
            (i64::from(out_w) - i64::from(wm_w)) / 2,
            (i64::from(out_h) - i64::from(wm_h)) / 2,
        );
        drop(watermark);

        // Corner pass.
        let (cn_w, cn_h) = scale_to_width(logo.width(), logo.height(), out_w, CORNER_SCALE);
        let corner_logo = imageops::resize(&logo, cn_w, cn_h, FilterType::CatmullRom);
        let padding = scaled_padding(placement.padding, out_w);
        let (x, y) = corner_offset(placement.corner, out_w, out_h, cn_w, cn_h, padding);
        imageops::overlay(&mut canvas, &corner_logo, x, y);
    }

    // JPEG output is opaque; flatten once and reuse for both encodes.
    let flat = DynamicImage::ImageRgba8(canvas).into_rgb8();
    let full_res = encode_jpeg(&flat, FULL_QUALITY)?;
    let thumb = DynamicImage::ImageRgb8(flat).resize_to_fill(
        THUMBNAIL_SIDE,
        THUMBNAIL_SIDE,
        FilterType::CatmullRom,
    );
    let thumbnail = encode_jpeg(&thumb.into_rgb8(), THUMBNAIL_QUALITY)?;

    Ok(BrandedImage {
        full_res,
        thumbnail,
        width: out_w,
        height: out_h,
    })
}

/// Largest dimensions that fit within the bounds while preserving aspect
/// ratio. Never returns a zero dimension for non-zero input.
fn fit_within(w: u32, h: u32, bound_w: u32, bound_h: u32) -> (u32, u32) {
    if w == 0 || h == 0 {
        return (w, h);
    }
    let scale = (bound_w as f32 / w as f32).min(bound_h as f32 / h as f32);
    let fw = ((w as f32 * scale).round() as u32).clamp(1, bound_w);
    let fh = ((h as f32 * scale).round() as u32).clamp(1, bound_h);
    (fw, fh)
}

/// Scale logo dimensions so its width covers `fraction` of the output width,
/// preserving the logo's own aspect ratio.
fn scale_to_width(logo_w: u32, logo_h: u32, out_w: u32, fraction: f32) -> (u32, u32) {
    let target_w = ((out_w as f32 * fraction).round() as u32).max(1);
    if logo_w == 0 {
        return (target_w, 1);
    }
    let target_h = ((target_w as f32 * logo_h as f32 / logo_w as f32).round() as u32).max(1);
    (target_w, target_h)
}

/// Rescale a reference-frame padding value to output pixels.
fn scaled_padding(padding: u32, out_w: u32) -> i64 {
    (padding as f32 * out_w as f32 / PADDING_REFERENCE_WIDTH).round() as i64
}

/// Top-left coordinates of the corner-pass logo.
///
/// `center` ignores padding; the four corners inset by `padding` pixels.
/// Coordinates may be negative for oversized logos; the overlay clips.
fn corner_offset(
    corner: Corner,
    out_w: u32,
    out_h: u32,
    logo_w: u32,
    logo_h: u32,
    padding: i64,
) -> (i64, i64) {
    let (w, h) = (i64::from(out_w), i64::from(out_h));
    let (lw, lh) = (i64::from(logo_w), i64::from(logo_h));
    match corner {
        Corner::TopLeft => (padding, padding),
        Corner::TopRight => (w - lw - padding, padding),
        Corner::BottomLeft => (padding, h - lh - padding),
        Corner::BottomRight => (w - lw - padding, h - lh - padding),
        Corner::Center => ((w - lw) / 2, (h - lh) / 2),
    }
}

/// Multiply the alpha channel of every pixel by `opacity`.
fn scale_alpha(img: &mut RgbaImage, opacity: f32) {
    for pixel in img.pixels_mut() {
        pixel.0[3] = (pixel.0[3] as f32 * opacity).round() as u8;
    }
}

fn encode_jpeg(img: &image::RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| BrandError::Compositing(format!("JPEG encoding failed: {e}")))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb(color));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .expect("PNG encoding failed");
        buffer.into_inner()
    }

    fn solid_logo(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(color)))
    }

    fn placement(corner: Corner, padding: u32) -> PlacementSuggestion {
        PlacementSuggestion {
            corner,
            padding,
            bounding_box: None,
        }
    }

    #[test]
    fn test_corner_offsets() {
        // 1000x800 canvas, 250x100 logo, padding 40.
        let args = (1000, 800, 250, 100, 40);
        assert_eq!(
            corner_offset(Corner::TopLeft, args.0, args.1, args.2, args.3, args.4),
            (40, 40)
        );
        assert_eq!(
            corner_offset(Corner::TopRight, args.0, args.1, args.2, args.3, args.4),
            (710, 40)
        );
        assert_eq!(
            corner_offset(Corner::BottomLeft, args.0, args.1, args.2, args.3, args.4),
            (40, 660)
        );
        assert_eq!(
            corner_offset(Corner::BottomRight, args.0, args.1, args.2, args.3, args.4),
            (710, 660)
        );
        assert_eq!(
            corner_offset(Corner::Center, args.0, args.1, args.2, args.3, args.4),
            (375, 350)
        );
    }

    #[test]
    fn test_padding_scales_linearly_with_output_width() {
        assert_eq!(scaled_padding(50, 1000), 50);
        assert_eq!(scaled_padding(50, 2000), 100);
        assert_eq!(scaled_padding(50, 500), 25);
        assert_eq!(scaled_padding(0, 1000), 0);
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        assert_eq!(fit_within(800, 600, 800, 800), (800, 600));
        assert_eq!(fit_within(1000, 500, 500, 500), (500, 250));
        assert_eq!(fit_within(500, 1000, 500, 500), (250, 500));
        // Tiny input never collapses to zero.
        assert_eq!(fit_within(1000, 1, 100, 100), (100, 1));
    }

    #[test]
    fn test_scale_to_width_preserves_logo_aspect() {
        // 2:1 logo on a 1000px canvas at 25% -> 250x125.
        assert_eq!(scale_to_width(400, 200, 1000, CORNER_SCALE), (250, 125));
        // 80% watermark -> 800x400.
        assert_eq!(scale_to_width(400, 200, 1000, WATERMARK_SCALE), (800, 400));
    }

    #[test]
    fn test_scale_alpha() {
        let mut img: RgbaImage = ImageBuffer::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        scale_alpha(&mut img, 0.40);
        assert_eq!(img.get_pixel(0, 0).0[3], 102);
    }

    #[test]
    fn test_force_square_output_is_max_side() {
        let source = png_bytes(80, 60, [200, 10, 10]);
        let logo = solid_logo(40, 20, [0, 0, 0]);
        let branded = compose(
            &source,
            Some(&logo),
            &placement(Corner::BottomRight, 50),
            &ComposeOptions { force_square: true },
        )
        .unwrap();

        assert_eq!((branded.width, branded.height), (80, 80));
        let decoded = image::load_from_memory(&branded.full_res).unwrap();
        assert_eq!(decoded.dimensions(), (80, 80));
    }

    #[test]
    fn test_non_square_output_matches_source_dimensions() {
        let source = png_bytes(120, 90, [10, 180, 10]);
        let branded = compose(
            &source,
            None,
            &placement(Corner::BottomRight, 50),
            &ComposeOptions::default(),
        )
        .unwrap();

        assert_eq!((branded.width, branded.height), (120, 90));
        let decoded = image::load_from_memory(&branded.full_res).unwrap();
        assert_eq!(decoded.dimensions(), (120, 90));
    }

    #[test]
    fn test_square_letterbox_band_is_white() {
        // 80x60 source on an 80x80 canvas leaves 10px white bands at top and
        // bottom; the watermark is horizontally centered so the band corner
        // stays uncovered.
        let source = png_bytes(80, 60, [200, 10, 10]);
        let logo = solid_logo(40, 4, [0, 0, 0]);
        let branded = compose(
            &source,
            Some(&logo),
            &placement(Corner::Center, 0),
            &ComposeOptions { force_square: true },
        )
        .unwrap();

        let decoded = image::load_from_memory(&branded.full_res)
            .unwrap()
            .into_rgb8();
        let corner = decoded.get_pixel(0, 0);
        assert!(
            corner.0.iter().all(|&c| c > 240),
            "expected white letterbox corner, got {:?}",
            corner
        );
    }

    #[test]
    fn test_watermark_blends_at_forty_percent() {
        // Black logo over white source: watermark center should read
        // roughly 255 * (1 - 0.4) = 153 on every channel.
        let source = png_bytes(200, 200, [255, 255, 255]);
        let logo = solid_logo(100, 100, [0, 0, 0]);
        let branded = compose(
            &source,
            Some(&logo),
            &placement(Corner::TopLeft, 0),
            &ComposeOptions::default(),
        )
        .unwrap();

        let decoded = image::load_from_memory(&branded.full_res)
            .unwrap()
            .into_rgb8();
        let center = decoded.get_pixel(100, 100);
        for channel in center.0 {
            assert!(
                (145..=161).contains(&channel),
                "expected ~153 blend, got {:?}",
                center
            );
        }
    }

    #[test]
    fn test_corner_logo_is_opaque() {
        let source = png_bytes(400, 400, [255, 255, 255]);
        let logo = solid_logo(100, 100, [0, 0, 0]);
        // Corner logo is 100x100 at bottom-right with zero padding.
        let branded = compose(
            &source,
            Some(&logo),
            &placement(Corner::BottomRight, 0),
            &ComposeOptions::default(),
        )
        .unwrap();

        let decoded = image::load_from_memory(&branded.full_res)
            .unwrap()
            .into_rgb8();
        let inside = decoded.get_pixel(350, 350);
        assert!(
            inside.0.iter().all(|&c| c < 15),
            "expected opaque black corner logo, got {:?}",
            inside
        );
    }

    #[test]
    fn test_thumbnail_is_fixed_square() {
        let source = png_bytes(300, 100, [10, 10, 180]);
        let branded = compose(
            &source,
            None,
            &placement(Corner::BottomRight, 50),
            &ComposeOptions::default(),
        )
        .unwrap();

        let thumb = image::load_from_memory(&branded.thumbnail).unwrap();
        assert_eq!(thumb.dimensions(), (THUMBNAIL_SIDE, THUMBNAIL_SIDE));
        // Thumbnail bytes stay small relative to the full-resolution output.
        assert!(branded.thumbnail.len() < branded.full_res.len());
    }

    #[test]
    fn test_undecodable_source_is_a_decode_error() {
        let result = compose(
            b"not an image",
            None,
            &placement(Corner::BottomRight, 50),
            &ComposeOptions::default(),
        );
        assert!(matches!(result, Err(BrandError::Decode(_))));
    }
}
