//! Offscreen RGBA raster that accumulates signature ink.
//!
//! The canvas starts fully transparent and strokes are stamped as solid
//! black, so the exported PNG composites cleanly over any background the
//! recap screen uses.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{Result, TamuError};

/// Stroke width in surface pixels.
pub const STROKE_WIDTH: f32 = 2.0;

const HALF_STROKE: f32 = STROKE_WIDTH / 2.0;
const CHANNELS: usize = 4;

/// Fixed-size RGBA8 pixel grid with segment stamping.
pub struct StrokeCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl StrokeCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * CHANNELS],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Wipe all ink back to the transparent background.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// True until the first pixel of ink lands.
    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(CHANNELS).all(|px| px[3] == 0)
    }

    /// Stamp a line segment from `from` to `to` in surface coordinates.
    ///
    /// Pixels whose center lies within half the stroke width of the segment
    /// are painted solid black. Clamping the projection onto the segment
    /// gives round caps at both ends, so consecutive segments of one stroke
    /// join without gaps. Anything outside the canvas bounds is clipped.
    pub fn stamp_segment(&mut self, from: (f32, f32), to: (f32, f32)) {
        if self.width == 0 || self.height == 0 {
            return;
        }

        let reach = HALF_STROKE + 1.0;
        let min_x = (from.0.min(to.0) - reach).floor().max(0.0) as u32;
        let min_y = (from.1.min(to.1) - reach).floor().max(0.0) as u32;
        let max_x = (from.0.max(to.0) + reach).ceil().min(self.width as f32 - 1.0);
        let max_y = (from.1.max(to.1) + reach).ceil().min(self.height as f32 - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }
        let (max_x, max_y) = (max_x as u32, max_y as u32);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let center = (x as f32 + 0.5, y as f32 + 0.5);
                if segment_distance(center, from, to) <= HALF_STROKE {
                    let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
                    self.pixels[idx] = 0;
                    self.pixels[idx + 1] = 0;
                    self.pixels[idx + 2] = 0;
                    self.pixels[idx + 3] = 255;
                }
            }
        }
    }

    /// Encode the current pixels as a `data:image/png;base64,...` URI.
    pub fn to_png_data_uri(&self) -> Result<String> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&self.pixels, self.width, self.height, ExtendedColorType::Rgba8)
            .map_err(|e| TamuError::SignatureEncode(e.to_string()))?;
        Ok(format!("data:image/png;base64,{}", BASE64.encode(&png)))
    }
}

/// Distance from point `p` to the segment `a`..`b`.
fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (p.0 - a.0, p.1 - a.1);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1;

    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        ((ap.0 * ab.0 + ap.1 * ab.1) / len_sq).clamp(0.0, 1.0)
    };

    let closest = (a.0 + ab.0 * t, a.1 + ab.1 * t);
    let d = (p.0 - closest.0, p.1 - closest.1);
    (d.0 * d.0 + d.1 * d.1).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    fn alpha_at(canvas: &StrokeCanvas, x: u32, y: u32) -> u8 {
        canvas.pixels[(y as usize * canvas.width as usize + x as usize) * CHANNELS + 3]
    }

    #[test]
    fn new_canvas_is_blank() {
        let canvas = StrokeCanvas::new(32, 16);
        assert!(canvas.is_blank());
    }

    #[test]
    fn horizontal_segment_inks_a_band() {
        let mut canvas = StrokeCanvas::new(32, 16);
        canvas.stamp_segment((4.0, 8.0), (28.0, 8.0));

        assert!(!canvas.is_blank());
        assert_eq!(alpha_at(&canvas, 16, 7), 255);
        assert_eq!(alpha_at(&canvas, 16, 8), 255);
        // Well off the stroke stays transparent.
        assert_eq!(alpha_at(&canvas, 16, 2), 0);
        assert_eq!(alpha_at(&canvas, 16, 13), 0);
    }

    #[test]
    fn zero_length_segment_inks_a_dot() {
        let mut canvas = StrokeCanvas::new(16, 16);
        canvas.stamp_segment((8.0, 8.0), (8.0, 8.0));
        assert!(!canvas.is_blank());
        assert_eq!(alpha_at(&canvas, 8, 8), 255);
        assert_eq!(alpha_at(&canvas, 12, 12), 0);
    }

    #[test]
    fn segments_leaving_the_canvas_are_clipped() {
        let mut canvas = StrokeCanvas::new(16, 16);
        canvas.stamp_segment((8.0, 8.0), (100.0, 8.0));
        canvas.stamp_segment((-20.0, -20.0), (-5.0, -5.0));
        // In-bounds part of the first segment landed, nothing panicked.
        assert_eq!(alpha_at(&canvas, 12, 8), 255);
    }

    #[test]
    fn chained_segments_join_without_gaps() {
        let mut canvas = StrokeCanvas::new(32, 32);
        canvas.stamp_segment((4.0, 16.0), (16.0, 16.0));
        canvas.stamp_segment((16.0, 16.0), (16.0, 4.0));
        // The joint pixel is covered by both segments.
        assert_eq!(alpha_at(&canvas, 15, 15), 255);
    }

    #[test]
    fn clear_restores_blank_state() {
        let mut canvas = StrokeCanvas::new(16, 16);
        canvas.stamp_segment((2.0, 2.0), (12.0, 12.0));
        assert!(!canvas.is_blank());
        canvas.clear();
        assert!(canvas.is_blank());
    }

    #[test]
    fn data_uri_is_base64_png() {
        let mut canvas = StrokeCanvas::new(16, 16);
        canvas.stamp_segment((2.0, 8.0), (14.0, 8.0));

        let uri = canvas.to_png_data_uri().unwrap();
        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = BASE64.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
