use std::io::Cursor;

use anyhow::Context as _;
use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::foundation::error::ReelResult;

/// Output geometry applied to every rendered surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasFit {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Scale applied to the source surface before centering.
    pub content_scale: f64,
}

impl CanvasFit {
    /// Scale `surface` by `content_scale` and center it on a transparent `width x height` canvas.
    ///
    /// Content larger than the canvas is center-cropped. A surface that already matches the
    /// output size at scale 1 is returned untouched.
    pub fn apply(&self, surface: RgbaImage) -> RgbaImage {
        let unit_scale = (self.content_scale - 1.0).abs() < f64::EPSILON;
        if unit_scale && surface.dimensions() == (self.width, self.height) {
            return surface;
        }

        // Only the part of the scaled surface that lands on the canvas is ever materialized.
        let mut canvas = RgbaImage::new(self.width, self.height);
        let (w, h) = surface.dimensions();
        if w == 0 || h == 0 {
            return canvas;
        }
        let sx = AxisSpan::visible(w, self.width, self.content_scale);
        let sy = AxisSpan::visible(h, self.height, self.content_scale);
        if sx.len == 0 || sy.len == 0 {
            return canvas;
        }
        let region =
            imageops::crop_imm(&surface, sx.src_start, sy.src_start, sx.src_len, sy.src_len)
                .to_image();
        let visible = if region.dimensions() == (sx.len, sy.len) {
            region
        } else {
            imageops::resize(&region, sx.len, sy.len, FilterType::Triangle)
        };
        imageops::replace(&mut canvas, &visible, sx.dst, sy.dst);
        canvas
    }
}

/// One axis of the visible window: where it comes from in the source and where it lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AxisSpan {
    src_start: u32,
    src_len: u32,
    dst: i64,
    len: u32,
}

impl AxisSpan {
    fn visible(src: u32, canvas: u32, scale: f64) -> Self {
        let scaled = (f64::from(src) * scale).round().max(1.0);
        let canvas_f = f64::from(canvas);
        let offset = ((canvas_f - scaled) / 2.0).trunc();
        let first = (-offset).max(0.0);
        let dst = offset.max(0.0);
        let len = (scaled - first).min(canvas_f - dst).max(0.0);

        let src_f = f64::from(src);
        let start = (first / scale).floor().clamp(0.0, src_f - 1.0);
        let end = ((first + len) / scale).ceil().clamp(start + 1.0, src_f);
        Self {
            src_start: start as u32,
            src_len: (end - start) as u32,
            dst: dst as i64,
            len: len as u32,
        }
    }
}

/// Encode straight-alpha RGBA8 as PNG.
pub fn encode_png(img: &RgbaImage) -> ReelResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode frame png")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compose.rs"]
mod tests;
