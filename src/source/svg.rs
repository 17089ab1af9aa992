use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};
use crate::source::FrameSource;

/// Frame source that rasterizes an SVG document, optionally spinning it around its center.
///
/// With `loop_secs > 0` the drawing completes `turns_per_loop` full turns every `loop_secs`
/// seconds and the source reports `loop_secs` as its duration. Otherwise it is static.
pub struct SvgFrameSource {
    tree: usvg::Tree,
    width: u32,
    height: u32,
    loop_secs: f64,
    turns_per_loop: f64,
}

impl SvgFrameSource {
    /// Parse SVG bytes.
    pub fn from_data(bytes: &[u8]) -> ReelResult<Self> {
        let opts = usvg::Options::default();
        let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
        let size = tree.size();
        let width = to_px(size.width())?;
        let height = to_px(size.height())?;
        Ok(Self {
            tree,
            width,
            height,
            loop_secs: 0.0,
            turns_per_loop: 0.0,
        })
    }

    /// Read and parse an SVG file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("read svg '{}'", path.display()))?;
        Self::from_data(&bytes)
    }

    /// Spin `turns_per_loop` full turns every `loop_secs` seconds.
    pub fn with_spin(mut self, loop_secs: f64, turns_per_loop: f64) -> Self {
        self.loop_secs = if loop_secs.is_finite() { loop_secs.max(0.0) } else { 0.0 };
        self.turns_per_loop = if turns_per_loop.is_finite() {
            turns_per_loop
        } else {
            0.0
        };
        self
    }

    fn angle_deg(&self, t: f64) -> f32 {
        if self.loop_secs <= 0.0 {
            return 0.0;
        }
        (360.0 * self.turns_per_loop * (t / self.loop_secs)).rem_euclid(360.0) as f32
    }
}

impl FrameSource for SvgFrameSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn duration(&self) -> f64 {
        self.loop_secs
    }

    fn render_at(&mut self, t: f64) -> ReelResult<image::RgbaImage> {
        let mut pixmap = resvg::tiny_skia::Pixmap::new(self.width, self.height)
            .ok_or_else(|| ReelError::validation("failed to allocate svg pixmap"))?;

        let sx = (self.width as f32) / self.tree.size().width();
        let sy = (self.height as f32) / self.tree.size().height();
        let xform = resvg::tiny_skia::Transform::from_rotate_at(
            self.angle_deg(t),
            self.width as f32 / 2.0,
            self.height as f32 / 2.0,
        )
        .pre_scale(sx, sy);

        resvg::render(&self.tree, xform, &mut pixmap.as_mut());

        let mut rgba = pixmap.take();
        demultiply_rgba8_in_place(&mut rgba);
        image::RgbaImage::from_raw(self.width, self.height, rgba)
            .ok_or_else(|| ReelError::validation("svg pixmap size mismatch"))
    }
}

fn to_px(v: f32) -> ReelResult<u32> {
    if !v.is_finite() || v <= 0.0 {
        return Err(ReelError::validation("svg has invalid width/height"));
    }
    Ok((v.ceil() as u32).max(1))
}

/// `tiny_skia` pixmaps are premultiplied; frame sources hand out straight alpha.
fn demultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/svg.rs"]
mod tests;
