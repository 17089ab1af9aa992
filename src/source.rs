use crate::foundation::error::ReelResult;

/// SVG-backed frame source.
pub mod svg;

/// Deterministic renderer that supplies one image per requested timestamp.
///
/// The pipeline calls [`FrameSource::render_at`] at most once per sample, strictly sequentially,
/// from a dedicated render thread. Implementations must be pure with respect to `t`: no hidden
/// timers, no dependence on call order.
pub trait FrameSource: Send {
    /// Native surface width in pixels.
    fn width(&self) -> u32;

    /// Native surface height in pixels.
    fn height(&self) -> u32;

    /// Loop length in seconds. `0.0` means the source does not loop.
    fn duration(&self) -> f64;

    /// Render the surface at source time `t` (seconds) as straight-alpha RGBA8.
    fn render_at(&mut self, t: f64) -> ReelResult<image::RgbaImage>;

    /// Release resources. Called once when the export ends, on every exit path.
    fn dispose(&mut self) {}
}
