use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// Largest accepted output width or height, in pixels.
pub const MAX_DIMENSION: u32 = 4096;
/// Longest accepted export, in seconds.
pub const MAX_DURATION_SECS: f64 = 600.0;
/// Default number of frames rendered and encoded together.
pub const DEFAULT_CHUNK_FRAME_COUNT: u32 = 30;
/// Largest accepted `content_scale`.
pub const MAX_CONTENT_SCALE: f64 = 64.0;
/// Default per-frame render deadline.
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 30_000;

/// Alpha-capable output codec.
///
/// Every segment of one export is encoded with the same codec parameters, which is what makes
/// the final stream-copy concatenation valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Codec {
    /// QuickTime Animation (`qtrle`) with 8-bit ARGB. Lossless.
    #[default]
    #[serde(rename = "lossless_argb")]
    LosslessArgb,
    /// Apple ProRes 4444 with a 16-bit alpha plane.
    #[serde(rename = "prores_4444", alias = "prores")]
    ProRes4444,
}

impl Codec {
    /// `ffmpeg` encoder id.
    pub fn encoder_id(self) -> &'static str {
        match self {
            Codec::LosslessArgb => "qtrle",
            Codec::ProRes4444 => "prores_ks",
        }
    }

    /// Pixel format handed to the encoder.
    pub fn pix_fmt(self) -> &'static str {
        match self {
            Codec::LosslessArgb => "argb",
            Codec::ProRes4444 => "yuva444p10le",
        }
    }

    /// Codec-specific encoder flags, appended after the pixel format.
    pub fn extra_args(self) -> &'static [&'static str] {
        match self {
            Codec::LosslessArgb => &[],
            Codec::ProRes4444 => &["-profile:v", "4444", "-alpha_bits", "16", "-vendor", "apl0"],
        }
    }

    /// Container extension (without the dot).
    pub fn container_ext(self) -> &'static str {
        "mov"
    }

    /// MIME type of the produced container.
    pub fn mime_type(self) -> &'static str {
        "video/quicktime"
    }

    /// Short label used in generated file names.
    pub fn label(self) -> &'static str {
        match self {
            Codec::LosslessArgb => "argb",
            Codec::ProRes4444 => "prores4444",
        }
    }
}

fn default_chunk_frame_count() -> u32 {
    DEFAULT_CHUNK_FRAME_COUNT
}

fn default_unit() -> f64 {
    1.0
}

/// Immutable description of one export.
///
/// Loadable from JSON; `codec`, `chunk_frame_count`, `content_scale` and `playback_rate` are
/// optional there.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Output codec.
    #[serde(default)]
    pub codec: Codec,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Export length in seconds.
    pub duration: f64,
    /// Frames per chunk (the resident-memory bound).
    #[serde(default = "default_chunk_frame_count")]
    pub chunk_frame_count: u32,
    /// Scale applied to the source surface before center-padding into `width x height`.
    #[serde(default = "default_unit")]
    pub content_scale: f64,
    /// Source seconds advanced per export second.
    #[serde(default = "default_unit")]
    pub playback_rate: f64,
}

impl ExportConfig {
    /// Config with default codec, chunking, scale and playback rate.
    pub fn new(width: u32, height: u32, fps: Fps, duration: f64) -> Self {
        Self {
            codec: Codec::default(),
            width,
            height,
            fps,
            duration,
            chunk_frame_count: DEFAULT_CHUNK_FRAME_COUNT,
            content_scale: 1.0,
            playback_rate: 1.0,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| ReelError::validation(format!("invalid export config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read export config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Check every field against its bounds.
    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::validation("export width/height must be non-zero"));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(ReelError::validation(format!(
                "export size {}x{} exceeds the {MAX_DIMENSION}x{MAX_DIMENSION} maximum",
                self.width, self.height
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ReelError::validation(
                "export duration must be a positive number of seconds",
            ));
        }
        if self.duration > MAX_DURATION_SECS {
            return Err(ReelError::validation(format!(
                "export duration {}s exceeds the {MAX_DURATION_SECS}s maximum",
                self.duration
            )));
        }
        if self.chunk_frame_count == 0 {
            return Err(ReelError::validation("chunk_frame_count must be > 0"));
        }
        if !self.content_scale.is_finite() || self.content_scale <= 0.0 {
            return Err(ReelError::validation("content_scale must be positive"));
        }
        if self.content_scale > MAX_CONTENT_SCALE {
            return Err(ReelError::validation(format!(
                "content_scale {} exceeds the {MAX_CONTENT_SCALE} maximum",
                self.content_scale
            )));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(ReelError::validation("playback_rate must be positive"));
        }
        if self.total_frames() == 0 {
            return Err(ReelError::validation("export must contain at least one frame"));
        }
        Ok(())
    }

    /// `ceil(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        let exact = self.duration * self.fps.as_f64();
        if !exact.is_finite() || exact <= 0.0 {
            return 0;
        }
        // `0.1 * 30.0` is `3.0000000000000004`; snap values within float noise of an integer.
        let nearest = exact.round();
        if (exact - nearest).abs() < 1e-9 {
            nearest as u64
        } else {
            exact.ceil() as u64
        }
    }

    /// Number of chunks `total_frames` splits into.
    pub fn total_chunks(&self) -> u64 {
        let chunk = u64::from(self.chunk_frame_count.max(1));
        self.total_frames().div_ceil(chunk)
    }

    /// Suggested file name for the merged output.
    pub fn output_file_name(&self) -> String {
        format!(
            "alphareel_{}_{}x{}_{}fps.{}",
            self.codec.label(),
            self.width,
            self.height,
            self.fps,
            self.codec.container_ext()
        )
    }
}

/// Runtime knobs that do not change the exported bytes.
#[derive(Clone, Debug)]
pub struct ExportOpts {
    /// Deadline for a single frame render.
    pub render_timeout_ms: u64,
    /// Yield the calling thread at every pipeline checkpoint.
    pub yield_at_checkpoints: bool,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            yield_at_checkpoints: true,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
