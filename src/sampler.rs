use crate::config::ExportConfig;
use crate::foundation::core::{FrameIndex, FrameRange};

/// One frame's position on both timelines.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Sample {
    /// Dense zero-based export frame index.
    pub frame_index: FrameIndex,
    /// Time handed to the frame source, in seconds.
    pub source_time: f64,
}

/// Pure mapping from export frame index to frame source time.
///
/// `source_time = (frame / fps) * playback_rate`, wrapped into `[0, source_duration)` when the
/// source reports a positive duration so a short loop can fill a longer export.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampler {
    fps: f64,
    playback_rate: f64,
    source_duration: f64,
    total_frames: u64,
}

impl Sampler {
    /// Build a sampler for `config` against a source that loops every `source_duration` seconds
    /// (`0.0` or non-finite: no looping).
    pub fn new(config: &ExportConfig, source_duration: f64) -> Self {
        Self {
            fps: config.fps.as_f64(),
            playback_rate: config.playback_rate,
            source_duration,
            total_frames: config.total_frames(),
        }
    }

    /// `ceil(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Source time for `frame`.
    pub fn sample(&self, frame: FrameIndex) -> f64 {
        let export_time = frame.0 as f64 / self.fps;
        let raw = export_time * self.playback_rate;
        if self.source_duration.is_finite() && self.source_duration > 0.0 {
            raw.rem_euclid(self.source_duration)
        } else {
            raw
        }
    }

    /// Samples for every frame in `range`, ascending.
    pub fn samples(&self, range: FrameRange) -> impl Iterator<Item = Sample> + '_ {
        range.iter().map(|frame_index| Sample {
            frame_index,
            source_time: self.sample(frame_index),
        })
    }

    /// Samples for the whole export.
    pub fn all_samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.samples(FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames),
        })
    }
}

/// Source time for `frame` under `config`; see [`Sampler`].
pub fn sample_time(frame: FrameIndex, config: &ExportConfig, source_duration: f64) -> f64 {
    Sampler::new(config, source_duration).sample(frame)
}

#[cfg(test)]
#[path = "../tests/unit/sampler.rs"]
mod tests;
