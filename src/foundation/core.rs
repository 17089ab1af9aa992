use crate::foundation::error::{ReelError, ReelResult};

/// Zero-based index into the export's frame sequence.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open range of frame indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame (inclusive).
    pub start: FrameIndex,
    /// End frame (exclusive).
    pub end: FrameIndex,
}

impl FrameRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> ReelResult<Self> {
        if start.0 > end.0 {
            return Err(ReelError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// `true` when the range holds no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// `true` when `f` lies inside the range.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Frame indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// Export frame rate. Only a small set of integer rates is supported by the encoders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Fps {
    /// 24 frames per second.
    Fps24,
    /// 25 frames per second.
    Fps25,
    /// 30 frames per second.
    Fps30,
    /// 50 frames per second.
    Fps50,
    /// 60 frames per second.
    Fps60,
}

impl Fps {
    /// Every supported rate, ascending.
    pub const ALL: [Fps; 5] = [Fps::Fps24, Fps::Fps25, Fps::Fps30, Fps::Fps50, Fps::Fps60];

    /// Parse an integer rate, rejecting anything outside [`Fps::ALL`].
    pub fn new(value: u32) -> ReelResult<Self> {
        Self::ALL
            .into_iter()
            .find(|fps| fps.as_u32() == value)
            .ok_or_else(|| {
                ReelError::validation(format!(
                    "unsupported fps {value} (expected one of 24, 25, 30, 50, 60)"
                ))
            })
    }

    /// Integer frames per second.
    pub fn as_u32(self) -> u32 {
        match self {
            Fps::Fps24 => 24,
            Fps::Fps25 => 25,
            Fps::Fps30 => 30,
            Fps::Fps50 => 50,
            Fps::Fps60 => 60,
        }
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.as_u32())
    }

    /// Seconds of export time at the start of frame `frames`.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) / self.as_f64()
    }
}

impl TryFrom<u32> for Fps {
    type Error = ReelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Fps> for u32 {
    fn from(fps: Fps) -> Self {
        fps.as_u32()
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
