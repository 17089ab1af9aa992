use std::time::Duration;

/// Share of the bar covered by rendering.
pub const RENDER_WEIGHT: f64 = 60.0;
/// Share of the bar covered by encoding.
pub const ENCODE_WEIGHT: f64 = 35.0;
/// Share of the bar covered by the final merge.
pub const MERGE_WEIGHT: f64 = 5.0;

/// Export state machine phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    /// Not started.
    Idle,
    /// Validating the config and loading the encode engine.
    Initializing,
    /// Rendering the frames of a chunk.
    Rendering,
    /// Encoding a chunk into a segment.
    Encoding,
    /// Concatenating segments.
    Merging,
    /// Finished with output.
    Done,
    /// Finished with an error.
    Error,
    /// Stopped by a cancellation request.
    Cancelled,
}

impl ExportPhase {
    /// `true` for `Done`, `Error` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExportPhase::Done | ExportPhase::Error | ExportPhase::Cancelled
        )
    }
}

/// Session counters that progress is derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    /// Frames rendered so far, across all chunks.
    pub frames_rendered: u64,
    /// Frames in the export.
    pub total_frames: u64,
    /// Chunks encoded so far.
    pub chunks_encoded: u32,
    /// Chunks in the export.
    pub total_chunks: u32,
    /// Frames belonging to the chunks encoded so far.
    pub frames_encoded: u64,
}

/// Snapshot handed to progress callbacks.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExportProgress {
    /// Current phase.
    pub phase: ExportPhase,
    /// Frames rendered so far.
    pub current_frame: u64,
    /// Frames in the export.
    pub total_frames: u64,
    /// Chunks encoded so far.
    pub current_chunk: u32,
    /// Chunks in the export.
    pub total_chunks: u32,
    /// Overall completion in `[0, 100]`, never decreasing within a session.
    pub percent: f64,
    /// Estimated time left, once at least one frame has rendered.
    pub eta_ms: Option<u64>,
}

fn ratio(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (done.min(total) as f64) / (total as f64)
    }
}

/// Raw percentage for `phase` before the monotonic clamp.
///
/// Rendering of the first chunk maps rendered frames onto `[0, 60]`, encoding maps encoded chunks
/// onto `[60, 95]` and merging sits at `95`. Once a chunk has been encoded, rendering the next one
/// advances through the first 60/95 of that chunk's slice of the encode band.
pub fn phase_percent(phase: ExportPhase, c: ProgressCounters) -> f64 {
    match phase {
        ExportPhase::Idle | ExportPhase::Initializing => 0.0,
        ExportPhase::Rendering if c.chunks_encoded > 0 => {
            let base = encode_percent(c);
            let remaining_chunks = c.total_chunks.saturating_sub(c.chunks_encoded);
            if remaining_chunks == 0 {
                return base;
            }
            let per_chunk =
                c.total_frames.saturating_sub(c.frames_encoded) as f64 / f64::from(remaining_chunks);
            let in_chunk = c.frames_rendered.saturating_sub(c.frames_encoded) as f64;
            let fraction = if per_chunk > 0.0 {
                (in_chunk / per_chunk).min(1.0)
            } else {
                0.0
            };
            let slice = ENCODE_WEIGHT / f64::from(c.total_chunks);
            base + slice * (RENDER_WEIGHT / (RENDER_WEIGHT + ENCODE_WEIGHT)) * fraction
        }
        ExportPhase::Rendering => RENDER_WEIGHT * ratio(c.frames_rendered, c.total_frames),
        ExportPhase::Encoding => encode_percent(c),
        ExportPhase::Merging => RENDER_WEIGHT + ENCODE_WEIGHT,
        ExportPhase::Done => RENDER_WEIGHT + ENCODE_WEIGHT + MERGE_WEIGHT,
        ExportPhase::Error | ExportPhase::Cancelled => 0.0,
    }
}

fn encode_percent(c: ProgressCounters) -> f64 {
    RENDER_WEIGHT + ENCODE_WEIGHT * ratio(u64::from(c.chunks_encoded), u64::from(c.total_chunks))
}

/// `elapsed / fraction - elapsed`, or `None` when nothing has completed yet.
pub fn estimate_remaining_ms(elapsed: Duration, percent: f64, frames_rendered: u64) -> Option<u64> {
    if frames_rendered == 0 || percent.is_nan() || percent <= 0.0 {
        return None;
    }
    let fraction = (percent / 100.0).min(1.0);
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let remaining = elapsed_ms / fraction - elapsed_ms;
    Some(remaining.max(0.0).round() as u64)
}

/// Turns counters into snapshots whose percentage never goes backwards.
#[derive(Clone, Debug, Default)]
pub struct ProgressTracker {
    high_water: f64,
}

impl ProgressTracker {
    /// Tracker starting at 0%.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest percentage reported so far.
    pub fn percent(&self) -> f64 {
        self.high_water
    }

    /// Snapshot for `phase` given `counters` and time since the session started.
    pub fn snapshot(
        &mut self,
        phase: ExportPhase,
        counters: ProgressCounters,
        elapsed: Duration,
    ) -> ExportProgress {
        let raw = phase_percent(phase, counters).clamp(0.0, 100.0);
        self.high_water = self.high_water.max(raw);
        let eta_ms = match phase {
            ExportPhase::Done => Some(0),
            ExportPhase::Error | ExportPhase::Cancelled => None,
            _ => estimate_remaining_ms(elapsed, self.high_water, counters.frames_rendered),
        };
        ExportProgress {
            phase,
            current_frame: counters.frames_rendered,
            total_frames: counters.total_frames,
            current_chunk: counters.chunks_encoded,
            total_chunks: counters.total_chunks,
            percent: self.high_water,
            eta_ms,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
