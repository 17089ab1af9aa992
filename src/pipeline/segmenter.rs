use crate::encode::adapter::{EncodeAdapter, SegmentArtifact};
use crate::encode::engine::EncodeEngine;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::producer::{Frame, FrameProducer};

/// A contiguous slice of the export's frame index space, rendered and encoded as one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Chunk {
    /// Position of the chunk in the plan.
    pub index: u32,
    /// First frame covered by the chunk.
    pub first_frame: FrameIndex,
    /// Number of frames covered.
    pub frame_count: u32,
}

impl Chunk {
    /// Half-open frame range covered by the chunk.
    pub fn range(&self) -> FrameRange {
        FrameRange {
            start: self.first_frame,
            end: FrameIndex(self.first_frame.0 + u64::from(self.frame_count)),
        }
    }
}

/// Split `[0, total_frames)` into chunks of `chunk_frame_count` frames; the last may be shorter.
pub fn plan_chunks(total_frames: u64, chunk_frame_count: u32) -> ReelResult<Vec<Chunk>> {
    if chunk_frame_count == 0 {
        return Err(ReelError::validation("chunk_frame_count must be > 0"));
    }
    let size = u64::from(chunk_frame_count);
    let count = total_frames.div_ceil(size);
    if count > u64::from(u32::MAX) {
        return Err(ReelError::validation("export splits into too many chunks"));
    }

    let mut chunks = Vec::with_capacity(count as usize);
    let mut first = 0u64;
    let mut index = 0u32;
    while first < total_frames {
        let frame_count = (total_frames - first).min(size) as u32;
        chunks.push(Chunk {
            index,
            first_frame: FrameIndex(first),
            frame_count,
        });
        first += u64::from(frame_count);
        index += 1;
    }
    Ok(chunks)
}

/// Walks the chunk plan, pairing the frame producer with the encode adapter.
///
/// At most one chunk's frames are alive at a time: they are moved into the encode step and
/// dropped as soon as the segment exists.
pub struct Segmenter {
    chunks: Vec<Chunk>,
    producer: FrameProducer,
    adapter: EncodeAdapter,
}

impl Segmenter {
    /// Segmenter over `chunks`.
    pub fn new(chunks: Vec<Chunk>, producer: FrameProducer, adapter: EncodeAdapter) -> Self {
        Self {
            chunks,
            producer,
            adapter,
        }
    }

    /// The chunk plan, in order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Render every frame of `chunk`, in order.
    #[tracing::instrument(skip(self, on_frame), fields(chunk = chunk.index))]
    pub fn render_chunk(
        &mut self,
        chunk: Chunk,
        on_frame: &mut dyn FnMut(&Frame),
    ) -> ReelResult<Vec<Frame>> {
        self.producer.render_chunk(chunk.range(), on_frame)
    }

    /// Encode the rendered frames of `chunk` into a segment, consuming them.
    pub fn encode_chunk(
        &self,
        engine: &mut dyn EncodeEngine,
        chunk: Chunk,
        frames: Vec<Frame>,
    ) -> ReelResult<SegmentArtifact> {
        let total = self.chunks.len() as u32;
        self.adapter.encode_chunk(engine, chunk.index, frames, total)
    }

    /// Join the segments into the final file.
    pub fn merge(
        &self,
        engine: &mut dyn EncodeEngine,
        artifacts: &[SegmentArtifact],
    ) -> ReelResult<Vec<u8>> {
        self.adapter.merge_chunks(engine, artifacts)
    }

    /// Release the frame producer and its source. Idempotent.
    pub fn dispose(&mut self) {
        self.producer.dispose();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/segmenter.rs"]
mod tests;
