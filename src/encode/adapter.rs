use tracing::{debug, warn};

use crate::config::Codec;
use crate::encode::engine::EncodeEngine;
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::producer::Frame;

/// Name of the concat reference list in the engine namespace.
pub const CONCAT_LIST: &str = "concat_list.txt";
/// Name of the merged output in the engine namespace.
pub const MERGED_OUTPUT: &str = "output.mov";

/// Encoded clip for one chunk, waiting for the final merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentArtifact {
    /// Index of the chunk the segment was encoded from.
    pub chunk_index: u32,
    /// Engine storage handle of the segment.
    pub storage_handle: String,
}

/// Scratch namespace holding the frames of `chunk_index`.
pub fn chunk_dir(chunk_index: u32) -> String {
    format!("chunk_{chunk_index:04}")
}

/// Image-sequence name of the `n`th frame inside a chunk.
pub fn frame_name(n: usize) -> String {
    format!("frame_{n:04}.png")
}

/// Storage handle of the segment encoded from `chunk_index`.
pub fn segment_name(chunk_index: u32) -> String {
    format!("segment_{chunk_index:04}.mov")
}

/// Translates chunks into encode commands and segment lists into one concat command.
///
/// Codec parameters are fixed per adapter, so every segment of an export is stream-copy
/// compatible with every other.
#[derive(Clone, Copy, Debug)]
pub struct EncodeAdapter {
    codec: Codec,
    fps: Fps,
}

impl EncodeAdapter {
    /// Adapter encoding at `fps` with `codec`.
    pub fn new(codec: Codec, fps: Fps) -> Self {
        Self { codec, fps }
    }

    /// Codec used for every segment.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Arguments of the image-sequence encode for `chunk_index`.
    pub fn encode_args(&self, chunk_index: u32) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-framerate".into(),
            self.fps.as_u32().to_string(),
            "-start_number".into(),
            "0".into(),
            "-i".into(),
            format!("{}/frame_%04d.png", chunk_dir(chunk_index)),
            "-c:v".into(),
            self.codec.encoder_id().into(),
            "-pix_fmt".into(),
            self.codec.pix_fmt().into(),
        ];
        args.extend(self.codec.extra_args().iter().map(|a| (*a).to_owned()));
        args.extend(["-threads".into(), "1".into(), segment_name(chunk_index)]);
        args
    }

    /// Arguments of the stream-copy concatenation of [`CONCAT_LIST`] into [`MERGED_OUTPUT`].
    pub fn concat_args() -> Vec<String> {
        [
            "-f", "concat", "-safe", "0", "-i", CONCAT_LIST, "-c", "copy", MERGED_OUTPUT,
        ]
        .iter()
        .map(|a| (*a).to_owned())
        .collect()
    }

    /// Encode one chunk of frames into a segment.
    ///
    /// The frames and the chunk namespace are removed from the engine whether or not the encode
    /// succeeds; on failure a partially written segment is removed as well.
    #[tracing::instrument(skip(self, engine, frames), fields(frames = frames.len()))]
    pub fn encode_chunk(
        &self,
        engine: &mut dyn EncodeEngine,
        chunk_index: u32,
        frames: Vec<Frame>,
        total_chunks: u32,
    ) -> ReelResult<SegmentArtifact> {
        if frames.is_empty() {
            return Err(ReelError::encode(format!("chunk {chunk_index} has no frames")));
        }
        let dir = chunk_dir(chunk_index);
        engine.create_dir(&dir)?;

        let mut written = Vec::with_capacity(frames.len());
        let result = self.write_and_encode(engine, chunk_index, &dir, frames, &mut written);

        for name in &written {
            if let Err(e) = engine.delete_file(name) {
                warn!(file = %name, error = %e, "failed to delete frame file");
            }
        }
        if let Err(e) = engine.delete_dir(&dir) {
            warn!(dir = %dir, error = %e, "failed to delete chunk namespace");
        }

        match result {
            Ok(()) => {
                debug!(chunk_index, total_chunks, "segment encoded");
                Ok(SegmentArtifact {
                    chunk_index,
                    storage_handle: segment_name(chunk_index),
                })
            }
            Err(e) => {
                let segment = segment_name(chunk_index);
                if let Err(cleanup) = engine.delete_file(&segment) {
                    debug!(file = %segment, error = %cleanup, "failed to delete partial segment");
                }
                Err(e)
            }
        }
    }

    fn write_and_encode(
        &self,
        engine: &mut dyn EncodeEngine,
        chunk_index: u32,
        dir: &str,
        frames: Vec<Frame>,
        written: &mut Vec<String>,
    ) -> ReelResult<()> {
        for (n, frame) in frames.into_iter().enumerate() {
            let name = format!("{dir}/{}", frame_name(n));
            engine.write_file(&name, frame.png)?;
            written.push(name);
        }
        engine.exec(&self.encode_args(chunk_index))
    }

    /// Join segments into the final file and remove them from the engine.
    ///
    /// A single segment is read back as-is without running a concat command.
    #[tracing::instrument(skip_all, fields(segments = artifacts.len()))]
    pub fn merge_chunks(
        &self,
        engine: &mut dyn EncodeEngine,
        artifacts: &[SegmentArtifact],
    ) -> ReelResult<Vec<u8>> {
        let result = merge(engine, artifacts);

        let mut leftovers: Vec<&str> = artifacts
            .iter()
            .map(|a| a.storage_handle.as_str())
            .collect();
        if artifacts.len() > 1 {
            leftovers.extend([CONCAT_LIST, MERGED_OUTPUT]);
        }
        for name in leftovers {
            if let Err(e) = engine.delete_file(name) {
                debug!(file = %name, error = %e, "merge cleanup skipped");
            }
        }
        result
    }
}

fn merge(engine: &mut dyn EncodeEngine, artifacts: &[SegmentArtifact]) -> ReelResult<Vec<u8>> {
    match artifacts {
        [] => Err(ReelError::encode("no segments to merge")),
        [only] => engine.read_file(&only.storage_handle),
        _ => {
            if let Some(pair) = artifacts
                .windows(2)
                .find(|w| w[0].chunk_index >= w[1].chunk_index)
            {
                return Err(ReelError::encode(format!(
                    "segments out of order: chunk {} before chunk {}",
                    pair[0].chunk_index, pair[1].chunk_index
                )));
            }
            let list: String = artifacts
                .iter()
                .map(|a| format!("file '{}'\n", a.storage_handle))
                .collect();
            engine.write_file(CONCAT_LIST, list.into_bytes())?;
            engine.exec(&EncodeAdapter::concat_args())?;
            engine.read_file(MERGED_OUTPUT)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/adapter.rs"]
mod tests;
