//! alphareel exports an animated frame source to an alpha-preserving video file.
//!
//! Frames are rendered deterministically at fixed sample times, a bounded chunk at a time. Each
//! chunk is encoded into a segment by an external encode engine and the frames are dropped
//! straight away; the segments are finally joined with a stream-copy concatenation.
//!
//! - Describe the export with an [`ExportConfig`]
//! - Provide a [`FrameSource`] (for example [`SvgFrameSource`]) and an [`EncodeEngine`]
//!   ([`FfmpegEngine`], or [`MemoryEngine`] for dry runs)
//! - Drive it with an [`Exporter`] and inspect the [`ExportOutcome`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Export configuration and codec choices.
pub mod config;
/// Encode engines and command construction.
pub mod encode;
/// Chunking, progress and the export session.
pub mod pipeline;
/// Frame production and output fitting.
pub mod render;
/// Export-frame to source-time mapping.
pub mod sampler;
/// Frame sources.
pub mod source;

pub use crate::foundation::cancel::CancelHandle;
pub use crate::foundation::core::{Fps, FrameIndex, FrameRange};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::config::{Codec, ExportConfig, ExportOpts};
pub use crate::encode::adapter::{EncodeAdapter, SegmentArtifact};
pub use crate::encode::engine::EncodeEngine;
pub use crate::encode::ffmpeg::{FfmpegEngine, FfmpegEngineOpts, is_ffmpeg_on_path};
pub use crate::encode::memory::{MemoryEngine, MemoryEngineProbe};
pub use crate::pipeline::progress::{ExportPhase, ExportProgress};
pub use crate::pipeline::segmenter::{Chunk, plan_chunks};
pub use crate::pipeline::session::{ExportOutcome, ExportOutput, Exporter};
pub use crate::render::producer::{Frame, FrameProducer, RenderResult};
pub use crate::sampler::{Sample, Sampler, sample_time};
pub use crate::source::FrameSource;
pub use crate::source::svg::SvgFrameSource;
