use std::time::Instant;

use tracing::{info, warn};

use crate::config::{ExportConfig, ExportOpts};
use crate::encode::adapter::{EncodeAdapter, SegmentArtifact};
use crate::encode::engine::EncodeEngine;
use crate::encode::worker::EngineHandle;
use crate::foundation::cancel::CancelHandle;
use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::progress::{ExportPhase, ExportProgress, ProgressCounters, ProgressTracker};
use crate::pipeline::segmenter::{Segmenter, plan_chunks};
use crate::render::producer::FrameProducer;
use crate::source::FrameSource;

/// Progress callback, invoked once per rendered frame and once per phase change.
pub type ProgressFn = Box<dyn FnMut(&ExportProgress)>;
/// Completion callback, invoked with the merged output on success.
pub type CompleteFn = Box<dyn FnOnce(&ExportOutput)>;

/// The merged export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOutput {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Container bytes.
    pub bytes: Vec<u8>,
}

/// How an export ended. Errors never escape [`Exporter::run`]; they end up here.
#[derive(Debug)]
pub enum ExportOutcome {
    /// The export completed.
    Done(ExportOutput),
    /// The export failed during `phase`.
    Failed {
        /// Phase that was active when the error surfaced.
        phase: ExportPhase,
        /// The error.
        error: ReelError,
    },
    /// The export was cancelled.
    Cancelled,
}

impl ExportOutcome {
    /// `true` for [`ExportOutcome::Done`].
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Done(_))
    }

    /// Terminal phase of the session.
    pub fn phase(&self) -> ExportPhase {
        match self {
            ExportOutcome::Done(_) => ExportPhase::Done,
            ExportOutcome::Failed { .. } => ExportPhase::Error,
            ExportOutcome::Cancelled => ExportPhase::Cancelled,
        }
    }

    /// Failure message; `None` on success or cancellation.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ExportOutcome::Failed { error, .. } => Some(error.to_string()),
            _ => None,
        }
    }

    /// The output of a successful export.
    pub fn output(&self) -> Option<&ExportOutput> {
        match self {
            ExportOutcome::Done(out) => Some(out),
            _ => None,
        }
    }

    /// Consume the outcome, returning the output of a successful export.
    pub fn into_output(self) -> Option<ExportOutput> {
        match self {
            ExportOutcome::Done(out) => Some(out),
            _ => None,
        }
    }
}

/// Entry point for running one export.
///
/// ```no_run
/// use alphareel::{ExportConfig, Exporter, Fps, FfmpegEngine, SvgFrameSource};
///
/// let source = SvgFrameSource::from_path("logo.svg")?.with_spin(2.0, 1.0);
/// let outcome = Exporter::new(ExportConfig::new(512, 512, Fps::Fps30, 4.0))
///     .on_progress(|p| eprintln!("{:.1}%", p.percent))
///     .run(Box::new(source), Box::new(FfmpegEngine::new()));
/// assert!(outcome.is_success());
/// # Ok::<(), alphareel::ReelError>(())
/// ```
pub struct Exporter {
    config: ExportConfig,
    opts: ExportOpts,
    cancel: CancelHandle,
    on_progress: Option<ProgressFn>,
    on_complete: Option<CompleteFn>,
}

impl Exporter {
    /// Exporter for `config` with default runtime options.
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            opts: ExportOpts::default(),
            cancel: CancelHandle::new(),
            on_progress: None,
            on_complete: None,
        }
    }

    /// Replace the runtime options.
    pub fn with_opts(mut self, opts: ExportOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Handle that cancels this export when triggered.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Observe an externally owned cancellation flag instead of a fresh one.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Register the progress callback.
    pub fn on_progress(mut self, f: impl FnMut(&ExportProgress) + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Register the completion callback.
    pub fn on_complete(mut self, f: impl FnOnce(&ExportOutput) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Run the export to a terminal state.
    ///
    /// Both `source` and `engine` are released before this returns, whatever the outcome.
    #[tracing::instrument(skip_all, fields(
        width = self.config.width,
        height = self.config.height,
        fps = self.config.fps.as_u32(),
        codec = self.config.codec.label(),
    ))]
    pub fn run(self, source: Box<dyn FrameSource>, engine: Box<dyn EncodeEngine>) -> ExportOutcome {
        let Exporter {
            config,
            opts,
            cancel,
            on_progress,
            on_complete,
        } = self;

        let mut session = ExportSession::new(config, opts, cancel, on_progress);
        let result = session.drive(source, engine);
        session.cleanup();

        match result {
            Ok(output) => {
                session.enter(ExportPhase::Done);
                info!(
                    bytes = output.bytes.len(),
                    elapsed_ms = session.started.elapsed().as_millis() as u64,
                    "export finished"
                );
                if let Some(done) = on_complete {
                    done(&output);
                }
                ExportOutcome::Done(output)
            }
            Err(e) if e.is_cancelled() => {
                session.enter(ExportPhase::Cancelled);
                info!("export cancelled");
                ExportOutcome::Cancelled
            }
            Err(error) => {
                let phase = session.phase;
                session.enter(ExportPhase::Error);
                warn!(?phase, error = %error, "export failed");
                ExportOutcome::Failed { phase, error }
            }
        }
    }
}

struct Reporter {
    tracker: ProgressTracker,
    callback: Option<ProgressFn>,
}

impl Reporter {
    fn emit(&mut self, phase: ExportPhase, counters: ProgressCounters, started: Instant) {
        let progress = self.tracker.snapshot(phase, counters, started.elapsed());
        if let Some(cb) = self.callback.as_mut() {
            cb(&progress);
        }
    }
}

/// Mutable state of one export run. Only [`Exporter::run`] touches it.
pub(crate) struct ExportSession {
    config: ExportConfig,
    opts: ExportOpts,
    phase: ExportPhase,
    counters: ProgressCounters,
    cancel: CancelHandle,
    started: Instant,
    artifacts: Vec<SegmentArtifact>,
    engine: Option<EngineHandle>,
    segmenter: Option<Segmenter>,
    reporter: Reporter,
    cleaned_up: bool,
}

impl ExportSession {
    pub(crate) fn new(
        config: ExportConfig,
        opts: ExportOpts,
        cancel: CancelHandle,
        on_progress: Option<ProgressFn>,
    ) -> Self {
        Self {
            config,
            opts,
            phase: ExportPhase::Idle,
            counters: ProgressCounters::default(),
            cancel,
            started: Instant::now(),
            artifacts: Vec::new(),
            engine: None,
            segmenter: None,
            reporter: Reporter {
                tracker: ProgressTracker::new(),
                callback: on_progress,
            },
            cleaned_up: false,
        }
    }

    fn enter(&mut self, phase: ExportPhase) {
        self.phase = phase;
        self.reporter.emit(phase, self.counters, self.started);
    }

    fn checkpoint(&self) -> ReelResult<()> {
        self.cancel.checkpoint()?;
        if self.opts.yield_at_checkpoints {
            std::thread::yield_now();
        }
        Ok(())
    }

    fn drive(
        &mut self,
        mut source: Box<dyn FrameSource>,
        engine: Box<dyn EncodeEngine>,
    ) -> ReelResult<ExportOutput> {
        self.enter(ExportPhase::Initializing);

        match EngineHandle::spawn(engine) {
            Ok(handle) => self.engine = Some(handle),
            Err(e) => {
                source.dispose();
                return Err(e);
            }
        }
        let plan = self
            .config
            .validate()
            .and_then(|()| plan_chunks(self.config.total_frames(), self.config.chunk_frame_count));
        let chunks = match plan {
            Ok(chunks) => chunks,
            Err(e) => {
                source.dispose();
                return Err(e);
            }
        };

        let producer = FrameProducer::spawn(source, &self.config, &self.opts, self.cancel.clone())?;
        self.counters.total_frames = self.config.total_frames();
        self.counters.total_chunks = chunks.len() as u32;
        let adapter = EncodeAdapter::new(self.config.codec, self.config.fps);
        self.segmenter = Some(Segmenter::new(chunks.clone(), producer, adapter));
        self.checkpoint()?;

        self.load_engine()?;
        info!(
            total_frames = self.counters.total_frames,
            total_chunks = self.counters.total_chunks,
            "export started"
        );

        for chunk in chunks {
            self.checkpoint()?;
            self.enter(ExportPhase::Rendering);
            let frames = {
                let segmenter = self
                    .segmenter
                    .as_mut()
                    .ok_or_else(|| ReelError::encode("frame producer already released"))?;
                let counters = &mut self.counters;
                let reporter = &mut self.reporter;
                let started = self.started;
                segmenter.render_chunk(chunk, &mut |_frame| {
                    counters.frames_rendered += 1;
                    reporter.emit(ExportPhase::Rendering, *counters, started);
                })?
            };

            self.checkpoint()?;
            self.enter(ExportPhase::Encoding);
            let artifact = {
                let (Some(segmenter), Some(engine)) = (self.segmenter.as_ref(), self.engine.as_mut())
                else {
                    return Err(ReelError::encode("export session already released"));
                };
                segmenter.encode_chunk(engine, chunk, frames)?
            };
            self.artifacts.push(artifact);
            self.counters.chunks_encoded += 1;
            self.counters.frames_encoded += u64::from(chunk.frame_count);
            self.enter(ExportPhase::Encoding);
            self.checkpoint()?;
        }

        self.checkpoint()?;
        self.enter(ExportPhase::Merging);
        let bytes = {
            let (Some(segmenter), Some(engine)) = (self.segmenter.as_ref(), self.engine.as_mut())
            else {
                return Err(ReelError::encode("export session already released"));
            };
            let merged = segmenter.merge(engine, &self.artifacts);
            // The merge step removes every segment whether or not it succeeds.
            self.artifacts.clear();
            merged?
        };

        Ok(ExportOutput {
            file_name: self.config.output_file_name(),
            mime_type: self.config.codec.mime_type().to_owned(),
            bytes,
        })
    }

    fn load_engine(&mut self) -> ReelResult<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(ReelError::initialization("encode engine was not started"));
        };
        engine.load().map_err(|e| match e {
            ReelError::Initialization(_) => e,
            other => ReelError::initialization(other.to_string()),
        })
    }

    /// Release scratch segments, the engine and the frame source. Runs once; errors are logged.
    pub(crate) fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        if let Some(mut engine) = self.engine.take() {
            for artifact in self.artifacts.drain(..) {
                if let Err(e) = engine.delete_file(&artifact.storage_handle) {
                    warn!(file = %artifact.storage_handle, error = %e, "failed to delete segment");
                }
            }
            if let Err(e) = engine.terminate() {
                warn!(error = %e, "failed to terminate encode engine");
            }
        }
        self.artifacts.clear();
        if let Some(mut segmenter) = self.segmenter.take() {
            segmenter.dispose();
        }
    }
}

impl Drop for ExportSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/session.rs"]
mod tests;
