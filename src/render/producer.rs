use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{ExportConfig, ExportOpts};
use crate::foundation::cancel::CancelHandle;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::compose::{CanvasFit, encode_png};
use crate::sampler::Sampler;
use crate::source::FrameSource;

/// A rendered frame ready to be written to the encode engine.
///
/// Owned by the producer until handed to the encode step, which consumes the bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Export frame index.
    pub index: FrameIndex,
    /// Source time the frame was rendered at.
    pub source_time: f64,
    /// Lossless PNG (RGBA8, straight alpha) at the output size.
    pub png: Vec<u8>,
}

/// Outcome of a single render request.
#[derive(Debug)]
pub enum RenderResult {
    /// The frame rendered and was read back.
    Ok(Frame),
    /// The source did not answer before the deadline.
    Timeout,
    /// The source reported an error, or its surface could not be read back.
    Failure(String),
}

enum RenderRequest {
    Render { id: u64, t: f64 },
    Dispose,
}

struct RenderReply {
    id: u64,
    result: ReelResult<image::RgbaImage>,
}

/// Drives a [`FrameSource`] at each sample time, in index order.
///
/// The source lives on its own worker thread so each render can be raced against a deadline.
/// A render that times out leaves the worker stuck inside the source; the producer then refuses
/// further renders and detaches the worker instead of joining it.
pub struct FrameProducer {
    sampler: Sampler,
    fit: CanvasFit,
    timeout: Duration,
    cancel: CancelHandle,

    tx: Option<mpsc::Sender<RenderRequest>>,
    rx: mpsc::Receiver<RenderReply>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
    stalled: bool,
}

impl FrameProducer {
    /// Move `source` onto a render worker thread.
    ///
    /// The source is disposed on every path, including when it is rejected here.
    pub fn spawn(
        mut source: Box<dyn FrameSource>,
        config: &ExportConfig,
        opts: &ExportOpts,
        cancel: CancelHandle,
    ) -> ReelResult<Self> {
        if source.width() == 0 || source.height() == 0 {
            source.dispose();
            return Err(ReelError::validation(
                "frame source width/height must be non-zero",
            ));
        }
        let sampler = Sampler::new(config, source.duration());

        let (req_tx, req_rx) = mpsc::channel::<RenderRequest>();
        let (reply_tx, reply_rx) = mpsc::channel::<RenderReply>();
        let worker = std::thread::Builder::new()
            .name("alphareel-render".to_owned())
            .spawn(move || render_worker(source, req_rx, reply_tx))
            .map_err(|e| ReelError::initialization(format!("failed to spawn render worker: {e}")))?;

        Ok(Self {
            sampler,
            fit: CanvasFit {
                width: config.width,
                height: config.height,
                content_scale: config.content_scale,
            },
            timeout: Duration::from_millis(opts.render_timeout_ms.max(1)),
            cancel,
            tx: Some(req_tx),
            rx: reply_rx,
            worker: Some(worker),
            next_id: 0,
            stalled: false,
        })
    }

    /// The sampler this producer renders against.
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Render one frame, reporting the outcome as a [`RenderResult`].
    pub fn render(&mut self, index: FrameIndex) -> RenderResult {
        if self.stalled {
            return RenderResult::Failure(
                "frame source is still busy with a timed-out render".to_owned(),
            );
        }
        let Some(tx) = self.tx.as_ref() else {
            return RenderResult::Failure("frame producer is disposed".to_owned());
        };

        let t = self.sampler.sample(index);
        let id = self.next_id;
        self.next_id += 1;
        if tx.send(RenderRequest::Render { id, t }).is_err() {
            return RenderResult::Failure("render worker exited".to_owned());
        }

        let deadline = Instant::now() + self.timeout;
        let reply = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(reply) if reply.id == id => break reply,
                Ok(stale) => {
                    debug!(stale_id = stale.id, id, "discarding stale render reply");
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    self.stalled = true;
                    return RenderResult::Timeout;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return RenderResult::Failure("render worker exited".to_owned());
                }
            }
        };

        let surface = match reply.result {
            Ok(surface) => surface,
            Err(e) => return RenderResult::Failure(e.to_string()),
        };
        let composed = self.fit.apply(surface);
        match encode_png(&composed) {
            Ok(png) => RenderResult::Ok(Frame {
                index,
                source_time: t,
                png,
            }),
            Err(e) => RenderResult::Failure(e.to_string()),
        }
    }

    /// Render one frame, mapping timeouts and failures onto [`ReelError`].
    pub fn render_frame(&mut self, index: FrameIndex) -> ReelResult<Frame> {
        match self.render(index) {
            RenderResult::Ok(frame) => Ok(frame),
            RenderResult::Timeout => Err(ReelError::RenderTimeout {
                frame: index.0,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            RenderResult::Failure(reason) => Err(ReelError::render(index.0, reason)),
        }
    }

    /// Render `range` sequentially, checking for cancellation before each frame.
    ///
    /// `on_frame` runs after every completed frame. On cancellation or failure the frames
    /// rendered so far are dropped.
    pub fn render_chunk(
        &mut self,
        range: FrameRange,
        on_frame: &mut dyn FnMut(&Frame),
    ) -> ReelResult<Vec<Frame>> {
        let mut frames = Vec::with_capacity(range.len_frames() as usize);
        for index in range.iter() {
            self.cancel.checkpoint()?;
            let frame = self.render_frame(index)?;
            on_frame(&frame);
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Stop the render worker and dispose the frame source. Idempotent.
    pub fn dispose(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let _ = tx.send(RenderRequest::Dispose);
        drop(tx);

        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.stalled {
            warn!("detaching render worker stuck in a timed-out render");
            return;
        }
        if worker.join().is_err() {
            warn!("render worker panicked");
        }
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn render_worker(
    mut source: Box<dyn FrameSource>,
    rx: mpsc::Receiver<RenderRequest>,
    tx: mpsc::Sender<RenderReply>,
) {
    while let Ok(req) = rx.recv() {
        match req {
            RenderRequest::Render { id, t } => {
                let result = source.render_at(t);
                if tx.send(RenderReply { id, result }).is_err() {
                    break;
                }
            }
            RenderRequest::Dispose => break,
        }
    }
    source.dispose();
}

#[cfg(test)]
#[path = "../../tests/unit/render/producer.rs"]
mod tests;
