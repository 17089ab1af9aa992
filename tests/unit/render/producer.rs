use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::foundation::core::Fps;

#[derive(Default)]
struct Probe {
    times: Mutex<Vec<f64>>,
    disposed: AtomicBool,
}

struct StubSource {
    size: (u32, u32),
    duration: f64,
    fail_from: Option<usize>,
    delay: Option<Duration>,
    probe: Arc<Probe>,
}

impl StubSource {
    fn new(size: (u32, u32), probe: Arc<Probe>) -> Self {
        Self {
            size,
            duration: 0.0,
            fail_from: None,
            delay: None,
            probe,
        }
    }
}

impl FrameSource for StubSource {
    fn width(&self) -> u32 {
        self.size.0
    }

    fn height(&self) -> u32 {
        self.size.1
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn render_at(&mut self, t: f64) -> ReelResult<image::RgbaImage> {
        let n = {
            let mut times = self.probe.times.lock().unwrap();
            times.push(t);
            times.len() - 1
        };
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_from.is_some_and(|k| n >= k) {
            return Err(ReelError::validation("stub refused"));
        }
        let shade = (n % 256) as u8;
        Ok(image::RgbaImage::from_pixel(
            self.size.0,
            self.size.1,
            image::Rgba([shade, 0, 0, 128]),
        ))
    }

    fn dispose(&mut self) {
        self.probe.disposed.store(true, Ordering::SeqCst);
    }
}

fn config() -> ExportConfig {
    ExportConfig::new(4, 4, Fps::Fps30, 1.0)
}

fn range(start: u64, end: u64) -> FrameRange {
    FrameRange::new(FrameIndex(start), FrameIndex(end)).unwrap()
}

#[test]
fn renders_in_index_order_at_sampled_times() {
    let probe = Arc::new(Probe::default());
    let source = StubSource::new((4, 4), probe.clone());
    let mut producer = FrameProducer::spawn(
        Box::new(source),
        &config(),
        &ExportOpts::default(),
        CancelHandle::new(),
    )
    .unwrap();

    let mut seen = Vec::new();
    let frames = producer
        .render_chunk(range(3, 6), &mut |f| seen.push(f.index.0))
        .unwrap();
    assert_eq!(seen, vec![3, 4, 5]);
    assert_eq!(frames.len(), 3);
    for f in &frames {
        assert_eq!(f.source_time, f.index.0 as f64 / 30.0);
        let img = image::load_from_memory(&f.png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(0, 0).0[3], 128);
    }
    assert_eq!(
        *probe.times.lock().unwrap(),
        vec![3.0 / 30.0, 4.0 / 30.0, 5.0 / 30.0]
    );
}

#[test]
fn output_is_fitted_to_configured_size() {
    let probe = Arc::new(Probe::default());
    let source = StubSource::new((2, 2), probe);
    let mut producer = FrameProducer::spawn(
        Box::new(source),
        &config(),
        &ExportOpts::default(),
        CancelHandle::new(),
    )
    .unwrap();
    let frame = producer.render_frame(FrameIndex(0)).unwrap();
    let img = image::load_from_memory(&frame.png).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (4, 4));
    assert_eq!(img.get_pixel(0, 0).0[3], 0);
    assert_eq!(img.get_pixel(1, 1).0[3], 128);
}

#[test]
fn source_error_is_a_render_failure() {
    let probe = Arc::new(Probe::default());
    let mut source = StubSource::new((4, 4), probe.clone());
    source.fail_from = Some(1);
    let mut producer = FrameProducer::spawn(
        Box::new(source),
        &config(),
        &ExportOpts::default(),
        CancelHandle::new(),
    )
    .unwrap();

    assert!(matches!(
        producer.render(FrameIndex(0)),
        RenderResult::Ok(_)
    ));
    match producer.render(FrameIndex(1)) {
        RenderResult::Failure(reason) => assert!(reason.contains("stub refused")),
        other => panic!("expected failure, got {other:?}"),
    }
    let err = producer.render_frame(FrameIndex(2)).unwrap_err();
    assert!(matches!(err, ReelError::Render { frame: 2, .. }));
}

#[test]
fn slow_source_times_out_and_stays_stalled() {
    let probe = Arc::new(Probe::default());
    let mut source = StubSource::new((4, 4), probe.clone());
    source.delay = Some(Duration::from_millis(300));
    let opts = ExportOpts {
        render_timeout_ms: 20,
        ..ExportOpts::default()
    };
    let mut producer =
        FrameProducer::spawn(Box::new(source), &config(), &opts, CancelHandle::new()).unwrap();

    let err = producer.render_frame(FrameIndex(0)).unwrap_err();
    assert!(matches!(
        err,
        ReelError::RenderTimeout {
            frame: 0,
            timeout_ms: 20
        }
    ));
    // No retry: the stalled source is never asked again.
    assert!(matches!(
        producer.render(FrameIndex(1)),
        RenderResult::Failure(_)
    ));
    producer.dispose();
    assert_eq!(probe.times.lock().unwrap().len(), 1);
}

#[test]
fn cancellation_stops_before_next_frame() {
    let probe = Arc::new(Probe::default());
    let source = StubSource::new((4, 4), probe.clone());
    let cancel = CancelHandle::new();
    let mut producer = FrameProducer::spawn(
        Box::new(source),
        &config(),
        &ExportOpts::default(),
        cancel.clone(),
    )
    .unwrap();

    let err = producer
        .render_chunk(range(0, 10), &mut |f| {
            if f.index.0 == 2 {
                cancel.cancel();
            }
        })
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(probe.times.lock().unwrap().len(), 3);
}

#[test]
fn dispose_is_idempotent_and_reaches_the_source() {
    let probe = Arc::new(Probe::default());
    let source = StubSource::new((4, 4), probe.clone());
    let mut producer = FrameProducer::spawn(
        Box::new(source),
        &config(),
        &ExportOpts::default(),
        CancelHandle::new(),
    )
    .unwrap();
    producer.dispose();
    assert!(probe.disposed.load(Ordering::SeqCst));
    producer.dispose();
    assert!(matches!(
        producer.render(FrameIndex(0)),
        RenderResult::Failure(_)
    ));
}

#[test]
fn zero_sized_source_is_rejected_and_disposed() {
    let probe = Arc::new(Probe::default());
    let source = StubSource::new((0, 4), probe.clone());
    let err = FrameProducer::spawn(
        Box::new(source),
        &config(),
        &ExportOpts::default(),
        CancelHandle::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ReelError::Validation(_)));
    assert!(probe.disposed.load(Ordering::SeqCst));
}
