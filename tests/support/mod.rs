#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alphareel::{FrameSource, ReelError, ReelResult};

/// What a [`StubSource`] was asked to do.
#[derive(Default)]
pub struct Probe {
    pub times: Mutex<Vec<f64>>,
    pub disposed: AtomicUsize,
}

impl Probe {
    pub fn times(&self) -> Vec<f64> {
        self.times.lock().unwrap().clone()
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Deterministic source whose pixels encode the requested time.
pub struct StubSource {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub fail_at_call: Option<usize>,
    pub delay: Option<Duration>,
    pub probe: Arc<Probe>,
}

impl StubSource {
    pub fn new(width: u32, height: u32) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                width,
                height,
                duration: 0.0,
                fail_at_call: None,
                delay: None,
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl FrameSource for StubSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn render_at(&mut self, t: f64) -> ReelResult<image::RgbaImage> {
        let call = {
            let mut times = self.probe.times.lock().unwrap();
            times.push(t);
            times.len() - 1
        };
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_at_call == Some(call) {
            return Err(ReelError::validation(format!("stub failed at call {call}")));
        }
        let ms = (t * 1000.0).round() as u32;
        let px = image::Rgba([(ms % 256) as u8, ((ms / 256) % 256) as u8, 90, 160]);
        Ok(image::RgbaImage::from_pixel(self.width, self.height, px))
    }

    fn dispose(&mut self) {
        self.probe.disposed.fetch_add(1, Ordering::SeqCst);
    }
}
