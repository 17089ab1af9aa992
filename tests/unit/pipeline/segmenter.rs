use super::*;
use crate::config::{ExportConfig, ExportOpts};
use crate::encode::memory::MemoryEngine;
use crate::foundation::cancel::CancelHandle;
use crate::foundation::core::Fps;
use crate::source::FrameSource;

struct Flat;

impl FrameSource for Flat {
    fn width(&self) -> u32 {
        2
    }

    fn height(&self) -> u32 {
        2
    }

    fn duration(&self) -> f64 {
        0.0
    }

    fn render_at(&mut self, _t: f64) -> ReelResult<image::RgbaImage> {
        Ok(image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 64])))
    }
}

#[test]
fn plan_covers_every_frame_once_in_order() {
    let chunks = plan_chunks(70, 30).unwrap();
    assert_eq!(chunks.len(), 3);
    assert_eq!(
        chunks.iter().map(|c| c.frame_count).collect::<Vec<_>>(),
        vec![30, 30, 10]
    );
    let covered: Vec<u64> = chunks
        .iter()
        .flat_map(|c| c.range().iter())
        .map(|f| f.0)
        .collect();
    assert_eq!(covered, (0..70).collect::<Vec<_>>());
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.index as usize, i);
    }
}

#[test]
fn evenly_divisible_plan_has_full_last_chunk() {
    let chunks = plan_chunks(60, 30).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].range(), FrameRange::new(FrameIndex(30), FrameIndex(60)).unwrap());
    assert_eq!(chunks[1].frame_count, 30);
}

#[test]
fn short_export_is_one_chunk() {
    let chunks = plan_chunks(5, 30).unwrap();
    assert_eq!(
        chunks,
        vec![Chunk {
            index: 0,
            first_frame: FrameIndex(0),
            frame_count: 5
        }]
    );
}

#[test]
fn degenerate_plans() {
    assert!(plan_chunks(0, 30).unwrap().is_empty());
    assert!(plan_chunks(10, 0).is_err());
}

#[test]
fn segmenter_renders_encodes_and_merges() {
    let mut cfg = ExportConfig::new(2, 2, Fps::Fps25, 0.2);
    cfg.chunk_frame_count = 2;
    let producer = FrameProducer::spawn(
        Box::new(Flat),
        &cfg,
        &ExportOpts::default(),
        CancelHandle::new(),
    )
    .unwrap();
    let adapter = EncodeAdapter::new(cfg.codec, cfg.fps);
    let mut segmenter = Segmenter::new(
        plan_chunks(cfg.total_frames(), cfg.chunk_frame_count).unwrap(),
        producer,
        adapter,
    );
    assert_eq!(segmenter.chunks().len(), 3);

    let mut engine = MemoryEngine::new();
    engine.load().unwrap();
    let probe = engine.probe();

    let mut rendered = 0;
    let mut artifacts = Vec::new();
    for chunk in segmenter.chunks().to_vec() {
        let frames = segmenter
            .render_chunk(chunk, &mut |_| rendered += 1)
            .unwrap();
        artifacts.push(segmenter.encode_chunk(&mut engine, chunk, frames).unwrap());
    }
    assert_eq!(rendered, 5);
    assert!(probe.peak_frame_files() <= 2);

    let bytes = segmenter.merge(&mut engine, &artifacts).unwrap();
    assert!(!bytes.is_empty());
    assert!(probe.entries().is_empty());
    segmenter.dispose();
    segmenter.dispose();
}
