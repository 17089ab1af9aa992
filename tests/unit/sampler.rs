use super::*;
use crate::foundation::core::Fps;

fn cfg(fps: Fps, duration: f64, playback_rate: f64) -> ExportConfig {
    ExportConfig {
        playback_rate,
        ..ExportConfig::new(16, 16, fps, duration)
    }
}

#[test]
fn sample_is_frame_over_fps_without_looping() {
    let s = Sampler::new(&cfg(Fps::Fps30, 2.0, 1.0), 0.0);
    assert_eq!(s.total_frames(), 60);
    assert_eq!(s.sample(FrameIndex(0)), 0.0);
    assert_eq!(s.sample(FrameIndex(15)), 0.5);
    assert_eq!(s.sample(FrameIndex(59)), 59.0 / 30.0);
}

#[test]
fn playback_rate_scales_source_time() {
    let s = Sampler::new(&cfg(Fps::Fps25, 4.0, 2.0), 0.0);
    assert_eq!(s.sample(FrameIndex(25)), 2.0);

    let s = Sampler::new(&cfg(Fps::Fps25, 4.0, 0.5), 0.0);
    assert_eq!(s.sample(FrameIndex(25)), 0.5);
}

#[test]
fn positive_source_duration_wraps() {
    let s = Sampler::new(&cfg(Fps::Fps30, 3.0, 1.0), 1.0);
    assert_eq!(s.sample(FrameIndex(30)), 0.0);
    assert_eq!(s.sample(FrameIndex(45)), 0.5);
    assert_eq!(s.sample(FrameIndex(75)), 0.5);
    for sample in s.all_samples() {
        assert!((0.0..1.0).contains(&sample.source_time));
    }
}

#[test]
fn non_finite_source_duration_does_not_wrap() {
    let s = Sampler::new(&cfg(Fps::Fps30, 3.0, 1.0), f64::INFINITY);
    assert_eq!(s.sample(FrameIndex(60)), 2.0);
}

#[test]
fn samples_are_dense_and_identical_across_samplers() {
    let config = cfg(Fps::Fps60, 1.5, 1.25);
    let a: Vec<Sample> = Sampler::new(&config, 0.7).all_samples().collect();
    let b: Vec<Sample> = Sampler::new(&config, 0.7).all_samples().collect();
    assert_eq!(a.len(), 90);
    for (i, (x, y)) in a.iter().zip(&b).enumerate() {
        assert_eq!(x.frame_index, FrameIndex(i as u64));
        assert_eq!(x.source_time.to_bits(), y.source_time.to_bits());
    }
}

#[test]
fn free_function_matches_sampler() {
    let config = cfg(Fps::Fps24, 2.0, 1.0);
    let s = Sampler::new(&config, 0.0);
    for f in [0, 1, 23, 47] {
        assert_eq!(
            sample_time(FrameIndex(f), &config, 0.0),
            s.sample(FrameIndex(f))
        );
    }
}
