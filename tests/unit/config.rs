use super::*;

#[test]
fn json_defaults_fill_optional_fields() {
    let cfg = ExportConfig::from_json_str(
        r#"{ "width": 640, "height": 360, "fps": 30, "duration": 2.0 }"#,
    )
    .unwrap();
    assert_eq!(cfg.codec, Codec::LosslessArgb);
    assert_eq!(cfg.chunk_frame_count, DEFAULT_CHUNK_FRAME_COUNT);
    assert_eq!(cfg.content_scale, 1.0);
    assert_eq!(cfg.playback_rate, 1.0);
    assert_eq!(cfg, ExportConfig::new(640, 360, Fps::Fps30, 2.0));
}

#[test]
fn json_codec_names_and_alias() {
    let cfg = ExportConfig::from_json_str(
        r#"{ "codec": "prores_4444", "width": 8, "height": 8, "fps": 24, "duration": 1 }"#,
    )
    .unwrap();
    assert_eq!(cfg.codec, Codec::ProRes4444);

    let cfg = ExportConfig::from_json_str(
        r#"{ "codec": "prores", "width": 8, "height": 8, "fps": 24, "duration": 1 }"#,
    )
    .unwrap();
    assert_eq!(cfg.codec, Codec::ProRes4444);
}

#[test]
fn json_rejects_unknown_fields_and_bad_fps() {
    assert!(
        ExportConfig::from_json_str(
            r#"{ "width": 8, "height": 8, "fps": 30, "duration": 1, "bitrate": 5 }"#
        )
        .is_err()
    );
    assert!(
        ExportConfig::from_json_str(r#"{ "width": 8, "height": 8, "fps": 29, "duration": 1 }"#)
            .is_err()
    );
}

#[test]
fn validation_catches_bad_values() {
    let base = ExportConfig::new(64, 64, Fps::Fps30, 1.0);
    assert!(base.validate().is_ok());

    let bad = [
        ExportConfig { width: 0, ..base.clone() },
        ExportConfig { height: MAX_DIMENSION + 1, ..base.clone() },
        ExportConfig { duration: 0.0, ..base.clone() },
        ExportConfig { duration: f64::NAN, ..base.clone() },
        ExportConfig { duration: MAX_DURATION_SECS + 1.0, ..base.clone() },
        ExportConfig { chunk_frame_count: 0, ..base.clone() },
        ExportConfig { content_scale: 0.0, ..base.clone() },
        ExportConfig { playback_rate: -1.0, ..base.clone() },
        ExportConfig { playback_rate: f64::INFINITY, ..base.clone() },
    ];
    for cfg in bad {
        assert!(
            matches!(cfg.validate(), Err(ReelError::Validation(_))),
            "{cfg:?} should be rejected"
        );
    }
}

#[test]
fn content_scale_is_bounded() {
    let base = ExportConfig::new(64, 64, Fps::Fps30, 1.0);
    let at_max = ExportConfig { content_scale: MAX_CONTENT_SCALE, ..base.clone() };
    assert!(at_max.validate().is_ok());

    for scale in [MAX_CONTENT_SCALE * 1.01, 1e9, f64::MAX] {
        let cfg = ExportConfig { content_scale: scale, ..base.clone() };
        assert!(
            matches!(cfg.validate(), Err(ReelError::Validation(_))),
            "content_scale {scale} should be rejected"
        );
    }
}

#[test]
fn total_frames_is_ceil_of_duration_times_fps() {
    let cfg = ExportConfig::new(8, 8, Fps::Fps30, 2.0);
    assert_eq!(cfg.total_frames(), 60);
    assert_eq!(cfg.total_chunks(), 2);

    let cfg = ExportConfig::new(8, 8, Fps::Fps30, 2.01);
    assert_eq!(cfg.total_frames(), 61);
    assert_eq!(cfg.total_chunks(), 3);

    // Float noise must not add a frame.
    let cfg = ExportConfig::new(8, 8, Fps::Fps30, 0.1);
    assert_eq!(cfg.total_frames(), 3);

    let cfg = ExportConfig::new(8, 8, Fps::Fps24, 0.01);
    assert_eq!(cfg.total_frames(), 1);
}

#[test]
fn codec_parameters() {
    assert_eq!(Codec::LosslessArgb.encoder_id(), "qtrle");
    assert_eq!(Codec::LosslessArgb.pix_fmt(), "argb");
    assert!(Codec::LosslessArgb.extra_args().is_empty());
    assert_eq!(Codec::ProRes4444.encoder_id(), "prores_ks");
    assert_eq!(Codec::ProRes4444.pix_fmt(), "yuva444p10le");
    assert!(Codec::ProRes4444.extra_args().contains(&"4444"));
}

#[test]
fn output_file_name_is_derived_from_config() {
    let mut cfg = ExportConfig::new(1280, 720, Fps::Fps60, 3.0);
    assert_eq!(cfg.output_file_name(), "alphareel_argb_1280x720_60fps.mov");
    cfg.codec = Codec::ProRes4444;
    assert_eq!(
        cfg.output_file_name(),
        "alphareel_prores4444_1280x720_60fps.mov"
    );
}

#[test]
fn from_path_reports_missing_file() {
    let err = ExportConfig::from_path("definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("definitely/not/here.json"));
}
