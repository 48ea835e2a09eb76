use super::*;

fn cfg() -> EncoderConfig {
    EncoderConfig {
        format: ExportFormat::Png,
        resolution: Resolution::new(2, 2).unwrap(),
        framerate: 30.0,
        duration_ms: 1000,
        format_config: FormatConfig::default(),
    }
}

#[test]
fn in_memory_encoder_collects_frames_in_order() {
    let mut enc = InMemoryEncoder::new();
    enc.init(cfg()).unwrap();
    enc.append_frame(&FrameRGBA::solid(2, 2, [1, 2, 3, 255]), FrameIndex(0))
        .unwrap();
    enc.append_frame(&FrameRGBA::solid(2, 2, [4, 5, 6, 255]), FrameIndex(3))
        .unwrap();

    let artifact = enc.finalize().unwrap();
    assert_eq!(artifact.metadata.frame_count, 2);
    assert_eq!(artifact.metadata.duration_ms, 1000);
    assert_eq!(artifact.bytes.len(), 2 * 2 * 2 * 4);
    assert_eq!(enc.frames()[1].0, FrameIndex(3));
}

#[test]
fn out_of_order_frames_are_encoding_errors() {
    let mut enc = InMemoryEncoder::new();
    enc.init(cfg()).unwrap();
    let f = FrameRGBA::solid(2, 2, [0, 0, 0, 255]);
    enc.append_frame(&f, FrameIndex(5)).unwrap();
    match enc.append_frame(&f, FrameIndex(5)) {
        Err(ReelError::Encoding { frame, .. }) => assert_eq!(frame, 5),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn wrong_frame_size_is_an_encoding_error() {
    let mut enc = InMemoryEncoder::new();
    enc.init(cfg()).unwrap();
    let err = enc
        .append_frame(&FrameRGBA::solid(3, 2, [0, 0, 0, 255]), FrameIndex(1))
        .unwrap_err();
    assert!(matches!(err, ReelError::Encoding { frame: 1, .. }));
}

#[test]
fn append_before_init_fails() {
    let mut enc = InMemoryEncoder::new();
    let err = enc
        .append_frame(&FrameRGBA::solid(2, 2, [0, 0, 0, 255]), FrameIndex(0))
        .unwrap_err();
    assert!(matches!(err, ReelError::Encoding { frame: 0, .. }));
}

#[test]
fn create_encoder_covers_every_format() {
    for f in ExportFormat::all() {
        let _enc = create_encoder(f);
    }
}
