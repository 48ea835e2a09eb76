use super::*;
use crate::animation::ease::Ease;
use crate::animation::track::KeyframeTrack;
use crate::animation::value::PropValue;
use crate::encode::encoder::InMemoryEncoder;
use crate::foundation::core::Timecode;

fn timeline() -> Arc<AnimationTimeline> {
    let t = KeyframeTrack::new(
        "x",
        vec![0, 1000],
        vec![PropValue::Number(0.0), PropValue::Number(1.0)],
        Ease::Linear,
    )
    .unwrap();
    Arc::new(AnimationTimeline::new(Timecode::new(0, 1000, 10.0).unwrap(), vec![t]).unwrap())
}

fn res() -> Resolution {
    Resolution::new(2, 2).unwrap()
}

fn start(slot: &ExportSlot) -> ExportSession {
    slot.start_with_encoder(
        timeline(),
        "png",
        res(),
        &FormatConfig::default(),
        Box::new(InMemoryEncoder::new()),
    )
    .unwrap()
}

/// Accepts `init` only.
struct RefusingEncoder {
    fail_init: bool,
}

impl FrameEncoder for RefusingEncoder {
    fn init(&mut self, _cfg: EncoderConfig) -> ReelResult<()> {
        if self.fail_init {
            return Err(ReelError::encoding(0, "no codec"));
        }
        Ok(())
    }

    fn append_frame(&mut self, _frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()> {
        Err(ReelError::encoding(idx.0, "disk full"))
    }

    fn finalize(&mut self) -> ReelResult<Artifact> {
        Err(ReelError::encoding(0, "nothing to finalize"))
    }
}

#[test]
fn start_checks_format_then_config_then_busy() {
    let slot = ExportSlot::new();
    let first = start(&slot);
    assert!(slot.is_busy());

    // Unknown format wins over busy.
    let err = slot
        .start(timeline(), "avi", res(), &FormatConfig::default())
        .unwrap_err();
    assert!(matches!(err, ReelError::UnsupportedFormat(_)));

    // Invalid configuration wins over busy.
    let bad = FormatConfig {
        quality: Some(1.5),
        ..FormatConfig::default()
    };
    let err = slot.start(timeline(), "jpeg", res(), &bad).unwrap_err();
    assert!(matches!(err, ReelError::Config(_)));

    let err = slot
        .start(timeline(), "png", res(), &FormatConfig::default())
        .unwrap_err();
    assert!(matches!(err, ReelError::Busy));

    // The running session is untouched.
    assert_eq!(first.state(), SessionState::Running);
    assert_eq!(first.current_frame_index(), FrameIndex(0));
    drop(first);
    assert!(!slot.is_busy());
}

#[test]
fn failed_encoder_init_releases_the_slot() {
    let slot = ExportSlot::new();
    let err = slot
        .start_with_encoder(
            timeline(),
            "png",
            res(),
            &FormatConfig::default(),
            Box::new(RefusingEncoder { fail_init: true }),
        )
        .unwrap_err();
    assert!(matches!(err, ReelError::Encoding { frame: 0, .. }));
    assert!(!slot.is_busy());
    let _ok = start(&slot);
}

#[test]
fn capture_advance_finish_produces_artifact() {
    let slot = ExportSlot::new();
    let mut s = start(&slot);
    assert_eq!(s.frame_count(), 11);

    let frame = FrameRGBA::solid(2, 2, [9, 9, 9, 255]);
    for i in 0..11 {
        s.capture(&frame, FrameIndex(i)).unwrap();
        s.advance(FrameIndex(i + 1));
    }
    assert_eq!(s.progress().fraction(), 1.0);
    s.finish().unwrap();

    assert_eq!(s.state(), SessionState::Completed);
    assert!(!slot.is_busy());
    let artifact = s.take_artifact().unwrap();
    assert_eq!(artifact.metadata.frame_count, 11);
    assert_eq!(artifact.metadata.duration_ms, 1000);
    assert!(s.artifact().is_none());
}

#[test]
fn encoder_error_is_reported_but_failing_is_explicit() {
    let slot = ExportSlot::new();
    let mut s = slot
        .start_with_encoder(
            timeline(),
            "png",
            res(),
            &FormatConfig::default(),
            Box::new(RefusingEncoder { fail_init: false }),
        )
        .unwrap();
    let err = s
        .capture(&FrameRGBA::solid(2, 2, [0, 0, 0, 255]), FrameIndex(3))
        .unwrap_err();
    assert!(matches!(err, ReelError::Encoding { frame: 3, .. }));

    s.fail(&err);
    assert_eq!(s.state(), SessionState::Failed);
    assert!(s.last_error().unwrap().contains("disk full"));
    assert!(!slot.is_busy());

    // Terminal sessions reject further work.
    let again = s.capture(&FrameRGBA::solid(2, 2, [0, 0, 0, 255]), FrameIndex(4));
    assert!(matches!(again, Err(ReelError::Session(_))));
}

/// Fails at one frame and on finalize with errors that are not `Encoding`.
struct OpaqueEncoder {
    fail_at: FrameIndex,
}

impl FrameEncoder for OpaqueEncoder {
    fn init(&mut self, _cfg: EncoderConfig) -> ReelResult<()> {
        Ok(())
    }

    fn append_frame(&mut self, _frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()> {
        if idx == self.fail_at {
            return Err(anyhow::anyhow!("disk full").into());
        }
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<Artifact> {
        Err(ReelError::render("muxer went away"))
    }
}

fn start_opaque(slot: &ExportSlot, fail_at: u64) -> ExportSession {
    slot.start_with_encoder(
        timeline(),
        "png",
        res(),
        &FormatConfig::default(),
        Box::new(OpaqueEncoder {
            fail_at: FrameIndex(fail_at),
        }),
    )
    .unwrap()
}

#[test]
fn foreign_encoder_errors_surface_as_encoding_at_the_frame() {
    let slot = ExportSlot::new();
    let mut s = start_opaque(&slot, 3);
    let frame = FrameRGBA::solid(2, 2, [0, 0, 0, 255]);
    for i in 0..3 {
        s.capture(&frame, FrameIndex(i)).unwrap();
    }
    let err = s.capture(&frame, FrameIndex(3)).unwrap_err();
    match err {
        ReelError::Encoding { frame, message } => {
            assert_eq!(frame, 3);
            assert!(message.contains("disk full"));
        }
        other => panic!("expected an encoding error, got {other:?}"),
    }
}

#[test]
fn foreign_finalize_errors_fail_with_encoding() {
    let slot = ExportSlot::new();
    let mut s = start_opaque(&slot, u64::MAX);
    s.advance(FrameIndex(11));
    let err = s.finish().unwrap_err();
    assert!(matches!(err, ReelError::Encoding { frame: 11, .. }));
    assert_eq!(s.state(), SessionState::Failed);
    assert!(s.last_error().unwrap().contains("muxer went away"));
    assert!(!slot.is_busy());
}

#[test]
fn handle_cancels_and_reports_progress_across_threads() {
    let slot = ExportSlot::new();
    let mut s = start(&slot);
    let handle = s.handle();
    s.advance(FrameIndex(5));

    let remote = handle.clone();
    let seen = std::thread::spawn(move || {
        let p = remote.progress();
        remote.cancel();
        p
    })
    .join()
    .unwrap();
    assert_eq!(
        seen,
        Progress {
            frames_done: 5,
            frames_total: 11
        }
    );
    assert!(handle.is_cancel_requested());
    assert_eq!(s.state(), SessionState::Cancelling);

    s.mark_cancelled();
    assert_eq!(s.state(), SessionState::Cancelled);
    assert!(s.artifact().is_none());
    assert!(!slot.is_busy());
}

#[test]
fn cancel_after_completion_is_a_no_op() {
    let slot = ExportSlot::new();
    let mut s = start(&slot);
    for i in 0..11 {
        s.capture(&FrameRGBA::solid(2, 2, [0, 0, 0, 255]), FrameIndex(i))
            .unwrap();
    }
    s.finish().unwrap();
    s.cancel();
    s.handle().cancel();
    assert_eq!(s.state(), SessionState::Completed);
    assert!(s.artifact().is_some());
}

#[test]
fn progress_fraction_handles_empty_totals() {
    assert_eq!(Progress::default().fraction(), 0.0);
    let half = Progress {
        frames_done: 3,
        frames_total: 6,
    };
    assert_eq!(half.fraction(), 0.5);
}
