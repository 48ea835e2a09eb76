use super::*;
use crate::adapter::CAMERA_TRACK_ID;
use crate::animation::ease::Ease;
use crate::animation::track::KeyframeTrack;
use crate::encode::encoder::InMemoryEncoder;
use crate::foundation::core::{Resolution, Timecode};
use crate::render::backend::FrameRGBA;

fn surface() -> ControlSurface {
    let tc = Timecode::new(0, 1000, 10.0).unwrap();
    let camera = KeyframeTrack::new(
        CAMERA_TRACK_ID,
        vec![0, 1000],
        vec![
            PropValue::record([("bearing", 100.0)]),
            PropValue::record([("bearing", 0.0)]),
        ],
        Ease::Linear,
    )
    .unwrap();
    let timeline = Arc::new(AnimationTimeline::new(tc, vec![camera]).unwrap());
    let config = ExportConfig::new(tc, Resolution::new(2, 2).unwrap());
    ControlSurface::new(
        timeline,
        SceneAdapter::new(PropValue::record([("zoom", 4.0)])),
        config,
    )
    .unwrap()
}

#[derive(Default)]
struct Recorder {
    frames: Vec<SceneFrame>,
}

impl Renderer for Recorder {
    fn render(&mut self, frame: &SceneFrame, done: RenderDone) -> ReelResult<()> {
        self.frames.push(frame.clone());
        done.notify();
        Ok(())
    }

    fn read_frame_buffer(&mut self) -> ReelResult<FrameRGBA> {
        Ok(FrameRGBA::solid(2, 2, [1, 2, 3, 255]))
    }
}

#[test]
fn ticks_drive_live_playback_without_an_export() {
    let mut s = surface();
    let mut r = Recorder::default();
    s.play();
    let tick = s.tick(Duration::from_millis(500), &mut r).unwrap();
    let Tick::Live(frame) = tick else {
        panic!("expected a live tick");
    };
    assert_eq!(frame.snapshot.time_ms, 500.0);
    assert_eq!(frame.camera.get_f64("bearing"), Some(50.0));
    assert_eq!(frame.camera.get_f64("zoom"), Some(4.0));
    assert_eq!(s.export_state(), SessionState::Idle);
}

#[test]
fn live_override_holds_while_paused_and_yields_to_playback() {
    let mut s = surface();
    let mut r = Recorder::default();
    s.tick(Duration::ZERO, &mut r).unwrap();
    s.set_live_state(&PropValue::record([("bearing", 7.0)]));

    let Tick::Live(pinned) = s.tick(Duration::ZERO, &mut r).unwrap() else {
        panic!("expected a live tick");
    };
    assert_eq!(pinned.camera.get_f64("bearing"), Some(7.0));

    s.play();
    let Tick::Live(shown) = s.tick(Duration::from_millis(100), &mut r).unwrap() else {
        panic!("expected a live tick");
    };
    assert_eq!(shown.camera.get_f64("bearing"), Some(7.0));
    assert!(s.adapter().camera_override().is_none());

    let Tick::Live(playing) = s.tick(Duration::from_millis(100), &mut r).unwrap() else {
        panic!("expected a live tick");
    };
    assert_eq!(playing.camera.get_f64("bearing"), Some(80.0));
}

#[test]
fn override_set_between_playing_ticks_is_rendered_once() {
    let mut s = surface();
    let mut r = Recorder::default();
    s.play();
    s.tick(Duration::from_millis(100), &mut r).unwrap();
    s.set_live_state(&PropValue::record([("bearing", 33.0)]));

    let Tick::Live(frame) = s.tick(Duration::from_millis(100), &mut r).unwrap() else {
        panic!("expected a live tick");
    };
    assert_eq!(frame.camera.get_f64("bearing"), Some(33.0));
    assert_eq!(r.frames.last().unwrap().camera.get_f64("bearing"), Some(33.0));
}

#[test]
fn override_before_first_frame_builds_on_the_animated_camera() {
    let mut s = surface();
    let mut r = Recorder::default();
    s.set_live_state(&PropValue::record([("pitch", 5.0)]));

    let Tick::Live(frame) = s.tick(Duration::ZERO, &mut r).unwrap() else {
        panic!("expected a live tick");
    };
    assert_eq!(frame.camera.get_f64("bearing"), Some(100.0));
    assert_eq!(frame.camera.get_f64("pitch"), Some(5.0));
    assert_eq!(frame.camera.get_f64("zoom"), Some(4.0));
}

#[test]
fn ticks_step_the_active_export_then_return_to_live() {
    let mut s = surface();
    let mut r = Recorder::default();
    s.start_export_with_encoder("png", Box::new(InMemoryEncoder::new()))
        .unwrap();
    assert!(s.busy());
    assert_eq!(s.export_state(), SessionState::Running);

    let mut phases = Vec::new();
    for _ in 0..11 {
        match s.tick(Duration::from_secs(60), &mut r).unwrap() {
            Tick::Export(phase) => phases.push(phase),
            Tick::Live(_) => panic!("export still running"),
        }
    }
    assert_eq!(phases.last(), Some(&ExportPhase::Done));
    assert!(!s.busy());
    assert_eq!(s.export_state(), SessionState::Completed);

    // Export frames are evenly spaced regardless of the elapsed time reported.
    let times: Vec<f64> = r.frames.iter().map(|f| f.playback.time_ms).collect();
    let expected: Vec<f64> = (0..11).map(|i| f64::from(i) * 100.0).collect();
    assert_eq!(times, expected);

    let done = s.progress().unwrap();
    assert_eq!((done.frames_done, done.frames_total), (11, 11));

    let artifact = s.take_artifact().unwrap();
    assert_eq!(artifact.metadata.frame_count, 11);
    assert!(s.take_artifact().is_none());
    assert!(matches!(s.tick(Duration::ZERO, &mut r).unwrap(), Tick::Live(_)));
}

#[test]
fn second_export_is_rejected_while_busy() {
    let mut s = surface();
    s.start_export_with_encoder("png", Box::new(InMemoryEncoder::new()))
        .unwrap();
    let err = s.start_export("gif").unwrap_err();
    assert!(matches!(err, ReelError::Busy));
    assert_eq!(s.export_state(), SessionState::Running);
    assert_eq!(s.progress().unwrap().frames_done, 0);
}

#[test]
fn unknown_format_is_rejected_before_anything_starts() {
    let mut s = surface();
    assert!(matches!(
        s.start_export("flv"),
        Err(ReelError::UnsupportedFormat(_))
    ));
    assert!(!s.busy());
}

#[test]
fn cancel_export_discards_output() {
    let mut s = surface();
    let mut r = Recorder::default();
    s.start_export_with_encoder("png", Box::new(InMemoryEncoder::new()))
        .unwrap();
    s.tick(Duration::ZERO, &mut r).unwrap();
    s.cancel_export();
    assert_eq!(s.export_state(), SessionState::Cancelling);

    let tick = s.tick(Duration::ZERO, &mut r).unwrap();
    assert_eq!(tick, Tick::Export(ExportPhase::Cancelled));
    assert_eq!(s.export_state(), SessionState::Cancelled);
    assert!(s.take_artifact().is_none());
    assert!(!s.busy());
}

#[test]
fn run_export_needs_an_active_export() {
    let mut s = surface();
    let mut r = Recorder::default();
    assert!(matches!(
        s.run_export(&mut r),
        Err(ReelError::Session(_))
    ));
    s.start_export_with_encoder("png", Box::new(InMemoryEncoder::new()))
        .unwrap();
    assert_eq!(s.run_export(&mut r).unwrap(), ExportPhase::Done);
    assert_eq!(s.last_export().unwrap().frames_captured(), 11);
}

#[test]
fn mismatched_timecode_is_rejected() {
    let tl = Arc::new(AnimationTimeline::new(Timecode::new(0, 10, 1.0).unwrap(), vec![]).unwrap());
    let cfg = ExportConfig::new(
        Timecode::new(0, 20, 1.0).unwrap(),
        Resolution::new(2, 2).unwrap(),
    );
    let err = ControlSurface::new(tl, SceneAdapter::new(PropValue::Bool(false)), cfg);
    assert!(matches!(err, Err(ReelError::Config(_))));
}

#[test]
fn surfaces_sharing_a_slot_share_the_busy_flag() {
    let slot = ExportSlot::new();
    let tc = Timecode::new(0, 100, 10.0).unwrap();
    let make = || {
        ControlSurface::with_slot(
            Arc::new(AnimationTimeline::new(tc, vec![]).unwrap()),
            SceneAdapter::new(PropValue::Bool(true)),
            ExportConfig::new(tc, Resolution::new(2, 2).unwrap()),
            slot.clone(),
        )
        .unwrap()
    };
    let mut a = make();
    let mut b = make();
    a.start_export_with_encoder("png", Box::new(InMemoryEncoder::new()))
        .unwrap();
    assert!(b.busy());
    assert!(matches!(
        b.start_export_with_encoder("png", Box::new(InMemoryEncoder::new())),
        Err(ReelError::Busy)
    ));
}
