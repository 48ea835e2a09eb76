//! Control surface: the single entry point external controls and the render loop talk to.

use crate::adapter::{SceneAdapter, SceneFrame};
use crate::animation::timeline::AnimationTimeline;
use crate::animation::value::PropValue;
use crate::config::ExportConfig;
use crate::encode::encoder::{Artifact, FrameEncoder};
use crate::encode::format::ExportFormat;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::{RenderDone, Renderer};
use crate::schedule::export::{ExportPhase, ExportScheduler};
use crate::schedule::live::{LiveScheduler, PlaybackState};
use crate::session::export_session::{
    ExportSession, ExportSlot, Progress, SessionHandle, SessionState,
};
use std::sync::Arc;
use std::time::Duration;

/// What one [`ControlSurface::tick`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum Tick {
    /// Live playback rendered this frame.
    Live(SceneFrame),
    /// The active export was stepped and reached this phase.
    Export(ExportPhase),
}

struct ActiveExport {
    session: ExportSession,
    scheduler: ExportScheduler,
}

/// Routes render ticks to live playback or to the active export, and exposes the export
/// controls (start, cancel, busy, progress) plus the live camera override.
pub struct ControlSurface {
    timeline: Arc<AnimationTimeline>,
    config: ExportConfig,
    adapter: SceneAdapter,
    live: LiveScheduler,
    slot: ExportSlot,
    active: Option<ActiveExport>,
    finished: Option<ExportSession>,
}

impl ControlSurface {
    /// Surface over `timeline` with its own export slot.
    pub fn new(
        timeline: Arc<AnimationTimeline>,
        adapter: SceneAdapter,
        config: ExportConfig,
    ) -> ReelResult<Self> {
        Self::with_slot(timeline, adapter, config, ExportSlot::new())
    }

    /// Surface sharing `slot` (and therefore the busy flag) with other surfaces.
    pub fn with_slot(
        timeline: Arc<AnimationTimeline>,
        mut adapter: SceneAdapter,
        config: ExportConfig,
        slot: ExportSlot,
    ) -> ReelResult<Self> {
        config.validate()?;
        if timeline.timecode() != config.timecode {
            return Err(ReelError::config(
                "timeline timecode does not match the export configuration",
            ));
        }
        let live = LiveScheduler::new(&timeline, config.boundary);
        adapter.sync_camera(&timeline.snapshot_at(live.clock_ms()));
        Ok(Self {
            timeline,
            config,
            adapter,
            live,
            slot,
            active: None,
            finished: None,
        })
    }

    /// Timeline driven by this surface.
    pub fn timeline(&self) -> &Arc<AnimationTimeline> {
        &self.timeline
    }

    /// Scene adapter.
    pub fn adapter(&self) -> &SceneAdapter {
        &self.adapter
    }

    /// Live playback clock.
    pub fn live(&self) -> &LiveScheduler {
        &self.live
    }

    /// Start exporting `format` with the built-in encoder.
    pub fn start_export(&mut self, format: &str) -> ReelResult<SessionHandle> {
        let parsed = ExportFormat::parse(format)?;
        let cfg = self.config.format_config(parsed);
        let session = self.slot.start(
            self.timeline.clone(),
            format,
            self.config.resolution,
            &cfg,
        )?;
        Ok(self.activate(session))
    }

    /// Start exporting `format` into a caller-provided encoder.
    pub fn start_export_with_encoder(
        &mut self,
        format: &str,
        encoder: Box<dyn FrameEncoder>,
    ) -> ReelResult<SessionHandle> {
        let parsed = ExportFormat::parse(format)?;
        let cfg = self.config.format_config(parsed);
        let session = self.slot.start_with_encoder(
            self.timeline.clone(),
            format,
            self.config.resolution,
            &cfg,
            encoder,
        )?;
        Ok(self.activate(session))
    }

    fn activate(&mut self, session: ExportSession) -> SessionHandle {
        let scheduler = ExportScheduler::new(&session, self.config.render_timeout());
        let handle = session.handle();
        self.finished = None;
        self.active = Some(ActiveExport { session, scheduler });
        handle
    }

    /// Request cancellation of the active export, if any.
    pub fn cancel_export(&self) {
        if let Some(active) = &self.active {
            active.session.cancel();
        }
    }

    /// Interactive camera change for live playback.
    pub fn set_live_state(&mut self, partial: &PropValue) {
        self.adapter.set_current_state(partial);
    }

    /// Whether an export is running anywhere on this surface's slot.
    pub fn busy(&self) -> bool {
        self.slot.is_busy()
    }

    /// Progress of the active export, else of the last finished one.
    pub fn progress(&self) -> Option<Progress> {
        match (&self.active, &self.finished) {
            (Some(a), _) => Some(a.session.progress()),
            (None, Some(f)) => Some(f.progress()),
            (None, None) => None,
        }
    }

    /// State of the active export, else of the last finished one, else `Idle`.
    pub fn export_state(&self) -> SessionState {
        match (&self.active, &self.finished) {
            (Some(a), _) => a.session.state(),
            (None, Some(f)) => f.state(),
            (None, None) => SessionState::Idle,
        }
    }

    /// Last finished export session.
    pub fn last_export(&self) -> Option<&ExportSession> {
        self.finished.as_ref()
    }

    /// Start or resume live playback.
    pub fn play(&mut self) {
        self.live.play();
    }

    /// Pause live playback.
    pub fn pause(&mut self) {
        self.live.pause();
    }

    /// Stop live playback and rewind.
    pub fn stop(&mut self) {
        self.live.stop();
    }

    /// Move the live clock.
    pub fn seek(&mut self, t: f64) {
        self.live.seek(t);
    }

    /// One external render tick.
    ///
    /// With an active export the export is stepped by one frame and `elapsed` is ignored. An
    /// export error ends that export and is returned; the next tick is live again.
    pub fn tick(&mut self, elapsed: Duration, renderer: &mut dyn Renderer) -> ReelResult<Tick> {
        if let Some(active) = self.active.as_mut() {
            let res = active
                .scheduler
                .step(&mut active.session, &self.adapter, renderer);
            let terminal = match &res {
                Ok(phase) => phase.is_terminal(),
                Err(_) => true,
            };
            if terminal {
                self.retire();
            }
            return res.map(Tick::Export);
        }

        let snapshot = self.live.tick(&self.timeline, elapsed);
        let offset_ms = snapshot.time_ms - self.timeline.start_ms() as f64;
        let frame_idx = FrameIndex((offset_ms * self.timeline.framerate() / 1000.0).floor() as u64);
        let state = self.live.state();
        let frame = self
            .adapter
            .live_frame(snapshot, state, &self.timeline.timecode());
        let rendered = renderer.render(&frame, RenderDone::detached(frame_idx));
        // A pending override is shown once; playback owns the camera from the next tick.
        if state == PlaybackState::Playing {
            self.adapter.clear_override();
        }
        if let Err(e) = rendered {
            tracing::warn!(error = %e, "live render failed");
            return Err(e);
        }
        Ok(Tick::Live(frame))
    }

    /// Drive the active export to a terminal phase.
    pub fn run_export(&mut self, renderer: &mut dyn Renderer) -> ReelResult<ExportPhase> {
        let Some(active) = self.active.as_mut() else {
            return Err(ReelError::session("no export is running"));
        };
        let res = active
            .scheduler
            .run(&mut active.session, &self.adapter, renderer);
        self.retire();
        res
    }

    /// Move the finished artifact out of the last export.
    pub fn take_artifact(&mut self) -> Option<Artifact> {
        self.finished.as_mut().and_then(ExportSession::take_artifact)
    }

    fn retire(&mut self) {
        if let Some(active) = self.active.take() {
            self.finished = Some(active.session);
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/controls.rs"]
mod tests;
