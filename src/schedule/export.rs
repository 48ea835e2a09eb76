use crate::adapter::SceneAdapter;
use crate::encode::format::{ExportFormat, FormatConfig};
use crate::foundation::core::{FrameIndex, Timecode};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::{RenderDone, Renderer};
use crate::session::export_session::ExportSession;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Slack when comparing a frame time with the next sample time.
const SAMPLE_EPS_MS: f64 = 1e-6;

/// Stepped export phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum ExportPhase {
    /// Nothing stepped yet.
    #[default]
    Idle,
    /// Renderer is drawing the current frame.
    AwaitingRender,
    /// Reading the frame buffer and encoding it.
    Capturing,
    /// Frame handled; the next step moves to the following index.
    Advancing,
    /// Artifact finalized.
    Done,
    /// Stopped at a frame boundary on request.
    Cancelled,
    /// Aborted by a render or encoding error.
    Failed,
}

impl ExportPhase {
    /// `Done`, `Cancelled` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }
}

/// Decides which frames a sparse format captures.
///
/// Without an interval every frame is captured. With one, a frame is captured as soon as its time
/// reaches the next sample time (`start`, `start + interval`, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSampler {
    interval_ms: Option<f64>,
    next_sample_ms: f64,
}

impl FrameSampler {
    /// Sampler starting at `start_ms`.
    pub fn new(start_ms: f64, interval_ms: Option<u64>) -> Self {
        Self {
            interval_ms: interval_ms.map(|i| i as f64),
            next_sample_ms: start_ms,
        }
    }

    /// Whether the frame at `t` is captured. Must be called with increasing `t`.
    pub fn should_capture(&mut self, t: f64) -> bool {
        let Some(interval) = self.interval_ms else {
            return true;
        };
        if t + SAMPLE_EPS_MS < self.next_sample_ms {
            return false;
        }
        while self.next_sample_ms <= t + SAMPLE_EPS_MS {
            self.next_sample_ms += interval;
        }
        true
    }
}

/// Frames a format would capture over `timecode`, as `(index, time_ms)`.
pub fn capture_plan(
    timecode: &Timecode,
    format: ExportFormat,
    cfg: &FormatConfig,
) -> ReelResult<Vec<(FrameIndex, f64)>> {
    timecode.validate()?;
    cfg.validate(format)?;
    let mut sampler = FrameSampler::new(timecode.start as f64, cfg.sample_interval);
    Ok((0..timecode.frame_count())
        .map(|i| {
            let idx = FrameIndex(i);
            (idx, timecode.frame_time_ms(idx))
        })
        .filter(|&(_, t)| sampler.should_capture(t))
        .collect())
}

/// Deterministic, frame-stepped export driver.
///
/// Each [`ExportScheduler::step`] handles exactly one frame index: it evaluates the timeline at
/// `frame_time_for(i)`, hands the frame to the renderer, blocks until the renderer signals
/// completion (the only suspension point), then captures it into the session. Wall-clock time
/// never influences which timestamps are exported.
#[derive(Debug)]
pub struct ExportScheduler {
    frame_index: FrameIndex,
    phase: ExportPhase,
    render_timeout: Duration,
    tx: mpsc::Sender<FrameIndex>,
    rx: mpsc::Receiver<FrameIndex>,
    sampler: FrameSampler,
}

impl ExportScheduler {
    /// Scheduler for `session`, waiting at most `render_timeout` per frame.
    pub fn new(session: &ExportSession, render_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            frame_index: session.current_frame_index(),
            phase: ExportPhase::Idle,
            render_timeout,
            tx,
            rx,
            sampler: FrameSampler::new(
                session.timeline().start_ms() as f64,
                session.format_config().sample_interval,
            ),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    /// Next frame to handle.
    pub fn frame_index(&self) -> FrameIndex {
        self.frame_index
    }

    /// Per-frame render wait.
    pub fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    /// Handle one frame.
    ///
    /// Returns the phase reached: `Advancing` while frames remain, otherwise a terminal phase.
    /// Render and encoding failures move the session to `Failed` and are returned as errors.
    #[tracing::instrument(skip_all, fields(frame = self.frame_index.0))]
    pub fn step(
        &mut self,
        session: &mut ExportSession,
        adapter: &SceneAdapter,
        renderer: &mut dyn Renderer,
    ) -> ReelResult<ExportPhase> {
        if self.phase.is_terminal() {
            return Err(ReelError::session(format!(
                "export already finished ({:?})",
                self.phase
            )));
        }

        // Frame boundary: the only place cancellation is observed.
        if session.cancel_requested() {
            session.mark_cancelled();
            self.phase = ExportPhase::Cancelled;
            return Ok(self.phase);
        }

        let idx = self.frame_index;
        let frame_count = session.frame_count();
        if idx.0 >= frame_count {
            return self.finish(session);
        }

        let timeline = session.timeline().clone();
        let t = timeline.frame_time_for(idx);
        if self.sampler.should_capture(t) {
            self.phase = ExportPhase::AwaitingRender;
            // Drop completions left over from an earlier, timed-out frame.
            while self.rx.try_recv().is_ok() {}

            let frame = adapter.export_frame(timeline.snapshot_at(t), idx, frame_count);
            let done = RenderDone::new(self.tx.clone(), idx);
            if let Err(e) = renderer.render(&frame, done) {
                return self.fail(session, e);
            }
            if let Err(e) = self.wait_for_render(idx) {
                return self.fail(session, e);
            }

            self.phase = ExportPhase::Capturing;
            let captured = renderer
                .read_frame_buffer()
                .and_then(|buf| session.capture(&buf, idx));
            if let Err(e) = captured {
                return self.fail(session, e);
            }
            tracing::trace!(time_ms = t, "frame captured");
        } else {
            tracing::trace!(time_ms = t, "frame skipped by sampler");
        }

        self.phase = ExportPhase::Advancing;
        self.frame_index = idx.next();
        session.advance(self.frame_index);
        if self.frame_index.0 >= frame_count {
            // End of the timeline is a frame boundary too.
            if session.cancel_requested() {
                session.mark_cancelled();
                self.phase = ExportPhase::Cancelled;
                return Ok(self.phase);
            }
            return self.finish(session);
        }
        Ok(self.phase)
    }

    /// Step until a terminal phase. Returns `Done` or `Cancelled`; failures are errors.
    pub fn run(
        &mut self,
        session: &mut ExportSession,
        adapter: &SceneAdapter,
        renderer: &mut dyn Renderer,
    ) -> ReelResult<ExportPhase> {
        loop {
            let phase = self.step(session, adapter, renderer)?;
            if phase.is_terminal() {
                return Ok(phase);
            }
        }
    }

    fn wait_for_render(&self, idx: FrameIndex) -> ReelResult<()> {
        let deadline = Instant::now() + self.render_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(done) if done == idx => return Ok(()),
                Ok(stale) => {
                    tracing::debug!(stale = stale.0, "ignoring stale render-complete signal");
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ReelError::RenderTimeout {
                        frame: idx.0,
                        timeout_ms: u64::try_from(self.render_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ReelError::render("render-complete channel closed"));
                }
            }
        }
    }

    fn finish(&mut self, session: &mut ExportSession) -> ReelResult<ExportPhase> {
        match session.finish() {
            Ok(()) => {
                self.phase = ExportPhase::Done;
                Ok(self.phase)
            }
            Err(e) => {
                self.phase = ExportPhase::Failed;
                Err(e)
            }
        }
    }

    fn fail(&mut self, session: &mut ExportSession, err: ReelError) -> ReelResult<ExportPhase> {
        session.fail(&err);
        self.phase = ExportPhase::Failed;
        Err(err)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/export.rs"]
mod tests;
