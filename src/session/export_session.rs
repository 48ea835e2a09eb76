use crate::animation::timeline::AnimationTimeline;
use crate::encode::encoder::{Artifact, EncoderConfig, FrameEncoder, create_encoder};
use crate::encode::format::{ExportFormat, FormatConfig};
use crate::foundation::core::{FrameIndex, Resolution};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Lifecycle of an export session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum SessionState {
    /// No export running.
    #[default]
    Idle,
    /// Frames are being captured.
    Running,
    /// Cancel requested; observed at the next frame boundary.
    Cancelling,
    /// Artifact available.
    Completed,
    /// Stopped on request, output discarded.
    Cancelled,
    /// Aborted by an error, output discarded.
    Failed,
}

impl SessionState {
    /// `Completed`, `Cancelled` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Export progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Progress {
    /// Frame indices handled so far (captured or skipped by sampling).
    pub frames_done: u64,
    /// Frames in the timeline.
    pub frames_total: u64,
}

impl Progress {
    /// Completion in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.frames_total == 0 {
            return 0.0;
        }
        (self.frames_done as f64 / self.frames_total as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug)]
struct Shared {
    cancel: AtomicBool,
    frames_done: AtomicU64,
    frames_total: u64,
}

/// Cheap, clonable view of a running session for other owners or threads.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Request cooperative cancellation. Takes effect at the next frame boundary.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.shared.cancel.load(Ordering::Acquire)
    }

    /// Current progress.
    pub fn progress(&self) -> Progress {
        Progress {
            frames_done: self.shared.frames_done.load(Ordering::Acquire),
            frames_total: self.shared.frames_total,
        }
    }
}

/// Holds the busy flag while a session is live.
#[derive(Debug)]
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the "one export at a time" invariant.
///
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct ExportSlot {
    busy: Arc<AtomicBool>,
}

impl ExportSlot {
    /// An idle slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an export session is live.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start an export with the built-in encoder for `format`.
    pub fn start(
        &self,
        timeline: Arc<AnimationTimeline>,
        format: &str,
        resolution: Resolution,
        format_config: &FormatConfig,
    ) -> ReelResult<ExportSession> {
        let parsed = ExportFormat::parse(format)?;
        self.start_with_encoder(
            timeline,
            format,
            resolution,
            format_config,
            create_encoder(parsed),
        )
    }

    /// Start an export with a caller-provided encoder.
    ///
    /// Checks run in order: format name, configuration, busy flag, encoder init. An encoder that
    /// fails to initialize releases the slot again.
    pub fn start_with_encoder(
        &self,
        timeline: Arc<AnimationTimeline>,
        format: &str,
        resolution: Resolution,
        format_config: &FormatConfig,
        mut encoder: Box<dyn FrameEncoder>,
    ) -> ReelResult<ExportSession> {
        let format = ExportFormat::parse(format)?;
        resolution.validate()?;
        format_config.validate(format)?;

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(%format, "export rejected, another session is running");
            return Err(ReelError::Busy);
        }
        let guard = BusyGuard(self.busy.clone());

        let timecode = timeline.timecode();
        encoder.init(EncoderConfig {
            format,
            resolution,
            framerate: timecode.framerate,
            duration_ms: timecode.duration_ms(),
            format_config: format_config.clone(),
        })?;

        let frames_total = timeline.frame_count();
        tracing::info!(
            %format,
            width = resolution.width,
            height = resolution.height,
            frames = frames_total,
            "export started"
        );
        Ok(ExportSession {
            format,
            resolution,
            format_config: format_config.clone(),
            timeline,
            state: SessionState::Running,
            current_frame_index: FrameIndex(0),
            frames_captured: 0,
            encoder,
            artifact: None,
            last_error: None,
            shared: Arc::new(Shared {
                cancel: AtomicBool::new(false),
                frames_done: AtomicU64::new(0),
                frames_total,
            }),
            busy: Some(guard),
        })
    }
}

/// One export: encoder, progress and the resulting artifact.
///
/// Created through [`ExportSlot::start`] and driven by
/// [`ExportScheduler`](crate::ExportScheduler). Once terminal it only holds the outcome.
pub struct ExportSession {
    format: ExportFormat,
    resolution: Resolution,
    format_config: FormatConfig,
    timeline: Arc<AnimationTimeline>,
    state: SessionState,
    current_frame_index: FrameIndex,
    frames_captured: u64,
    encoder: Box<dyn FrameEncoder>,
    artifact: Option<Artifact>,
    last_error: Option<String>,
    shared: Arc<Shared>,
    busy: Option<BusyGuard>,
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("format", &self.format)
            .field("resolution", &self.resolution)
            .field("state", &self.state())
            .field("current_frame_index", &self.current_frame_index)
            .field("frames_captured", &self.frames_captured)
            .finish_non_exhaustive()
    }
}

impl ExportSession {
    /// Export format.
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Output resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Validated format options.
    pub fn format_config(&self) -> &FormatConfig {
        &self.format_config
    }

    /// Timeline being exported.
    pub fn timeline(&self) -> &Arc<AnimationTimeline> {
        &self.timeline
    }

    /// Lifecycle state. A running session with a pending cancel reports `Cancelling`.
    pub fn state(&self) -> SessionState {
        if self.state == SessionState::Running && self.shared.cancel.load(Ordering::Acquire) {
            return SessionState::Cancelling;
        }
        self.state
    }

    /// Next frame index to handle.
    pub fn current_frame_index(&self) -> FrameIndex {
        self.current_frame_index
    }

    /// Frames in the timeline.
    pub fn frame_count(&self) -> u64 {
        self.shared.frames_total
    }

    /// Frames appended to the encoder so far.
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    /// Clonable cancel / progress handle.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: self.shared.clone(),
        }
    }

    /// Current progress.
    pub fn progress(&self) -> Progress {
        self.handle().progress()
    }

    /// Request cancellation (same as [`SessionHandle::cancel`]).
    pub fn cancel(&self) {
        if self.state == SessionState::Running {
            self.shared.cancel.store(true, Ordering::Release);
        }
    }

    /// Message of the error that failed the session.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Finished artifact, once `Completed`.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Move the finished artifact out.
    pub fn take_artifact(&mut self) -> Option<Artifact> {
        self.artifact.take()
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.state() == SessionState::Cancelling
    }

    fn ensure_running(&self, what: &str) -> ReelResult<()> {
        if self.state != SessionState::Running {
            return Err(ReelError::session(format!(
                "cannot {what} in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    /// Append a rendered frame to the encoder.
    pub(crate) fn capture(&mut self, frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()> {
        self.ensure_running("capture")?;
        self.encoder
            .append_frame(frame, idx)
            .map_err(|e| encoding_at(idx, e))?;
        self.frames_captured += 1;
        Ok(())
    }

    /// Record that every index before `next` has been handled.
    pub(crate) fn advance(&mut self, next: FrameIndex) {
        self.current_frame_index = next;
        self.shared
            .frames_done
            .store(next.0.min(self.shared.frames_total), Ordering::Release);
    }

    /// Finalize the encoder and store the artifact.
    pub(crate) fn finish(&mut self) -> ReelResult<()> {
        self.ensure_running("finish")?;
        match self.encoder.finalize() {
            Ok(artifact) => {
                tracing::info!(
                    format = %self.format,
                    frames = artifact.metadata.frame_count,
                    bytes = artifact.bytes.len(),
                    "export completed"
                );
                self.artifact = Some(artifact);
                self.state = SessionState::Completed;
                self.busy = None;
                Ok(())
            }
            Err(e) => {
                let e = encoding_at(self.current_frame_index, e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Stop at the current frame boundary and discard captured output.
    pub(crate) fn mark_cancelled(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.encoder.abort();
        self.state = SessionState::Cancelled;
        self.busy = None;
        tracing::info!(
            format = %self.format,
            frame = self.current_frame_index.0,
            "export cancelled"
        );
    }

    /// Abort with `err`, discarding captured output.
    pub(crate) fn fail(&mut self, err: &ReelError) {
        if self.state.is_terminal() {
            return;
        }
        self.encoder.abort();
        self.state = SessionState::Failed;
        self.last_error = Some(err.to_string());
        self.busy = None;
        tracing::warn!(
            format = %self.format,
            frame = self.current_frame_index.0,
            error = %err,
            "export failed"
        );
    }
}

/// Encoder failures always surface as `Encoding`, whatever the encoder reported.
fn encoding_at(idx: FrameIndex, err: ReelError) -> ReelError {
    match err {
        ReelError::Encoding { .. } => err,
        other => ReelError::encoding(idx.0, other.to_string()),
    }
}

impl Drop for ExportSession {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.encoder.abort();
            tracing::debug!(format = %self.format, "live export session dropped");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/export_session.rs"]
mod tests;
