//! keyreel is a deterministic keyframe animation and frame-export pipeline.
//!
//! A scene is described by [`KeyframeTrack`]s composed into an [`AnimationTimeline`]. The same
//! timeline feeds two clocks:
//!
//! - [`LiveScheduler`]: wall-clock playback, one snapshot per external render tick
//! - [`ExportScheduler`]: frame-stepped export that waits for the renderer after every frame and
//!   captures it into an [`ExportSession`], so the artifact never depends on rendering speed
//!
//! Pixels come from an external [`Renderer`]; [`ControlSurface`] ties everything together for a
//! host application.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

pub(crate) mod adapter;
pub(crate) mod animation;
pub(crate) mod config;
pub(crate) mod controls;
/// Frame encoders and export formats.
pub mod encode;
/// Renderer boundary.
pub mod render;
/// Live and export clocks.
pub mod schedule;
/// Export session lifecycle.
pub mod session;

pub use crate::foundation::core::{FrameIndex, Resolution, Timecode};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::adapter::{
    CAMERA_TRACK_ID, LayerProps, PlaybackInfo, PlaybackMode, SceneAdapter, SceneFrame,
};
pub use crate::animation::ease::Ease;
pub use crate::animation::timeline::{AnimationTimeline, Snapshot};
pub use crate::animation::track::{Keyframe, KeyframeTrack};
pub use crate::animation::value::{Mix, PropValue, STEP_THRESHOLD};
pub use crate::config::{DEFAULT_RENDER_TIMEOUT_MS, ExportConfig};
pub use crate::controls::{ControlSurface, Tick};
pub use crate::encode::encoder::{
    Artifact, ArtifactMetadata, EncoderConfig, FrameEncoder, InMemoryEncoder, create_encoder,
};
pub use crate::encode::ffmpeg::{FfmpegEncoder, is_ffmpeg_on_path};
pub use crate::encode::format::{
    ArchiveMode, DEFAULT_QUALITY, ExportFormat, FormatConfig, FormatKind,
};
pub use crate::encode::gif::GifSequenceEncoder;
pub use crate::encode::image_seq::ImageSequenceEncoder;
pub use crate::render::backend::{FrameRGBA, RenderDone, Renderer};
pub use crate::schedule::export::{ExportPhase, ExportScheduler, FrameSampler, capture_plan};
pub use crate::schedule::live::{BoundaryMode, LiveScheduler, PlaybackState};
pub use crate::session::export_session::{
    ExportSession, ExportSlot, Progress, SessionHandle, SessionState,
};
