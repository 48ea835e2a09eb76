//! Translation between timeline snapshots and what the external renderer / controls consume.

use crate::animation::timeline::Snapshot;
use crate::animation::value::PropValue;
use crate::foundation::core::{FrameIndex, Timecode};
use crate::schedule::live::PlaybackState;

/// Track id whose values drive the camera.
pub const CAMERA_TRACK_ID: &str = "camera";

/// Base properties of one scene layer, before keyframes are applied.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LayerProps {
    /// Layer id; a track with the same id animates it.
    pub id: String,
    /// Layer properties (normally a record).
    pub props: PropValue,
}

/// Which clock produced a frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum PlaybackMode {
    /// Wall-clock playback.
    Live(PlaybackState),
    /// Stepped export.
    Export {
        /// Frame being exported.
        frame: FrameIndex,
        /// Total frames in the export.
        frame_count: u64,
    },
}

/// Playback metadata for the control surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PlaybackInfo {
    /// Clock mode.
    pub mode: PlaybackMode,
    /// Timestamp of the frame, in milliseconds.
    pub time_ms: f64,
    /// Position within the timeline in `[0, 1]`.
    pub progress: f64,
}

/// Everything the renderer needs to draw one frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneFrame {
    /// Camera (view) state.
    pub camera: PropValue,
    /// Layers with keyframed properties applied, in declaration order.
    pub layers: Vec<LayerProps>,
    /// Raw snapshot the frame was built from.
    pub snapshot: Snapshot,
    /// Playback metadata.
    pub playback: PlaybackInfo,
}

/// Builds [`SceneFrame`]s from snapshots.
///
/// The only state is the interactive camera override: [`SceneAdapter::set_current_state`] pins
/// the live camera until a playing tick has shown it once (last write wins). Export frames never
/// see the override.
#[derive(Clone, Debug)]
pub struct SceneAdapter {
    initial_camera: PropValue,
    layers: Vec<LayerProps>,
    last_camera: PropValue,
    camera_override: Option<PropValue>,
}

impl SceneAdapter {
    /// Adapter with an initial camera (view) state and no layers.
    pub fn new(initial_camera: PropValue) -> Self {
        Self {
            last_camera: initial_camera.clone(),
            initial_camera,
            layers: Vec::new(),
            camera_override: None,
        }
    }

    /// Add a base layer.
    pub fn with_layer(mut self, id: impl Into<String>, props: PropValue) -> Self {
        self.layers.push(LayerProps {
            id: id.into(),
            props,
        });
        self
    }

    /// Base layers.
    pub fn layers(&self) -> &[LayerProps] {
        &self.layers
    }

    /// Initial camera merged with the camera track value, if any.
    pub fn camera_for(&self, snapshot: &Snapshot) -> PropValue {
        match snapshot.get(CAMERA_TRACK_ID) {
            Some(cam) => self.initial_camera.merged_with(cam),
            None => self.initial_camera.clone(),
        }
    }

    /// Spread keyframed values onto base layers by id.
    pub fn apply_layer_keyframes(&self, snapshot: &Snapshot) -> Vec<LayerProps> {
        self.layers
            .iter()
            .map(|layer| LayerProps {
                id: layer.id.clone(),
                props: match snapshot.get(&layer.id) {
                    Some(v) => layer.props.merged_with(v),
                    None => layer.props.clone(),
                },
            })
            .collect()
    }

    /// Frame for live playback. A pending camera override wins over the snapshot camera.
    pub fn live_frame(
        &mut self,
        snapshot: Snapshot,
        state: PlaybackState,
        timecode: &Timecode,
    ) -> SceneFrame {
        let camera = match &self.camera_override {
            Some(cam) => cam.clone(),
            None => self.camera_for(&snapshot),
        };
        self.last_camera = camera.clone();
        let progress = fraction(
            snapshot.time_ms - timecode.start as f64,
            timecode.duration_ms() as f64,
        );
        SceneFrame {
            camera,
            layers: self.apply_layer_keyframes(&snapshot),
            playback: PlaybackInfo {
                mode: PlaybackMode::Live(state),
                time_ms: snapshot.time_ms,
                progress,
            },
            snapshot,
        }
    }

    /// Frame for stepped export. Ignores any interactive override.
    pub fn export_frame(
        &self,
        snapshot: Snapshot,
        frame: FrameIndex,
        frame_count: u64,
    ) -> SceneFrame {
        let progress = fraction(frame.0 as f64, frame_count.saturating_sub(1) as f64);
        SceneFrame {
            camera: self.camera_for(&snapshot),
            layers: self.apply_layer_keyframes(&snapshot),
            playback: PlaybackInfo {
                mode: PlaybackMode::Export { frame, frame_count },
                time_ms: snapshot.time_ms,
                progress,
            },
            snapshot,
        }
    }

    /// Record the camera `snapshot` puts on screen without building a frame, so an override made
    /// before the first live frame starts from the animated camera.
    pub fn sync_camera(&mut self, snapshot: &Snapshot) {
        self.last_camera = self.camera_for(snapshot);
    }

    /// Interactive camera manipulation: overlay `partial` onto the camera currently shown.
    pub fn set_current_state(&mut self, partial: &PropValue) {
        let base = self.camera_override.as_ref().unwrap_or(&self.last_camera);
        let next = base.merged_with(partial);
        tracing::debug!("live camera overridden");
        self.camera_override = Some(next);
    }

    /// Drop the override so scheduled playback drives the camera again.
    pub fn clear_override(&mut self) {
        self.camera_override = None;
    }

    /// Pending override, if any.
    pub fn camera_override(&self) -> Option<&PropValue> {
        self.camera_override.as_ref()
    }
}

fn fraction(num: f64, den: f64) -> f64 {
    if den <= 0.0 {
        return 1.0;
    }
    (num / den).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "../tests/unit/adapter.rs"]
mod tests;
