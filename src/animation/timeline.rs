use crate::animation::track::KeyframeTrack;
use crate::animation::value::PropValue;
use crate::foundation::core::{FrameIndex, Timecode};
use crate::foundation::error::{ReelError, ReelResult};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Fully resolved property values at one timestamp, keyed by track id.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Snapshot {
    /// Timestamp the snapshot was evaluated at (after clamping), in milliseconds.
    pub time_ms: f64,
    /// Track id -> resolved value.
    pub values: BTreeMap<String, PropValue>,
}

impl Snapshot {
    /// Value for one track.
    pub fn get(&self, track_id: &str) -> Option<&PropValue> {
        self.values.get(track_id)
    }
}

/// All tracks of a scene under one clock and frame rate.
///
/// Immutable once built; share it behind an `Arc` between the live and export paths.
#[derive(Clone, Debug)]
pub struct AnimationTimeline {
    timecode: Timecode,
    tracks: Vec<KeyframeTrack>,
}

impl AnimationTimeline {
    /// Build a timeline. Track ids must be unique.
    pub fn new(timecode: Timecode, tracks: Vec<KeyframeTrack>) -> ReelResult<Self> {
        timecode.validate()?;
        let mut seen = HashSet::new();
        for track in &tracks {
            if !seen.insert(track.id()) {
                return Err(ReelError::config(format!(
                    "duplicate track id '{}'",
                    track.id()
                )));
            }
        }
        Ok(Self { timecode, tracks })
    }

    /// Bounds and frame rate.
    pub fn timecode(&self) -> Timecode {
        self.timecode
    }

    /// First timestamp, in milliseconds.
    pub fn start_ms(&self) -> u64 {
        self.timecode.start
    }

    /// Last timestamp, in milliseconds.
    pub fn end_ms(&self) -> u64 {
        self.timecode.end
    }

    /// Frames per second.
    pub fn framerate(&self) -> f64 {
        self.timecode.framerate
    }

    /// `floor((end - start) / 1000 * framerate) + 1`.
    pub fn frame_count(&self) -> u64 {
        self.timecode.frame_count()
    }

    /// Timestamp of frame `frame`: `start + frame * 1000 / framerate`.
    pub fn frame_time_for(&self, frame: FrameIndex) -> f64 {
        self.timecode.frame_time_ms(frame)
    }

    /// `(index, timestamp)` for every frame, in order.
    pub fn frame_times(&self) -> impl Iterator<Item = (FrameIndex, f64)> + '_ {
        (0..self.frame_count()).map(|i| {
            let idx = FrameIndex(i);
            (idx, self.frame_time_for(idx))
        })
    }

    /// All tracks, in insertion order.
    pub fn tracks(&self) -> &[KeyframeTrack] {
        &self.tracks
    }

    /// Track lookup by id.
    pub fn track(&self, id: &str) -> Option<&KeyframeTrack> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    /// Evaluate every track at `t` (clamped into `[start, end]`).
    pub fn snapshot_at(&self, t: f64) -> Snapshot {
        let time_ms = self.timecode.clamp_ms(t);
        let values = self
            .tracks
            .iter()
            .map(|track| (track.id().to_owned(), track.value_at(time_ms)))
            .collect();
        Snapshot { time_ms, values }
    }

    /// Same as [`AnimationTimeline::snapshot_at`], evaluating tracks on the rayon pool.
    ///
    /// Tracks have no cross-track dependencies, so the result is identical.
    pub fn snapshot_at_par(&self, t: f64) -> Snapshot {
        let time_ms = self.timecode.clamp_ms(t);
        let values = self
            .tracks
            .par_iter()
            .map(|track| (track.id().to_owned(), track.value_at(time_ms)))
            .collect::<BTreeMap<_, _>>();
        Snapshot { time_ms, values }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/timeline.rs"]
mod tests;
