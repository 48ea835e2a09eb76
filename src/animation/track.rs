use crate::animation::ease::Ease;
use crate::animation::value::{Mix, PropValue};
use crate::foundation::error::{ReelError, ReelResult};

/// One control point: a value pinned to a millisecond timestamp.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    /// Timestamp in milliseconds.
    pub time: u64,
    /// Value at `time`.
    pub value: PropValue,
}

/// Keyframed animation of one property group (the camera, or one layer's properties).
///
/// `timings` and `keyframes` are parallel; timings are strictly increasing and there is at least
/// one keyframe. A single easing curve applies to every segment.
#[derive(Clone, Debug, serde::Serialize)]
pub struct KeyframeTrack {
    id: String,
    timings: Vec<u64>,
    keyframes: Vec<PropValue>,
    easing: Ease,
}

impl KeyframeTrack {
    /// Create a validated track from parallel timing / value sequences.
    pub fn new(
        id: impl Into<String>,
        timings: Vec<u64>,
        keyframes: Vec<PropValue>,
        easing: Ease,
    ) -> ReelResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ReelError::config("track id must be non-empty"));
        }
        if timings.is_empty() {
            return Err(ReelError::config(format!(
                "track '{id}' must have at least one keyframe"
            )));
        }
        if timings.len() != keyframes.len() {
            return Err(ReelError::config(format!(
                "track '{id}' has {} timings but {} keyframes",
                timings.len(),
                keyframes.len()
            )));
        }
        if let Some(w) = timings.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ReelError::config(format!(
                "track '{id}' timings must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }
        Ok(Self {
            id,
            timings,
            keyframes,
            easing,
        })
    }

    /// Create a validated track from keyframe structs.
    pub fn from_keyframes(
        id: impl Into<String>,
        keys: impl IntoIterator<Item = Keyframe>,
        easing: Ease,
    ) -> ReelResult<Self> {
        let (timings, keyframes) = keys.into_iter().map(|k| (k.time, k.value)).unzip();
        Self::new(id, timings, keyframes, easing)
    }

    /// Track id (layer id, or the camera track id).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Control point timestamps.
    pub fn timings(&self) -> &[u64] {
        &self.timings
    }

    /// Control point values.
    pub fn keyframes(&self) -> &[PropValue] {
        &self.keyframes
    }

    /// Segment easing.
    pub fn easing(&self) -> Ease {
        self.easing
    }

    /// Number of control points.
    pub fn len(&self) -> usize {
        self.timings.len()
    }

    /// Always `false`; tracks hold at least one keyframe.
    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    /// Resolve the track value at `t` milliseconds.
    ///
    /// Holds the first value before the first key and the last value after the last key. Exactly
    /// on a control point the stored value is returned unchanged.
    pub fn value_at(&self, t: f64) -> PropValue {
        let last = self.timings.len() - 1;
        if t.is_nan() || t <= self.timings[0] as f64 {
            return self.keyframes[0].clone();
        }
        if t >= self.timings[last] as f64 {
            return self.keyframes[last].clone();
        }

        // First key strictly after `t`; in 1..=last given the bounds checks above.
        let idx = self.timings.partition_point(|&k| (k as f64) <= t);
        let (t0, t1) = (self.timings[idx - 1], self.timings[idx]);
        if t == t0 as f64 {
            return self.keyframes[idx - 1].clone();
        }

        let progress = (t - t0 as f64) / (t1 - t0) as f64;
        let mix = Mix {
            progress,
            eased: self.easing.apply(progress),
        };
        PropValue::blend(&self.keyframes[idx - 1], &self.keyframes[idx], mix)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/track.rs"]
mod tests;
