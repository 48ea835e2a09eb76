use crate::animation::timeline::{AnimationTimeline, Snapshot};
use std::time::Duration;

/// Live playback state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PlaybackState {
    /// Clock parked at the timeline start.
    #[default]
    Stopped,
    /// Clock advances on every tick.
    Playing,
    /// Clock frozen at its current position.
    Paused,
}

/// What happens when the live clock reaches the timeline end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Hold the last frame and pause.
    #[default]
    Clamp,
    /// Loop back to the start.
    Wrap,
}

/// Wall-clock driven playback over a timeline.
///
/// Never blocks: each external tick reports the elapsed time and gets a snapshot back.
#[derive(Clone, Debug)]
pub struct LiveScheduler {
    state: PlaybackState,
    boundary: BoundaryMode,
    start_ms: f64,
    end_ms: f64,
    clock_ms: f64,
}

impl LiveScheduler {
    /// Stopped scheduler positioned at the timeline start.
    pub fn new(timeline: &AnimationTimeline, boundary: BoundaryMode) -> Self {
        let start_ms = timeline.start_ms() as f64;
        Self {
            state: PlaybackState::Stopped,
            boundary,
            start_ms,
            end_ms: timeline.end_ms() as f64,
            clock_ms: start_ms,
        }
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Boundary policy.
    pub fn boundary(&self) -> BoundaryMode {
        self.boundary
    }

    /// Change the boundary policy.
    pub fn set_boundary(&mut self, boundary: BoundaryMode) {
        self.boundary = boundary;
    }

    /// Clock position in milliseconds.
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Start or resume. A clamped clock sitting at the end restarts from the beginning.
    pub fn play(&mut self) {
        if self.boundary == BoundaryMode::Clamp && self.clock_ms >= self.end_ms {
            self.clock_ms = self.start_ms;
        }
        self.state = PlaybackState::Playing;
    }

    /// Freeze the clock.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and rewind to the start.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.clock_ms = self.start_ms;
    }

    /// Jump to `t` (clamped into the timeline).
    pub fn seek(&mut self, t: f64) {
        self.clock_ms = if t.is_nan() {
            self.start_ms
        } else {
            t.clamp(self.start_ms, self.end_ms)
        };
    }

    /// Advance by `elapsed` (only while playing) and apply the boundary policy.
    pub fn advance(&mut self, elapsed: Duration) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let next = self.clock_ms + elapsed.as_nanos() as f64 / 1_000_000.0;
        if next <= self.end_ms {
            self.clock_ms = next;
            return;
        }
        match self.boundary {
            BoundaryMode::Clamp => {
                self.clock_ms = self.end_ms;
                self.state = PlaybackState::Paused;
                tracing::debug!("live playback reached the end, pausing");
            }
            BoundaryMode::Wrap => {
                let span = self.end_ms - self.start_ms;
                self.clock_ms = if span <= 0.0 {
                    self.start_ms
                } else {
                    self.start_ms + (next - self.start_ms) % span
                };
            }
        }
    }

    /// One render tick: advance the clock, then evaluate the timeline at it.
    pub fn tick(&mut self, timeline: &AnimationTimeline, elapsed: Duration) -> Snapshot {
        self.advance(elapsed);
        timeline.snapshot_at(self.clock_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/live.rs"]
mod tests;
