use crate::foundation::error::{ReelError, ReelResult};

/// Absolute 0-based frame index in export space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// The following frame index.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Timeline bounds and frame rate.
///
/// `start` and `end` are milliseconds; both are inclusive, so a `[0, 5000]` timecode at 30 fps
/// yields 151 frames.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timecode {
    /// First timestamp, in milliseconds.
    pub start: u64,
    /// Last timestamp, in milliseconds (`>= start`).
    pub end: u64,
    /// Frames per second (`> 0`).
    pub framerate: f64,
}

impl Timecode {
    /// Create a validated timecode.
    pub fn new(start: u64, end: u64, framerate: f64) -> ReelResult<Self> {
        let tc = Self {
            start,
            end,
            framerate,
        };
        tc.validate()?;
        Ok(tc)
    }

    /// Check `end >= start` and a finite, positive frame rate.
    pub fn validate(&self) -> ReelResult<()> {
        if self.end < self.start {
            return Err(ReelError::config(format!(
                "timecode end ({}) must be >= start ({})",
                self.end, self.start
            )));
        }
        if !self.framerate.is_finite() || self.framerate <= 0.0 {
            return Err(ReelError::config(format!(
                "timecode framerate must be > 0, got {}",
                self.framerate
            )));
        }
        Ok(())
    }

    /// Length of the timeline in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end - self.start
    }

    /// Duration of one frame in milliseconds.
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.framerate
    }

    /// Number of frames covering `[start, end]`: `floor(duration / 1000 * framerate) + 1`.
    pub fn frame_count(&self) -> u64 {
        let frames = (self.duration_ms() as f64 / 1000.0 * self.framerate).floor();
        frames.max(0.0) as u64 + 1
    }

    /// Timestamp of `frame`, in milliseconds.
    ///
    /// Multiplies before dividing so whole-millisecond frame times stay exact.
    pub fn frame_time_ms(&self, frame: FrameIndex) -> f64 {
        self.start as f64 + (frame.0 as f64 * 1000.0) / self.framerate
    }

    /// Clamp a timestamp into `[start, end]`.
    pub fn clamp_ms(&self, t: f64) -> f64 {
        if t.is_nan() {
            return self.start as f64;
        }
        t.clamp(self.start as f64, self.end as f64)
    }
}

/// Output dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a validated, non-empty resolution.
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        let r = Self { width, height };
        r.validate()?;
        Ok(r)
    }

    /// Reject zero-sized outputs.
    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::config(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Byte length of a tightly packed RGBA8 buffer at this size.
    pub fn rgba8_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }

    /// `true` when both dimensions are even (required by yuv420p video).
    pub fn is_even(&self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
