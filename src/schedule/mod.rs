//! Timeline clocks: wall-clock live playback and frame-stepped export.

/// Stepped export scheduler and frame sampling.
pub mod export;
/// Live playback clock.
pub mod live;
