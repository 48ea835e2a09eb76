//! Frame encoders.
//!
//! Encoders consume captured frames in strictly increasing frame order and assemble the export
//! artifact. Each built-in format maps to one encoder; see [`encoder::create_encoder`].

/// Encoder trait, artifact types and the in-memory encoder.
pub mod encoder;
/// `ffmpeg`-based video encoders (WebM / MP4 via system `ffmpeg`).
pub mod ffmpeg;
/// Format names, parameters and their validation.
pub mod format;
/// Animated GIF encoder.
pub mod gif;
/// PNG / JPEG image sequences packaged as a zip archive.
pub mod image_seq;
