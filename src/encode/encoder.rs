use crate::encode::format::{ExportFormat, FormatConfig};
use crate::foundation::core::{FrameIndex, Resolution};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;

/// Configuration provided to a [`FrameEncoder`] when a session starts.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Target format.
    pub format: ExportFormat,
    /// Expected frame size.
    pub resolution: Resolution,
    /// Timeline frame rate.
    pub framerate: f64,
    /// Timeline duration in milliseconds.
    pub duration_ms: u64,
    /// Format-specific options, already range checked.
    pub format_config: FormatConfig,
}

/// Artifact metadata.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactMetadata {
    /// Frames captured into the artifact.
    pub frame_count: u64,
    /// Frame size.
    pub resolution: Resolution,
    /// Timeline duration in milliseconds.
    pub duration_ms: u64,
}

/// The finished export.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Encoded bytes (a video / GIF stream or a zip archive).
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Capture metadata.
    pub metadata: ArtifactMetadata,
}

/// Encoder contract.
///
/// Ordering contract: `append_frame` is called in strictly increasing `FrameIndex` order. Indices
/// may skip when the format samples sparsely. `abort` discards everything and may be called in
/// any state.
pub trait FrameEncoder: Send {
    /// Called once before any frame is appended.
    fn init(&mut self, cfg: EncoderConfig) -> ReelResult<()>;
    /// Encode one frame.
    fn append_frame(&mut self, frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()>;
    /// Flush and assemble the artifact.
    fn finalize(&mut self) -> ReelResult<Artifact>;
    /// Drop partial output.
    fn abort(&mut self) {}
}

/// Create the built-in encoder for `format`.
pub fn create_encoder(format: ExportFormat) -> Box<dyn FrameEncoder> {
    match format {
        ExportFormat::Webm | ExportFormat::Mp4 => {
            Box::new(crate::encode::ffmpeg::FfmpegEncoder::new())
        }
        ExportFormat::Png | ExportFormat::Jpeg => {
            Box::new(crate::encode::image_seq::ImageSequenceEncoder::new())
        }
        ExportFormat::Gif => Box::new(crate::encode::gif::GifSequenceEncoder::new()),
    }
}

/// Shared frame bookkeeping for the built-in encoders.
#[derive(Debug, Default)]
pub(crate) struct FrameGate {
    last_idx: Option<FrameIndex>,
    pub(crate) frames: u64,
}

impl FrameGate {
    /// Enforce ordering and frame size; count the frame on success.
    pub(crate) fn admit(
        &mut self,
        cfg: &EncoderConfig,
        frame: &FrameRGBA,
        idx: FrameIndex,
    ) -> ReelResult<()> {
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::encoding(
                idx.0,
                format!("out-of-order frame (previous was {})", last.0),
            ));
        }
        check_frame_size(cfg.resolution, frame, idx)?;
        self.last_idx = Some(idx);
        self.frames += 1;
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.last_idx = None;
        self.frames = 0;
    }
}

pub(crate) fn check_frame_size(
    resolution: Resolution,
    frame: &FrameRGBA,
    idx: FrameIndex,
) -> ReelResult<()> {
    if frame.width != resolution.width || frame.height != resolution.height {
        return Err(ReelError::encoding(
            idx.0,
            format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, resolution.width, resolution.height
            ),
        ));
    }
    if frame.data.len() != resolution.rgba8_len() {
        return Err(ReelError::encoding(
            idx.0,
            "frame.data size mismatch with width*height*4",
        ));
    }
    Ok(())
}

pub(crate) fn not_started(idx: FrameIndex) -> ReelError {
    ReelError::encoding(idx.0, "encoder not initialized")
}

/// In-memory encoder for tests and debugging. The artifact is the concatenated raw frames.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    cfg: Option<EncoderConfig>,
    gate: FrameGate,
    /// Frames in capture order.
    pub(crate) frames: Vec<(FrameIndex, FrameRGBA)>,
}

impl InMemoryEncoder {
    /// Create a new in-memory encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `init`, if any.
    pub fn config(&self) -> Option<&EncoderConfig> {
        self.cfg.as_ref()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }
}

impl FrameEncoder for InMemoryEncoder {
    fn init(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.gate.reset();
        Ok(())
    }

    fn append_frame(&mut self, frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()> {
        let cfg = self.cfg.as_ref().ok_or_else(|| not_started(idx))?;
        self.gate.admit(cfg, frame, idx)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<Artifact> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| not_started(FrameIndex(self.gate.frames)))?;
        let bytes = self
            .frames
            .iter()
            .flat_map(|(_, f)| f.data.iter().copied())
            .collect();
        Ok(Artifact {
            bytes,
            mime_type: "application/octet-stream".to_owned(),
            metadata: ArtifactMetadata {
                frame_count: self.gate.frames,
                resolution: cfg.resolution,
                duration_ms: cfg.duration_ms,
            },
        })
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.gate.reset();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
