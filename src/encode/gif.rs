use crate::encode::encoder::{
    Artifact, ArtifactMetadata, EncoderConfig, FrameEncoder, FrameGate, not_started,
};
use crate::encode::format::ExportFormat;
use crate::foundation::core::{FrameIndex, Resolution};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, Frame, RgbaImage};

/// Animated GIF encoder.
///
/// Frames are buffered and the stream is written in one go by `finalize`, looping forever. Each
/// frame is shown for the sample interval when one is configured, for one timeline frame
/// otherwise.
#[derive(Default)]
pub struct GifSequenceEncoder {
    cfg: Option<EncoderConfig>,
    gate: FrameGate,
    frames: Vec<Frame>,
}

impl GifSequenceEncoder {
    /// Create an idle encoder.
    pub fn new() -> Self {
        Self::default()
    }

    fn out_size(cfg: &EncoderConfig) -> (u32, u32) {
        let fc = &cfg.format_config;
        (
            fc.width.unwrap_or(cfg.resolution.width),
            fc.height.unwrap_or(cfg.resolution.height),
        )
    }
}

/// Per-frame display time as a `(numerator, denominator)` millisecond ratio.
pub(crate) fn frame_delay_ms(cfg: &EncoderConfig) -> (u32, u32) {
    match cfg.format_config.sample_interval {
        Some(interval) => (u32::try_from(interval).unwrap_or(u32::MAX), 1),
        None => {
            // 1000 / framerate, kept rational at microsecond precision.
            let us = (1_000_000.0 / cfg.framerate).round().clamp(1.0, f64::from(u32::MAX));
            (us as u32, 1000)
        }
    }
}

impl FrameEncoder for GifSequenceEncoder {
    fn init(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        if cfg.format != ExportFormat::Gif {
            return Err(ReelError::encoding(
                0,
                format!("gif encoder cannot produce {}", cfg.format),
            ));
        }
        let (w, h) = Self::out_size(&cfg);
        if w > u32::from(u16::MAX) || h > u32::from(u16::MAX) {
            return Err(ReelError::encoding(
                0,
                format!("gif frames are limited to 65535x65535, got {w}x{h}"),
            ));
        }
        self.frames.clear();
        self.gate.reset();
        self.cfg = Some(cfg);
        Ok(())
    }

    fn append_frame(&mut self, frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()> {
        let cfg = self.cfg.as_ref().ok_or_else(|| not_started(idx))?;
        self.gate.admit(cfg, frame, idx)?;

        let straight = frame.straight_rgba8().into_owned();
        let img = RgbaImage::from_raw(frame.width, frame.height, straight)
            .ok_or_else(|| ReelError::encoding(idx.0, "frame buffer does not fit its size"))?;
        let (w, h) = Self::out_size(cfg);
        let img = if (w, h) == img.dimensions() {
            img
        } else {
            image::imageops::resize(&img, w, h, FilterType::Triangle)
        };

        let (numer, denom) = frame_delay_ms(cfg);
        self.frames.push(Frame::from_parts(
            img,
            0,
            0,
            Delay::from_numer_denom_ms(numer, denom),
        ));
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<Artifact> {
        let frames_done = self.gate.frames;
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| not_started(FrameIndex(frames_done)))?;
        let frames = std::mem::take(&mut self.frames);

        let mut bytes = Vec::new();
        {
            let mut enc = GifEncoder::new(&mut bytes);
            enc.set_repeat(Repeat::Infinite)
                .map_err(|e| ReelError::encoding(frames_done, format!("gif setup failed: {e}")))?;
            enc.encode_frames(frames)
                .map_err(|e| ReelError::encoding(frames_done, format!("gif encode failed: {e}")))?;
        }

        let (width, height) = Self::out_size(&cfg);
        Ok(Artifact {
            bytes,
            mime_type: cfg.format.mime_type().to_owned(),
            metadata: ArtifactMetadata {
                frame_count: frames_done,
                resolution: Resolution { width, height },
                duration_ms: cfg.duration_ms,
            },
        })
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.cfg = None;
        self.gate.reset();
    }
}
