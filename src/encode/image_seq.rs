use crate::encode::encoder::{
    Artifact, ArtifactMetadata, EncoderConfig, FrameEncoder, FrameGate, not_started,
};
use crate::encode::format::{ArchiveMode, ExportFormat};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{flatten_premul_over_bg_to_opaque_rgba8, rgba8_to_rgb8};
use crate::render::backend::FrameRGBA;
use image::ImageEncoder as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use std::io::{Cursor, Write as _};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Background JPEG frames are flattened over.
const JPEG_BG_RGBA: [u8; 4] = [0, 0, 0, 255];

/// PNG / JPEG frames, each encoded independently into a zip archive entry named after its frame
/// index (`0000042.png`).
#[derive(Default)]
pub struct ImageSequenceEncoder {
    cfg: Option<EncoderConfig>,
    zip: Option<ZipWriter<Cursor<Vec<u8>>>>,
    gate: FrameGate,
    scratch: Vec<u8>,
}

impl ImageSequenceEncoder {
    /// Create an idle encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive entry name for frame `idx`.
    pub fn entry_name(format: ExportFormat, idx: FrameIndex) -> String {
        format!("{:07}.{}", idx.0, format.extension())
    }

    fn encode_image(
        &mut self,
        cfg: &EncoderConfig,
        frame: &FrameRGBA,
        idx: FrameIndex,
    ) -> ReelResult<Vec<u8>> {
        let (w, h) = (frame.width, frame.height);
        let mut out = Vec::new();
        match cfg.format {
            ExportFormat::Png => {
                let straight = frame.straight_rgba8();
                PngEncoder::new(&mut out)
                    .write_image(&straight, w, h, image::ExtendedColorType::Rgba8)
                    .map_err(|e| ReelError::encoding(idx.0, format!("png encode failed: {e}")))?;
            }
            ExportFormat::Jpeg => {
                let premul = frame.premul_rgba8();
                self.scratch.resize(premul.len(), 0);
                flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &premul, JPEG_BG_RGBA)
                    .map_err(|e| ReelError::encoding(idx.0, e.to_string()))?;
                let rgb = rgba8_to_rgb8(&self.scratch);
                let quality = jpeg_quality(cfg.format_config.quality_or_default());
                JpegEncoder::new_with_quality(&mut out, quality)
                    .write_image(&rgb, w, h, image::ExtendedColorType::Rgb8)
                    .map_err(|e| ReelError::encoding(idx.0, format!("jpeg encode failed: {e}")))?;
            }
            other => {
                return Err(ReelError::encoding(
                    idx.0,
                    format!("{other} is not an image sequence format"),
                ));
            }
        }
        Ok(out)
    }
}

/// Map a `[0, 1]` quality factor onto libjpeg's `1..=100`.
pub(crate) fn jpeg_quality(q: f64) -> u8 {
    (q * 100.0).round().clamp(1.0, 100.0) as u8
}

impl FrameEncoder for ImageSequenceEncoder {
    fn init(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        if !matches!(cfg.format, ExportFormat::Png | ExportFormat::Jpeg) {
            return Err(ReelError::encoding(
                0,
                format!("{} is not an image sequence format", cfg.format),
            ));
        }
        match cfg.format_config.archive_or_default() {
            ArchiveMode::Zip => self.zip = Some(ZipWriter::new(Cursor::new(Vec::new()))),
        }
        self.gate.reset();
        self.cfg = Some(cfg);
        Ok(())
    }

    fn append_frame(&mut self, frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()> {
        let cfg = self.cfg.take().ok_or_else(|| not_started(idx))?;
        let res = self
            .gate
            .admit(&cfg, frame, idx)
            .and_then(|()| self.encode_image(&cfg, frame, idx));
        let format = cfg.format;
        self.cfg = Some(cfg);
        let bytes = res?;

        let zip = self.zip.as_mut().ok_or_else(|| not_started(idx))?;
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(Self::entry_name(format, idx), opts)
            .map_err(|e| ReelError::encoding(idx.0, format!("zip entry failed: {e}")))?;
        zip.write_all(&bytes)
            .map_err(|e| ReelError::encoding(idx.0, format!("zip write failed: {e}")))?;
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<Artifact> {
        let frames = self.gate.frames;
        let cfg = self.cfg.take().ok_or_else(|| not_started(FrameIndex(frames)))?;
        let zip = self.zip.take().ok_or_else(|| not_started(FrameIndex(frames)))?;
        let bytes = zip
            .finish()
            .map_err(|e| ReelError::encoding(frames, format!("zip finalize failed: {e}")))?
            .into_inner();
        Ok(Artifact {
            bytes,
            mime_type: cfg.format.mime_type().to_owned(),
            metadata: ArtifactMetadata {
                frame_count: frames,
                resolution: cfg.resolution,
                duration_ms: cfg.duration_ms,
            },
        })
    }

    fn abort(&mut self) {
        self.zip = None;
        self.cfg = None;
        self.gate.reset();
    }
}
