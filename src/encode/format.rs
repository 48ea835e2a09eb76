use crate::foundation::error::{ReelError, ReelResult};
use std::fmt;
use std::str::FromStr;

/// Quality factor used by lossy formats when none is configured.
pub const DEFAULT_QUALITY: f64 = 0.8;

/// Built-in export formats.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// VP9 WebM video (system `ffmpeg`).
    Webm,
    /// H.264 MP4 video (system `ffmpeg`).
    Mp4,
    /// Zip archive of PNG frames.
    Png,
    /// Zip archive of JPEG frames.
    Jpeg,
    /// Animated GIF.
    Gif,
}

/// How frames accumulate into the artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatKind {
    /// One encoded stream.
    Stream,
    /// An archive of independently named frames.
    ImageSequence,
}

impl ExportFormat {
    /// Every built-in format.
    pub fn all() -> [Self; 5] {
        [Self::Webm, Self::Mp4, Self::Png, Self::Jpeg, Self::Gif]
    }

    /// Parse a format name (`"jpg"` is accepted for JPEG).
    pub fn parse(name: &str) -> ReelResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "webm" => Ok(Self::Webm),
            "mp4" => Ok(Self::Mp4),
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            _ => Err(ReelError::unsupported_format(name)),
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
        }
    }

    /// Stream or image sequence.
    pub fn kind(self) -> FormatKind {
        match self {
            Self::Webm | Self::Mp4 | Self::Gif => FormatKind::Stream,
            Self::Png | Self::Jpeg => FormatKind::ImageSequence,
        }
    }

    /// MIME type of the finished artifact.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Webm => "video/webm",
            Self::Mp4 => "video/mp4",
            Self::Gif => "image/gif",
            Self::Png | Self::Jpeg => "application/zip",
        }
    }

    /// File extension of the artifact, or of each archived frame for image sequences.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
        }
    }

    /// Whether a sample interval may thin out captured frames.
    ///
    /// Continuous video streams must receive every frame.
    pub fn supports_sampling(self) -> bool {
        matches!(self, Self::Png | Self::Jpeg | Self::Gif)
    }

    /// Whether the `quality` factor affects the output.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Webm | Self::Mp4 | Self::Jpeg)
    }
}

impl FromStr for ExportFormat {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Archive packaging for image sequences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    /// Zip archive, frames stored uncompressed.
    #[default]
    Zip,
}

/// Format-specific options. Only type and range are checked.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormatConfig {
    /// Lossy quality factor in `[0, 1]`.
    #[serde(default)]
    pub quality: Option<f64>,
    /// Capture one frame per this many milliseconds.
    #[serde(default)]
    pub sample_interval: Option<u64>,
    /// Archive packaging for image sequences.
    #[serde(default)]
    pub archive: Option<ArchiveMode>,
    /// Output width override (GIF).
    #[serde(default)]
    pub width: Option<u32>,
    /// Output height override (GIF).
    #[serde(default)]
    pub height: Option<u32>,
}

impl FormatConfig {
    /// Range checks against `format`.
    pub fn validate(&self, format: ExportFormat) -> ReelResult<()> {
        if let Some(q) = self.quality
            && !(q.is_finite() && (0.0..=1.0).contains(&q))
        {
            return Err(ReelError::config(format!(
                "{format}: quality must be within [0, 1], got {q}"
            )));
        }
        if let Some(interval) = self.sample_interval {
            if interval == 0 {
                return Err(ReelError::config(format!(
                    "{format}: sampleInterval must be > 0"
                )));
            }
            if !format.supports_sampling() {
                return Err(ReelError::config(format!(
                    "{format}: sampleInterval is not supported for continuous video streams"
                )));
            }
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(ReelError::config(format!(
                "{format}: output width/height must be > 0"
            )));
        }
        Ok(())
    }

    /// Configured quality or [`DEFAULT_QUALITY`].
    pub fn quality_or_default(&self) -> f64 {
        self.quality.unwrap_or(DEFAULT_QUALITY)
    }

    /// Configured archive mode or the default.
    pub fn archive_or_default(&self) -> ArchiveMode {
        self.archive.unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/format.rs"]
mod tests;
