use crate::animation::timeline::AnimationTimeline;
use crate::animation::track::KeyframeTrack;
use crate::encode::format::{ExportFormat, FormatConfig};
use crate::foundation::core::{Resolution, Timecode};
use crate::foundation::error::{ReelError, ReelResult};
use crate::schedule::live::BoundaryMode;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Render wait used when `renderTimeoutMs` is not configured.
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 10_000;

fn default_render_timeout_ms() -> u64 {
    DEFAULT_RENDER_TIMEOUT_MS
}

/// JSON-facing configuration of a scene's clock and its exports.
///
/// ```json
/// {
///   "timecode": { "start": 0, "end": 5000, "framerate": 30 },
///   "resolution": { "width": 1280, "height": 720 },
///   "formatConfigs": { "png": { "sampleInterval": 1000 }, "mp4": { "quality": 0.9 } },
///   "renderTimeoutMs": 10000,
///   "boundary": "clamp"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExportConfig {
    /// Timeline bounds and frame rate.
    pub timecode: Timecode,
    /// Export resolution.
    pub resolution: Resolution,
    /// Per-format options keyed by format name.
    #[serde(default)]
    pub format_configs: BTreeMap<String, FormatConfig>,
    /// Per-frame render wait during export, in milliseconds.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,
    /// Live playback boundary policy.
    #[serde(default)]
    pub boundary: BoundaryMode,
}

impl ExportConfig {
    /// Configuration with no format options and default timeout / boundary.
    pub fn new(timecode: Timecode, resolution: Resolution) -> Self {
        Self {
            timecode,
            resolution,
            format_configs: BTreeMap::new(),
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            boundary: BoundaryMode::default(),
        }
    }

    /// Set the options of one format.
    pub fn with_format_config(mut self, format: ExportFormat, cfg: FormatConfig) -> Self {
        self.format_configs.insert(format.name().to_owned(), cfg);
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| ReelError::serde(format!("parse export config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a JSON configuration from a reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| ReelError::serde(format!("parse export config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        use anyhow::Context as _;
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open export config '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize back to pretty JSON.
    pub fn to_json_string(&self) -> ReelResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReelError::serde(e.to_string()))
    }

    /// Check the timecode, resolution, timeout and every format entry.
    pub fn validate(&self) -> ReelResult<()> {
        self.timecode.validate()?;
        self.resolution.validate()?;
        if self.render_timeout_ms == 0 {
            return Err(ReelError::config("renderTimeoutMs must be > 0"));
        }
        for (name, cfg) in &self.format_configs {
            let format = ExportFormat::parse(name).map_err(|_| {
                ReelError::config(format!("formatConfigs: unknown format '{name}'"))
            })?;
            cfg.validate(format)?;
        }
        Ok(())
    }

    /// Options for `format`, or the defaults when none are configured.
    ///
    /// Entries are matched by parsed name, so a `"jpg"` key configures JPEG.
    pub fn format_config(&self, format: ExportFormat) -> FormatConfig {
        self.format_configs
            .iter()
            .find(|(name, _)| ExportFormat::parse(name).ok() == Some(format))
            .map(|(_, cfg)| cfg.clone())
            .unwrap_or_default()
    }

    /// Per-frame render wait.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Build a timeline over this configuration's timecode.
    pub fn build_timeline(&self, tracks: Vec<KeyframeTrack>) -> ReelResult<AnimationTimeline> {
        AnimationTimeline::new(self.timecode, tracks)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
