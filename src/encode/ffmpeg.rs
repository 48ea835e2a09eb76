use crate::encode::encoder::{
    Artifact, ArtifactMetadata, EncoderConfig, FrameEncoder, FrameGate, not_started,
};
use crate::encode::format::ExportFormat;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::flatten_premul_over_bg_to_opaque_rgba8;
use crate::render::backend::FrameRGBA;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Streams raw frames into the system `ffmpeg` and returns the encoded WebM / MP4 bytes.
///
/// `ffmpeg` writes to a temporary file that `finalize` reads back and removes.
pub struct FfmpegEncoder {
    bg_rgba: [u8; 4],

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    out: TempFile,

    scratch: Vec<u8>,
    cfg: Option<EncoderConfig>,
    gate: FrameGate,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    /// Encoder that flattens alpha over black.
    pub fn new() -> Self {
        Self::with_background([0, 0, 0, 255])
    }

    /// Encoder that flattens alpha over `bg_rgba`.
    pub fn with_background(bg_rgba: [u8; 4]) -> Self {
        Self {
            bg_rgba,
            child: None,
            stdin: None,
            stderr_drain: None,
            out: TempFile(None),
            scratch: Vec::new(),
            cfg: None,
            gate: FrameGate::default(),
        }
    }

    fn kill_child(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

/// Codec arguments for `format` at quality `q` in `[0, 1]`.
pub(crate) fn codec_args(format: ExportFormat, q: f64) -> ReelResult<Vec<String>> {
    let q = q.clamp(0.0, 1.0);
    let args: Vec<String> = match format {
        ExportFormat::Webm => {
            let crf = ((1.0 - q) * 63.0).round() as u32;
            let crf = crf.to_string();
            vec![
                "-an", "-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p", "-b:v", "0", "-crf", &crf,
                "-f", "webm",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect()
        }
        ExportFormat::Mp4 => {
            let crf = ((1.0 - q) * 51.0).round() as u32;
            let crf = crf.to_string();
            vec![
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-crf",
                &crf,
                "-movflags",
                "+faststart",
                "-f",
                "mp4",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect()
        }
        other => {
            return Err(ReelError::encoding(
                0,
                format!("ffmpeg encoder cannot produce {other}"),
            ));
        }
    };
    Ok(args)
}

impl FrameEncoder for FfmpegEncoder {
    fn init(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        let codec = codec_args(cfg.format, cfg.format_config.quality_or_default())?;
        if !cfg.resolution.is_even() {
            return Err(ReelError::encoding(
                0,
                "width/height must be even (required for yuv420p output)",
            ));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::encoding(
                0,
                format!(
                    "ffmpeg is required for {} encoding, but was not found on PATH",
                    cfg.format
                ),
            ));
        }

        self.kill_child();
        let out_path = std::env::temp_dir().join(format!(
            "keyreel_export_{}_{}.{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            cfg.format.extension()
        ));
        ensure_parent_dir(&out_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        // Input: raw RGBA8 frames, flattened to opaque before they hit stdin.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.resolution.width, cfg.resolution.height),
            "-r",
            &format!("{}", cfg.framerate),
            "-i",
            "pipe:0",
        ]);
        cmd.args(&codec).arg(&out_path);
        tracing::debug!(format = %cfg.format, path = %out_path.display(), "spawning ffmpeg");

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encoding(
                0,
                format!("failed to spawn ffmpeg (is it installed and on PATH?): {e}"),
            )
        })?;
        self.out = TempFile(Some(out_path));

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::encoding(0, "failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::encoding(0, "failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; cfg.resolution.rgba8_len()];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.gate.reset();
        Ok(())
    }

    fn append_frame(&mut self, frame: &FrameRGBA, idx: FrameIndex) -> ReelResult<()> {
        let cfg = self.cfg.as_ref().ok_or_else(|| not_started(idx))?;
        self.gate.admit(cfg, frame, idx)?;

        let premul = frame.premul_rgba8();
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &premul, self.bg_rgba)
            .map_err(|e| ReelError::encoding(idx.0, e.to_string()))?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::encoding(idx.0, "ffmpeg stdin is already closed"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            ReelError::encoding(idx.0, format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<Artifact> {
        let frames = self.gate.frames;
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| not_started(FrameIndex(frames)))?;
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| not_started(FrameIndex(frames)))?;

        let status = child.wait().map_err(|e| {
            ReelError::encoding(frames, format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encoding(frames, "ffmpeg stderr drain thread panicked"))?
                .map_err(|e| {
                    ReelError::encoding(frames, format!("ffmpeg stderr read failed: {e}"))
                })?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::encoding(
                frames,
                format!("ffmpeg exited with status {}: {}", status, stderr.trim()),
            ));
        }

        let path = self
            .out
            .0
            .as_deref()
            .ok_or_else(|| not_started(FrameIndex(frames)))?;
        let bytes = std::fs::read(path).map_err(|e| {
            ReelError::encoding(
                frames,
                format!("failed to read ffmpeg output '{}': {e}", path.display()),
            )
        })?;
        self.out.remove();

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
        self.kill_child();
        self.out.remove();
        self.cfg = None;
        self.gate.reset();
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.kill_child();
    }
}

struct TempFile(Option<PathBuf>);

impl TempFile {
    fn remove(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
