/// Result alias used throughout keyreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Error taxonomy for timeline construction and export sessions.
///
/// Construction-time variants (`Config`, `UnsupportedFormat`) are raised before anything runs.
/// Runtime variants (`RenderTimeout`, `Encoding`, `Render`) abort the export session that raised
/// them; the live playback path is never affected.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Malformed timeline, track, resolution or format configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Requested export format is not known.
    #[error("unsupported format: '{0}'")]
    UnsupportedFormat(String),

    /// Another export session is already running.
    #[error("busy: another export session is running")]
    Busy,

    /// The renderer did not signal completion within the bounded wait.
    #[error("render timeout: frame {frame} not completed within {timeout_ms}ms")]
    RenderTimeout {
        /// Frame that was being rendered.
        frame: u64,
        /// Configured wait, in milliseconds.
        timeout_ms: u64,
    },

    /// The encoder rejected or failed on a frame.
    #[error("encoding error at frame {frame}: {message}")]
    Encoding {
        /// Frame index being encoded (or the frame count when finalizing).
        frame: u64,
        /// Encoder-provided detail.
        message: String,
    },

    /// The renderer reported a failure while drawing.
    #[error("render error: {0}")]
    Render(String),

    /// Session API misuse (stepping a finished export, reading a missing artifact).
    #[error("session error: {0}")]
    Session(String),

    /// Configuration (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, typically IO with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ReelError::UnsupportedFormat`].
    pub fn unsupported_format(name: impl Into<String>) -> Self {
        Self::UnsupportedFormat(name.into())
    }

    /// Build a [`ReelError::Encoding`] for `frame`.
    pub fn encoding(frame: u64, msg: impl Into<String>) -> Self {
        Self::Encoding {
            frame,
            message: msg.into(),
        }
    }

    /// Build a [`ReelError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ReelError::Session`].
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Build a [`ReelError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors raised while an export was already running.
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::RenderTimeout { .. } | Self::Encoding { .. } | Self::Render(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
