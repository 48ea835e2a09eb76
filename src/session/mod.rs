//! Export session lifecycle: busy slot, cancellation, progress and artifact.

/// Export session and its busy slot.
pub mod export_session;
