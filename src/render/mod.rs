//! Renderer boundary.
//!
//! keyreel never draws pixels; an external [`backend::Renderer`] does.

/// Renderer trait, completion signal and frame buffers.
pub mod backend;
