//! Error types for the tuner engine.

use thiserror::Error;

/// Result type used across `tuner-core`.
pub type Result<T> = std::result::Result<T, TunerError>;

/// Errors produced by the analysis pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum TunerError {
    /// The window held no detectable periodic signal (silence or noise).
    /// Non-fatal: the frame is skipped and listening continues.
    #[error("no pitch found in window")]
    NoPitchFound,

    /// The window violated its construction contract.
    #[error(
        "invalid window: expected {expected} samples at a positive rate, \
         got {actual} samples at {sample_rate} Hz"
    )]
    InvalidWindow {
        expected: usize,
        actual: usize,
        sample_rate: u32,
    },

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TunerError {
    /// Returns `false` for errors that only mean "skip this frame".
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TunerError::NoPitchFound)
    }
}
