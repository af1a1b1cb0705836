//! Error types for syncloop-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for syncloop-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] syncloop_common::Error),

    /// WAV file could not be opened or decoded
    #[error("Audio load error: {0}")]
    Load(#[from] hound::Error),

    /// Sample layout the player cannot handle
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Loaded buffer holds no frames
    #[error("Sample buffer is empty")]
    EmptySampleBuffer,

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Wall-clock or device-clock query failed
    #[error("Clock read failure: {0}")]
    ClockRead(String),

    /// Device requested a buffer of a different size than configured
    #[error("Buffer size mismatch: configured {expected} frames, device requested {actual}")]
    PreconditionViolation { expected: usize, actual: usize },

    /// Audio stream reported a fault and was stopped
    #[error("Stream fault: {0}")]
    StreamFault(String),
}

/// Convenience Result type using syncloop-player Error
pub type Result<T> = std::result::Result<T, Error>;
