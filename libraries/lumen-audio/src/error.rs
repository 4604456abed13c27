/// Audio graph errors
use lumen_core::ErrorCategory;
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio graph error types
#[derive(Error, Debug, Clone)]
pub enum AudioError {
    /// No audio context could be created for the output
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The context was closed or errored after creation
    #[error("Audio context closed")]
    ContextClosed,

    /// The context refused to resume
    #[error("Audio context resume failed: {0}")]
    ResumeFailed(String),
}

impl AudioError {
    /// User-facing category
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::DeviceUnavailable
    }
}
