/// Core error types for Lumen
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Settings could not be loaded or saved
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Category used when reporting this error to the UI
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Persistence
    }
}

/// User-facing error categories
///
/// Every error that leaves the audio core carries one of these so the UI can
/// pick an appropriate message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    /// The processing graph could not be built; playback continues unequalized
    DeviceUnavailable,
    /// The track could not be decoded or its format is unsupported
    Decode,
    /// The track source could not be fetched
    Network,
    /// Playback was interrupted by a newer request (never shown to users)
    Abort,
    /// Settings could not be stored
    Persistence,
}

impl ErrorCategory {
    /// Whether errors of this category should be shown to the user
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Abort)
    }
}
