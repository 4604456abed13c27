//! Error types for playback control

use lumen_audio::AudioError;
use lumen_core::{CoreError, ErrorCategory, MediaError};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The track list is empty
    #[error("Track list is empty")]
    EmptyTrackList,

    /// Index out of bounds
    #[error("Track index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// The device failed to load or play the track
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// The processing graph failed
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Settings persistence failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A newer request (track change, sleep timer) took over
    #[error("Playback request superseded")]
    Superseded,
}

impl PlaybackError {
    /// User-facing category; `None` for caller mistakes
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::EmptyTrackList | Self::IndexOutOfBounds(_) => None,
            Self::Media(err) => Some(err.category()),
            Self::Audio(err) => Some(err.category()),
            Self::Core(err) => Some(err.category()),
            Self::Superseded => Some(ErrorCategory::Abort),
        }
    }

    /// Expected during fast track switching; never shown to users
    pub fn is_abort(&self) -> bool {
        self.category() == Some(ErrorCategory::Abort)
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::MediaErrorKind;

    #[test]
    fn media_errors_keep_their_category() {
        let err: PlaybackError = MediaError::new(MediaErrorKind::Unsupported, "flac24").into();
        assert_eq!(err.category(), Some(ErrorCategory::Decode));

        let err: PlaybackError = MediaError::new(MediaErrorKind::Network, "timeout").into();
        assert_eq!(err.category(), Some(ErrorCategory::Network));
    }

    #[test]
    fn aborts_are_recognised() {
        let err: PlaybackError = MediaError::aborted().into();
        assert!(err.is_abort());
        assert!(PlaybackError::Superseded.is_abort());
        assert!(!PlaybackError::EmptyTrackList.is_abort());
    }

    #[test]
    fn graph_errors_mean_device_unavailable() {
        let err: PlaybackError = AudioError::ContextClosed.into();
        assert_eq!(err.category(), Some(ErrorCategory::DeviceUnavailable));
    }
}
