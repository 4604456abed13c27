//! Device sink contract
//!
//! A `MediaElement` is the single output a track plays through: it holds the
//! attached source, reports time/duration, and emits `MediaEvent`s back into
//! the playback controller. Platform code (a browser media element bridge, a
//! native decoder + output stream) implements the trait.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::error::ErrorCategory;

static NEXT_OUTPUT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an output element; keys the graph registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(u64);

impl OutputId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        Self(NEXT_OUTPUT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap an id supplied by the platform
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// Kind of device-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    /// Data could not be decoded
    Decode,
    /// Container or codec not supported
    Unsupported,
    /// Fetching the source failed
    Network,
    /// Load or play was interrupted by a newer request
    Aborted,
}

/// Error reported by a `MediaElement`
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct MediaError {
    /// What went wrong
    pub kind: MediaErrorKind,
    /// Platform-provided detail
    pub message: String,
}

impl MediaError {
    /// Create a media error
    pub fn new(kind: MediaErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an abort caused by fast track switching
    pub fn aborted() -> Self {
        Self::new(MediaErrorKind::Aborted, "playback request was interrupted")
    }

    /// User-facing category
    pub fn category(&self) -> ErrorCategory {
        match self.kind {
            MediaErrorKind::Decode | MediaErrorKind::Unsupported => ErrorCategory::Decode,
            MediaErrorKind::Network => ErrorCategory::Network,
            MediaErrorKind::Aborted => ErrorCategory::Abort,
        }
    }
}

/// Events a media element feeds back into the controller
#[derive(Debug, Clone)]
pub enum MediaEvent {
    /// Metadata is ready; duration is now known
    MetadataLoaded {
        /// Track duration in seconds
        duration: f64,
    },
    /// Periodic position report
    TimeUpdate {
        /// Current position in seconds
        position: f64,
    },
    /// The track played to its end
    Ended,
    /// Decode/network/abort failure
    Error(MediaError),
}

/// Output element a track plays through
///
/// Methods other than `play` are fire-and-forget; `play` resolves once the
/// device has actually started (or failed to).
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Identity used to key the processing graph
    fn id(&self) -> OutputId;

    /// Currently attached source, if any
    fn source(&self) -> Option<String>;

    /// Attach a new source and begin loading it
    fn attach(&self, source: &str);

    /// Detach the current source
    fn detach(&self);

    /// Start playback, awaiting device readiness
    async fn play(&self) -> std::result::Result<(), MediaError>;

    /// Pause immediately
    fn pause(&self);

    /// Whether the device is currently paused
    fn is_paused(&self) -> bool;

    /// Jump to a position in seconds
    fn seek(&self, position: f64);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Duration in seconds, once known
    fn duration(&self) -> Option<f64>;

    /// Direct element volume (0.0-1.0); only used when no graph is available
    fn set_volume(&self, volume: f32);

    /// Direct element volume (0.0-1.0)
    fn volume(&self) -> f32;
}
