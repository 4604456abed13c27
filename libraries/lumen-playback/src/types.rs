//! Core types for playback control

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatMode {
    /// Stop when the list ends
    #[default]
    Off,

    /// Loop the entire list
    All,

    /// Loop the current track only
    One,
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// No track
    Idle,

    /// Source attached, waiting for the device
    Loading,

    /// Currently playing
    Playing,

    /// Paused (also the safe state after errors)
    Paused,

    /// Track reached its end; resolved immediately by advance logic
    Ended,
}

impl PlayerStatus {
    /// Whether playback is, or is about to be, audible
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::Loading)
    }
}

/// Track in the ordered list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: String,

    /// Playable source handle passed to the media element
    pub source: String,

    /// Display title
    pub title: String,

    /// Duration in seconds, once known
    pub duration: Option<f64>,
}

impl Track {
    /// Create a track with an unknown duration
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            source: source.into(),
            duration: None,
        }
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// UI-facing view of the playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Index into the track list (`None` when the list is empty)
    pub index: Option<usize>,
    pub status: PlayerStatus,
    /// Position in seconds
    pub position: f64,
    /// Duration in seconds, unknown until loaded
    pub duration: Option<f64>,
    /// Volume (0-100)
    pub volume: u8,
    pub muted: bool,
    pub repeat: RepeatMode,
    pub shuffle: bool,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Fade-in duration in ms (default: 800)
    pub fade_in_ms: u64,

    /// Fade-out duration in ms (default: 800)
    pub fade_out_ms: u64,

    /// Initial volume (0-100, default: 80)
    pub volume: u8,

    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Initial shuffle flag (default: false)
    pub shuffle: bool,

    /// "Previous" restarts the current track past this position (default: 3 s)
    pub restart_threshold_secs: f64,

    /// Capacity of the event broadcast channel (default: 64)
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: 800,
            fade_out_ms: 800,
            volume: 80,
            repeat: RepeatMode::Off,
            shuffle: false,
            restart_threshold_secs: 3.0,
            event_capacity: 64,
        }
    }
}

impl PlaybackConfig {
    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }
}
