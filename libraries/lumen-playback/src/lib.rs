//! Lumen Playback
//!
//! Playback control on top of the Lumen processing graph.
//!
//! This crate provides:
//! - Playback state machine (load, play/pause, seek, next/previous, track end)
//! - Fade-in/fade-out on the graph's master gain
//! - Volume with mute
//! - Sleep timer that stops playback abruptly on expiry
//! - Equalizer controller with observers and background persistence
//! - Repeat modes (Off, All, One) and shuffle
//! - Broadcast events for UI synchronization
//!
//! # Example: Session
//!
//! ```rust,no_run
//! use lumen_audio::{ClockContextFactory, GraphConfig, GraphRegistry};
//! use lumen_core::{EqBand, MemoryStore, MediaElement};
//! use lumen_playback::{PlaybackConfig, PlayerSession, Track};
//! use std::sync::Arc;
//!
//! # async fn run(element: Arc<dyn MediaElement>) -> lumen_playback::Result<()> {
//! let session = PlayerSession::new(
//!     element,
//!     Arc::new(GraphRegistry::new()),
//!     Arc::new(ClockContextFactory::new(48000)),
//!     Arc::new(MemoryStore::new()),
//!     GraphConfig::default(),
//!     PlaybackConfig::default(),
//! );
//! session.init().await;
//!
//! session
//!     .playback
//!     .set_tracks(vec![Track::new("intro", "file:///music/intro.flac")])
//!     .await?;
//! session.playback.play().await?;
//!
//! session.equalizer.set_band(EqBand::SubBass, 4.0);
//! session.sleep_timer.arm_minutes(30);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod advance;
pub mod controller;
pub mod equalizer;
mod error;
pub mod events;
pub mod fade;
pub mod session;
pub mod timer;
pub mod types;
pub mod volume;

pub use advance::{DefaultAdvance, TrackAdvance};
pub use controller::PlaybackController;
pub use equalizer::{EqualizerController, SettingsObserver};
pub use error::{PlaybackError, Result};
pub use events::{EventBus, PlaybackEvent};
pub use fade::{FadeEngine, FadeOutcome};
pub use session::PlayerSession;
pub use timer::{ExpiryHandler, SleepTimerController};
pub use types::{PlaybackConfig, PlaybackState, PlayerStatus, RepeatMode, Track};
pub use volume::Volume;
