//! Playback Events
//!
//! Event-based communication for UI synchronization. Events are broadcast at:
//! - State changes (loading/playing/paused/idle)
//! - Track changes
//! - Duration and position reports from the device
//! - Volume changes
//! - Categorized errors (aborts are never emitted)
//! - Sleep timer expiry

use lumen_core::ErrorCategory;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::PlayerStatus;

/// Events emitted by the playback system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Controller state changed
    StateChanged {
        /// The new state
        status: PlayerStatus,
    },

    /// Current track changed
    TrackChanged {
        /// Index into the track list
        index: usize,
        /// ID of the new track
        track_id: String,
    },

    /// The device reported the track duration
    DurationChanged {
        /// Duration in seconds
        duration: f64,
    },

    /// Position update from the device
    PositionUpdate {
        /// Position in seconds
        position: f64,
    },

    /// Volume changed
    VolumeChanged {
        /// New volume level (0-100)
        level: u8,
        /// Whether audio is muted
        muted: bool,
    },

    /// A user-visible failure
    Error {
        /// Category for the UI message
        category: ErrorCategory,
        /// Detail
        message: String,
    },

    /// The sleep timer ran out and stopped playback
    SleepTimerExpired,
}

/// Broadcast sender for playback events
///
/// Sending never fails: with no subscribers the event is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlaybackEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event: PlaybackEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        bus.emit(PlaybackEvent::SleepTimerExpired);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(PlaybackEvent::StateChanged {
            status: PlayerStatus::Loading,
        });
        bus.emit(PlaybackEvent::StateChanged {
            status: PlayerStatus::Playing,
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            PlaybackEvent::StateChanged {
                status: PlayerStatus::Loading
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            PlaybackEvent::StateChanged {
                status: PlayerStatus::Playing
            }
        );
    }

    #[test]
    fn events_serialize() {
        let event = PlaybackEvent::Error {
            category: ErrorCategory::Network,
            message: "timeout".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("network"));
    }
}
