//! Playback controller
//!
//! State machine over an ordered track list:
//!
//! ```text
//! Idle -> Loading -> Playing <-> Paused
//!                       |
//!                     Ended -> (repeat / advance) -> Playing | Paused
//! ```
//!
//! Every request that changes what the device should be doing takes a new
//! epoch. Play requests are single-flight: they queue on a lock, and at each
//! suspension point (graph resume, device start) they check whether a newer
//! request has moved the epoch on. If so they back off and leave the state to
//! the newer request. This is how a sleep-timer expiry or a track change wins
//! over a play that is still waiting for the device.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use lumen_audio::{AudioGraphManager, GraphAccess};
use lumen_core::{ErrorCategory, MediaElement, MediaErrorKind, MediaEvent};

use crate::advance::{DefaultAdvance, TrackAdvance};
use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlaybackEvent};
use crate::fade::{FadeEngine, FadeOutcome};
use crate::types::{PlaybackConfig, PlaybackState, PlayerStatus, RepeatMode, Track};
use crate::volume::Volume;

struct ControllerState {
    tracks: Vec<Track>,
    index: Option<usize>,
    status: PlayerStatus,
    position: f64,
    duration: Option<f64>,
    volume: Volume,
    repeat: RepeatMode,
    shuffle: bool,
}

impl ControllerState {
    fn current(&self) -> Option<&Track> {
        self.index.and_then(|i| self.tracks.get(i))
    }
}

struct Inner {
    element: Arc<dyn MediaElement>,
    graph: Arc<AudioGraphManager>,
    fade: FadeEngine,
    advance: Box<dyn TrackAdvance>,
    config: PlaybackConfig,
    events: EventBus,

    state: Mutex<ControllerState>,
    play_lock: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
}

/// Drives one media element through its processing graph
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<Inner>,
}

impl PlaybackController {
    /// Create a controller with sequential/shuffle advance rules
    pub fn new(
        element: Arc<dyn MediaElement>,
        graph: Arc<AudioGraphManager>,
        config: PlaybackConfig,
    ) -> Self {
        Self::with_advance(element, graph, config, Box::new(DefaultAdvance::new()))
    }

    /// Create a controller with custom advance rules
    pub fn with_advance(
        element: Arc<dyn MediaElement>,
        graph: Arc<AudioGraphManager>,
        config: PlaybackConfig,
        advance: Box<dyn TrackAdvance>,
    ) -> Self {
        let state = ControllerState {
            tracks: Vec::new(),
            index: None,
            status: PlayerStatus::Idle,
            position: 0.0,
            duration: None,
            volume: Volume::new(config.volume),
            repeat: config.repeat,
            shuffle: config.shuffle,
        };

        Self {
            inner: Arc::new(Inner {
                element,
                fade: FadeEngine::new(graph.clone()),
                graph,
                advance,
                events: EventBus::new(config.event_capacity),
                config,
                state: Mutex::new(state),
                play_lock: tokio::sync::Mutex::new(()),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    // ===== Queries =====

    /// Snapshot for the UI
    pub fn state(&self) -> PlaybackState {
        let state = self.inner.state.lock();
        PlaybackState {
            index: state.index,
            status: state.status,
            position: state.position,
            duration: state.duration,
            volume: state.volume.level(),
            muted: state.volume.is_muted(),
            repeat: state.repeat,
            shuffle: state.shuffle,
        }
    }

    pub fn status(&self) -> PlayerStatus {
        self.inner.state.lock().status
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.inner.state.lock().tracks.clone()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.inner.state.lock().current().cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    pub fn graph(&self) -> &Arc<AudioGraphManager> {
        &self.inner.graph
    }

    /// Whether a fade window is open
    pub fn is_fading(&self) -> bool {
        self.inner.fade.is_fading()
    }

    /// Live volume (0-100) including fades, for display smoothing
    pub fn effective_volume(&self) -> f32 {
        self.inner.fade.current_gain() * 100.0
    }

    // ===== Track list =====

    /// Replace the track list
    ///
    /// The current track keeps playing if it is still in the list. An empty
    /// list forces a hard stop.
    pub async fn set_tracks(&self, tracks: Vec<Track>) -> Result<()> {
        if tracks.is_empty() {
            self.inner.state.lock().tracks.clear();
            self.hard_stop();
            return Ok(());
        }

        let (index, unchanged, playing) = {
            let mut state = self.inner.state.lock();
            let current = state.current().cloned();
            state.tracks = tracks;

            let index = current
                .as_ref()
                .and_then(|track| state.tracks.iter().position(|t| t.id == track.id))
                .or(state.index.map(|i| i.min(state.tracks.len() - 1)))
                .unwrap_or(0);

            let unchanged = current.is_some_and(|track| {
                state.tracks[index].id == track.id && state.tracks[index].source == track.source
            });
            if unchanged {
                state.index = Some(index);
            }
            (index, unchanged, state.status.is_playing())
        };

        if unchanged {
            debug!(index, "Track list updated, current track kept");
            Ok(())
        } else {
            self.load(index, playing).await
        }
    }

    /// Jump to a track, keeping the play/pause intent
    pub async fn select_track(&self, index: usize) -> Result<()> {
        let playing = self.status().is_playing();
        self.load(index, playing).await
    }

    pub async fn next(&self) -> Result<()> {
        let (current, len, repeat, shuffle, playing) = self.position_in_list()?;
        match self.inner.advance.next(current, len, repeat, shuffle) {
            Some(index) => self.load(index, playing).await,
            None => {
                debug!("Already at the last track");
                Ok(())
            }
        }
    }

    /// Restart the current track, or step back when near its start
    pub async fn previous(&self) -> Result<()> {
        let (current, len, repeat, _, playing) = self.position_in_list()?;

        if self.inner.element.current_time() > self.inner.config.restart_threshold_secs {
            return self.seek(0.0);
        }
        match self.inner.advance.previous(current, len, repeat) {
            Some(index) => self.load(index, playing).await,
            None => self.seek(0.0),
        }
    }

    pub fn set_repeat(&self, repeat: RepeatMode) {
        self.inner.state.lock().repeat = repeat;
    }

    pub fn set_shuffle(&self, shuffle: bool) {
        self.inner.state.lock().shuffle = shuffle;
    }

    // ===== Transport =====

    /// Start (or resume) the current track with a fade-in
    ///
    /// Returns `Superseded` if a newer request took over while the device
    /// was starting; that is not a failure and is never reported to the UI.
    pub async fn play(&self) -> Result<()> {
        let epoch = self.bump_epoch();
        let _flight = self.inner.play_lock.lock().await;
        self.ensure_current(epoch)?;

        // Already audible; a fade-out in flight still needs to be undone below
        if self.status() == PlayerStatus::Playing
            && !self.inner.element.is_paused()
            && !self.inner.fade.is_fading()
        {
            return Ok(());
        }

        let track = self.current_track().ok_or(PlaybackError::EmptyTrackList)?;
        self.set_status(PlayerStatus::Loading);
        self.attach_if_needed(&track);

        // A missing graph is not fatal: playback continues unequalized
        if let GraphAccess::Fallback(Some(error)) = self.inner.graph.ensure_graph() {
            self.report(error.category(), error.to_string());
        }
        if let Err(error) = self.inner.graph.resume_if_suspended().await {
            return Err(self.fail(epoch, error.into()));
        }
        self.ensure_current(epoch)?;

        if let Err(error) = self.inner.element.play().await {
            return Err(self.fail(epoch, error.into()));
        }
        let Some(gain) = self.commit_playing(epoch) else {
            debug!(track = %track.id, "Play superseded while the device was starting");
            self.inner.element.pause();
            return Err(PlaybackError::Superseded);
        };
        debug!(track = %track.id, "Playing");
        self.emit(PlaybackEvent::StateChanged {
            status: PlayerStatus::Playing,
        });
        self.inner.fade.fade_in(gain, self.inner.config.fade_in());
        Ok(())
    }

    /// Fade out, then pause the device
    ///
    /// If anything newer happens during the fade (a play, a track change, a
    /// hard stop) the pause is abandoned.
    pub async fn pause(&self) -> Result<()> {
        let epoch = self.bump_epoch();

        match self.status() {
            PlayerStatus::Loading => {
                // The in-flight play sees the new epoch and backs off
                self.stop_now();
            }
            PlayerStatus::Playing => {
                let outcome = self.inner.fade.fade_out(self.inner.config.fade_out()).await;
                if outcome == FadeOutcome::Completed && self.is_current(epoch) {
                    self.inner.element.pause();
                    let position = self.inner.element.current_time();
                    {
                        let mut state = self.inner.state.lock();
                        state.status = PlayerStatus::Paused;
                        state.position = position;
                    }
                    debug!(position, "Paused");
                    self.emit(PlaybackEvent::StateChanged {
                        status: PlayerStatus::Paused,
                    });
                } else {
                    debug!("Pause superseded");
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn toggle(&self) -> Result<()> {
        if self.status().is_playing() {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Jump within the current track; fades are left alone
    pub fn seek(&self, position: f64) -> Result<()> {
        let position = {
            let mut state = self.inner.state.lock();
            if state.current().is_none() {
                return Err(PlaybackError::EmptyTrackList);
            }
            let end = state.duration.unwrap_or(f64::MAX);
            state.position = position.max(0.0).min(end);
            state.position
        };
        self.inner.element.seek(position);
        self.emit(PlaybackEvent::PositionUpdate { position });
        Ok(())
    }

    // ===== Volume =====

    /// Set volume (0-100)
    pub fn set_volume(&self, level: u8) {
        self.update_volume(|volume| volume.set_level(level));
    }

    pub fn mute(&self) {
        self.update_volume(Volume::mute);
    }

    pub fn unmute(&self) {
        self.update_volume(Volume::unmute);
    }

    pub fn toggle_mute(&self) {
        self.update_volume(Volume::toggle_mute);
    }

    // ===== Stops =====

    /// Stop without a fade and drop the source
    pub fn hard_stop(&self) {
        self.bump_epoch();
        self.inner.fade.cancel();
        self.inner.element.pause();
        self.inner.element.detach();
        {
            let mut state = self.inner.state.lock();
            state.status = PlayerStatus::Paused;
            state.position = 0.0;
            state.duration = None;
            if state.tracks.is_empty() {
                state.index = None;
            }
        }
        info!("Playback hard-stopped");
        self.emit(PlaybackEvent::StateChanged {
            status: PlayerStatus::Paused,
        });
    }

    /// Abrupt pause on sleep-timer expiry
    ///
    /// Beats any play request still waiting for the device.
    pub fn force_sleep_stop(&self) {
        self.bump_epoch();
        self.inner.fade.cancel();
        self.inner.element.pause();
        let position = self.inner.element.current_time();
        {
            let mut state = self.inner.state.lock();
            state.status = PlayerStatus::Paused;
            state.position = position;
        }
        info!(position, "Sleep timer stopped playback");
        self.emit(PlaybackEvent::SleepTimerExpired);
        self.emit(PlaybackEvent::StateChanged {
            status: PlayerStatus::Paused,
        });
    }

    // ===== Device events =====

    /// Feed an event reported by the media element
    pub async fn handle_event(&self, event: MediaEvent) {
        match event {
            MediaEvent::MetadataLoaded { duration } => {
                {
                    let mut state = self.inner.state.lock();
                    state.duration = Some(duration);
                    if let Some(index) = state.index {
                        if let Some(track) = state.tracks.get_mut(index) {
                            track.duration = Some(duration);
                        }
                    }
                }
                self.emit(PlaybackEvent::DurationChanged { duration });
            }
            MediaEvent::TimeUpdate { position } => {
                self.inner.state.lock().position = position;
                self.emit(PlaybackEvent::PositionUpdate { position });
            }
            MediaEvent::Ended => self.on_ended().await,
            MediaEvent::Error(error) if error.kind == MediaErrorKind::Aborted => {
                // A running device means a newer load replaced the aborted one.
                // A play still in flight settles the state itself.
                if self.status() == PlayerStatus::Playing && self.inner.element.is_paused() {
                    debug!(%error, "Device stopped by an abort");
                    self.stop_now();
                } else {
                    debug!(%error, "Ignoring aborted load");
                }
            }
            MediaEvent::Error(error) => {
                let epoch = self.inner.epoch.load(Ordering::SeqCst);
                self.fail(epoch, error.into());
            }
        }
    }

    async fn on_ended(&self) {
        let (index, len, repeat, shuffle) = {
            let mut state = self.inner.state.lock();
            state.status = PlayerStatus::Ended;
            (state.index, state.tracks.len(), state.repeat, state.shuffle)
        };
        self.emit(PlaybackEvent::StateChanged {
            status: PlayerStatus::Ended,
        });
        let Some(index) = index else {
            return;
        };

        let result = if repeat == RepeatMode::One {
            debug!(index, "Repeating track");
            self.inner.element.seek(0.0);
            self.inner.state.lock().position = 0.0;
            self.play().await
        } else {
            match self.inner.advance.next(index, len, repeat, shuffle) {
                Some(next) => self.load(next, true).await,
                None => {
                    self.finish_list();
                    Ok(())
                }
            }
        };

        if let Err(error) = result {
            debug!(%error, "Track advance did not start playback");
        }
    }

    /// End of list with nothing left to play
    fn finish_list(&self) {
        self.bump_epoch();
        self.inner.fade.cancel();
        self.inner.element.pause();
        self.inner.element.seek(0.0);
        {
            let mut state = self.inner.state.lock();
            state.status = PlayerStatus::Paused;
            state.position = 0.0;
        }
        debug!("Reached the end of the track list");
        self.emit(PlaybackEvent::StateChanged {
            status: PlayerStatus::Paused,
        });
    }

    // ===== Internals =====

    /// Make `index` current, then play it if `play`
    async fn load(&self, index: usize, play: bool) -> Result<()> {
        self.bump_epoch();
        let track = {
            let mut state = self.inner.state.lock();
            let track = state
                .tracks
                .get(index)
                .cloned()
                .ok_or(PlaybackError::IndexOutOfBounds(index))?;
            state.index = Some(index);
            state.position = 0.0;
            state.duration = track.duration;
            track
        };
        debug!(index, track = %track.id, play, "Loading track");
        self.emit(PlaybackEvent::TrackChanged {
            index,
            track_id: track.id.clone(),
        });

        if self.inner.element.source().as_deref() == Some(track.source.as_str()) {
            self.inner.element.seek(0.0);
        } else {
            self.inner.element.attach(&track.source);
        }

        if play {
            // The new track always starts from silence through the full start path
            self.inner.fade.silence();
            self.set_status(PlayerStatus::Loading);
            self.play().await
        } else {
            self.set_status(PlayerStatus::Paused);
            Ok(())
        }
    }

    fn attach_if_needed(&self, track: &Track) {
        if self.inner.element.source().as_deref() != Some(track.source.as_str()) {
            self.inner.element.attach(&track.source);
        }
    }

    /// Put playback in the safe paused state and report `error`
    ///
    /// Does nothing if a newer request already owns the state.
    fn fail(&self, epoch: u64, error: PlaybackError) -> PlaybackError {
        if !self.is_current(epoch) {
            debug!(%error, "Ignoring error from a superseded request");
            return error;
        }

        self.stop_now();
        match error.category() {
            Some(category) if category.is_user_visible() => {
                self.report(category, error.to_string());
            }
            _ => debug!(%error, "Playback interrupted"),
        }
        error
    }

    /// Pause immediately, no fade
    fn stop_now(&self) {
        self.bump_epoch();
        self.inner.fade.cancel();
        self.inner.element.pause();
        self.set_status(PlayerStatus::Paused);
    }

    /// Switch to `Playing` if `epoch` is still current, returning the fade target
    ///
    /// The epoch is compared under the state lock, so a stop that lands
    /// concurrently either wins outright or overwrites this afterwards.
    fn commit_playing(&self, epoch: u64) -> Option<f32> {
        let mut state = self.inner.state.lock();
        if !self.is_current(epoch) {
            return None;
        }
        state.status = PlayerStatus::Playing;
        Some(state.volume.gain())
    }

    fn report(&self, category: ErrorCategory, message: String) {
        warn!(?category, %message, "Playback error");
        self.emit(PlaybackEvent::Error { category, message });
    }

    fn update_volume(&self, change: impl FnOnce(&mut Volume)) {
        let volume = {
            let mut state = self.inner.state.lock();
            change(&mut state.volume);
            state.volume
        };
        self.inner.fade.set_volume(volume.gain());
        self.emit(PlaybackEvent::VolumeChanged {
            level: volume.level(),
            muted: volume.is_muted(),
        });
    }

    fn position_in_list(&self) -> Result<(usize, usize, RepeatMode, bool, bool)> {
        let state = self.inner.state.lock();
        let current = state.index.ok_or(PlaybackError::EmptyTrackList)?;
        Ok((
            current,
            state.tracks.len(),
            state.repeat,
            state.shuffle,
            state.status.is_playing(),
        ))
    }

    fn set_status(&self, status: PlayerStatus) {
        let changed = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut state.status, status) != status
        };
        if changed {
            self.emit(PlaybackEvent::StateChanged { status });
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        self.inner.events.emit(event);
    }

    fn bump_epoch(&self) -> u64 {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.epoch.load(Ordering::SeqCst) == epoch
    }

    fn ensure_current(&self, epoch: u64) -> Result<()> {
        if self.is_current(epoch) {
            Ok(())
        } else {
            Err(PlaybackError::Superseded)
        }
    }
}
