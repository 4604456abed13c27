//! Playback state machine tests
//!
//! Track transitions, fades across pause/track changes, overlapping play
//! requests, and error handling. Every test runs on a paused tokio clock, so
//! fade progress is exact.

use lumen_audio::{
    AudioGraphManager, ClockContextFactory, GraphConfig, GraphRegistry, UnavailableFactory,
};
use lumen_core::testing::{MediaCall, MockMediaElement};
use lumen_core::{ErrorCategory, MediaElement, MediaError, MediaErrorKind, MediaEvent};
use lumen_playback::{
    PlaybackConfig, PlaybackController, PlaybackError, PlaybackEvent, PlayerStatus, RepeatMode,
    Track,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

// ============================================================================
// HELPERS
// ============================================================================

struct Fixture {
    element: Arc<MockMediaElement>,
    factory: Arc<ClockContextFactory>,
    controller: PlaybackController,
}

fn fixture_with(element: MockMediaElement, factory: ClockContextFactory) -> Fixture {
    let element = Arc::new(element);
    let factory = Arc::new(factory);
    let graph = Arc::new(AudioGraphManager::new(
        element.clone(),
        Arc::new(GraphRegistry::new()),
        factory.clone(),
        GraphConfig::default(),
    ));
    let controller = PlaybackController::new(element.clone(), graph, PlaybackConfig::default());
    Fixture {
        element,
        factory,
        controller,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockMediaElement::new(), ClockContextFactory::new(48000))
}

fn tracks(n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| Track::new(format!("track-{i}"), format!("file:///music/{i}.flac")))
        .collect()
}

async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
}

fn master(f: &Fixture) -> f32 {
    f.controller.graph().master_gain_now().expect("graph built")
}

fn drain(events: &mut Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

fn error_categories(events: &[PlaybackEvent]) -> Vec<ErrorCategory> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::Error { category, .. } => Some(*category),
            _ => None,
        })
        .collect()
}

/// Playing track `index` with the fade-in finished
async fn playing(f: &Fixture, count: usize, index: usize) {
    f.controller.set_tracks(tracks(count)).await.unwrap();
    f.controller.select_track(index).await.unwrap();
    f.controller.play().await.unwrap();
    advance_ms(1000).await;
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
}

// ============================================================================
// TRACK END
// ============================================================================

#[tokio::test(start_paused = true)]
async fn repeat_one_restarts_same_track() {
    let f = fixture();
    f.controller.set_repeat(RepeatMode::One);
    playing(&f, 3, 1).await;
    f.element.set_position(181.0);

    f.controller.handle_event(MediaEvent::Ended).await;

    let state = f.controller.state();
    assert_eq!(state.index, Some(1));
    assert_eq!(state.position, 0.0);
    assert_eq!(state.status, PlayerStatus::Playing);
    assert_eq!(f.element.current_time(), 0.0);
    assert_eq!(f.element.source().as_deref(), Some("file:///music/1.flac"));
}

#[tokio::test(start_paused = true)]
async fn repeat_off_at_end_of_list_pauses_at_zero() {
    let f = fixture();
    playing(&f, 3, 2).await;
    f.element.set_position(200.0);

    f.controller.handle_event(MediaEvent::Ended).await;

    let state = f.controller.state();
    assert_eq!(state.status, PlayerStatus::Paused);
    assert_eq!(state.position, 0.0);
    assert_eq!(state.index, Some(2));
    assert!(f.element.is_paused());
    assert_eq!(f.element.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn track_end_advances_and_keeps_playing() {
    let f = fixture();
    playing(&f, 3, 0).await;

    f.controller.handle_event(MediaEvent::Ended).await;

    assert_eq!(f.controller.state().index, Some(1));
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
    assert_eq!(f.element.source().as_deref(), Some("file:///music/1.flac"));
}

#[tokio::test(start_paused = true)]
async fn repeat_all_wraps_to_first_track() {
    let f = fixture();
    f.controller.set_repeat(RepeatMode::All);
    playing(&f, 2, 1).await;

    f.controller.handle_event(MediaEvent::Ended).await;

    assert_eq!(f.controller.state().index, Some(0));
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
}

// ============================================================================
// EMPTY LIST
// ============================================================================

#[tokio::test(start_paused = true)]
async fn emptying_list_while_playing_hard_stops() {
    let f = fixture();
    f.controller.set_tracks(tracks(2)).await.unwrap();
    f.controller.play().await.unwrap();
    advance_ms(300).await;
    assert!(f.controller.is_fading());

    f.controller.set_tracks(Vec::new()).await.unwrap();

    let state = f.controller.state();
    assert_eq!(state.status, PlayerStatus::Paused);
    assert_eq!(state.position, 0.0);
    assert_eq!(state.index, None);
    assert_eq!(f.element.source(), None);
    assert!(f.element.is_paused());
    assert!(!f.controller.is_fading());
}

#[tokio::test(start_paused = true)]
async fn emptying_list_during_pause_fade_wins() {
    let f = fixture();
    playing(&f, 2, 0).await;

    let pausing = tokio::spawn({
        let controller = f.controller.clone();
        async move { controller.pause().await }
    });
    tokio::task::yield_now().await;
    advance_ms(200).await;

    f.controller.set_tracks(Vec::new()).await.unwrap();
    advance_ms(1000).await;
    pausing.await.unwrap().unwrap();

    assert_eq!(f.controller.status(), PlayerStatus::Paused);
    assert_eq!(f.element.source(), None);
    assert_eq!(f.controller.state().position, 0.0);
}

#[tokio::test(start_paused = true)]
async fn list_update_keeps_current_track() {
    let f = fixture();
    playing(&f, 3, 1).await;
    f.element.clear_calls();

    let mut updated = tracks(3);
    updated.insert(0, Track::new("new", "file:///music/new.flac"));
    f.controller.set_tracks(updated).await.unwrap();

    assert_eq!(f.controller.state().index, Some(2));
    assert_eq!(f.controller.current_track().unwrap().id, "track-1");
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
    assert!(f.element.calls().is_empty());
}

// ============================================================================
// FADES ACROSS TRANSITIONS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn pause_waits_for_fade_out() {
    let f = fixture();
    playing(&f, 1, 0).await;
    assert!((master(&f) - 0.8).abs() < 1e-6);

    let pausing = tokio::spawn({
        let controller = f.controller.clone();
        async move { controller.pause().await }
    });
    tokio::task::yield_now().await;

    advance_ms(400).await;
    assert!((master(&f) - 0.4).abs() < 1e-3);
    assert!(!f.element.is_paused());
    assert_eq!(f.controller.status(), PlayerStatus::Playing);

    advance_ms(401).await;
    pausing.await.unwrap().unwrap();
    assert!(f.element.is_paused());
    assert_eq!(f.controller.status(), PlayerStatus::Paused);
    assert_eq!(master(&f), 0.0);
}

#[tokio::test(start_paused = true)]
async fn switching_track_mid_fade_out_starts_fresh_fade_in() {
    let f = fixture();
    playing(&f, 2, 0).await;

    let pausing = tokio::spawn({
        let controller = f.controller.clone();
        async move { controller.pause().await }
    });
    tokio::task::yield_now().await;
    advance_ms(300).await;
    let partial = master(&f);
    assert!(partial > 0.0 && partial < 0.8, "partial gain {partial}");

    f.controller.select_track(1).await.unwrap();

    // Track B starts from silence, not from A's partial gain
    assert_eq!(master(&f), 0.0);
    assert_eq!(f.element.source().as_deref(), Some("file:///music/1.flac"));

    advance_ms(400).await;
    assert!((master(&f) - 0.4).abs() < 1e-3);

    advance_ms(401).await;
    pausing.await.unwrap().unwrap();
    assert_eq!(master(&f), 0.8);
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
    assert!(!f.element.is_paused());
    assert_eq!(f.element.count(|c| *c == MediaCall::Pause), 0);
}

#[tokio::test(start_paused = true)]
async fn next_while_playing_fades_in_from_zero() {
    let f = fixture();
    playing(&f, 2, 0).await;
    assert_eq!(master(&f), 0.8);
    f.element.clear_calls();

    f.controller.next().await.unwrap();

    assert_eq!(f.element.source().as_deref(), Some("file:///music/1.flac"));
    assert!(f.element.calls().contains(&MediaCall::Play));
    assert_eq!(master(&f), 0.0);
    assert!(f.controller.is_fading());

    advance_ms(400).await;
    assert!((master(&f) - 0.4).abs() < 1e-3);

    advance_ms(401).await;
    assert_eq!(master(&f), 0.8);
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn play_during_fade_out_abandons_pause() {
    let f = fixture();
    playing(&f, 1, 0).await;

    let pausing = tokio::spawn({
        let controller = f.controller.clone();
        async move { controller.pause().await }
    });
    tokio::task::yield_now().await;
    advance_ms(200).await;

    f.controller.play().await.unwrap();
    advance_ms(1000).await;
    pausing.await.unwrap().unwrap();

    assert_eq!(f.controller.status(), PlayerStatus::Playing);
    assert!(!f.element.is_paused());
    assert_eq!(master(&f), 0.8);
}

#[tokio::test(start_paused = true)]
async fn effective_volume_follows_fade() {
    let f = fixture();
    f.controller.set_tracks(tracks(1)).await.unwrap();
    f.controller.set_volume(60);

    f.controller.play().await.unwrap();
    advance_ms(400).await;
    assert!((f.controller.effective_volume() - 30.0).abs() < 0.1);

    advance_ms(401).await;
    assert!((f.controller.effective_volume() - 60.0).abs() < 1e-3);
}

#[tokio::test(start_paused = true)]
async fn seek_leaves_fade_alone() {
    let f = fixture();
    f.controller.set_tracks(tracks(1)).await.unwrap();
    f.controller.play().await.unwrap();
    advance_ms(200).await;

    f.controller.seek(30.0).unwrap();
    assert!(f.controller.is_fading());
    assert_eq!(f.element.current_time(), 30.0);

    advance_ms(200).await;
    assert!((master(&f) - 0.4).abs() < 1e-3);
}

// ============================================================================
// SINGLE-FLIGHT PLAY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn overlapping_plays_resume_once() {
    let f = fixture_with(
        MockMediaElement::new().with_play_delay(Duration::from_millis(200)),
        ClockContextFactory::new(48000).with_resume_latency(Duration::from_millis(100)),
    );
    f.controller.set_tracks(tracks(1)).await.unwrap();
    f.element.clear_calls();

    let (first, second) = tokio::join!(f.controller.play(), f.controller.play());

    assert!(matches!(first, Err(PlaybackError::Superseded)));
    assert!(second.is_ok());
    assert_eq!(f.factory.created(), 1);
    assert_eq!(f.factory.last_context().unwrap().resume_count(), 1);
    assert_eq!(f.element.count(|c| matches!(c, MediaCall::Attach(_))), 0);
    assert_eq!(f.element.count(|c| *c == MediaCall::Play), 1);
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn pause_while_loading_wins() {
    let f = fixture_with(
        MockMediaElement::new().with_play_delay(Duration::from_millis(300)),
        ClockContextFactory::new(48000),
    );
    f.controller.set_tracks(tracks(1)).await.unwrap();

    let starting = tokio::spawn({
        let controller = f.controller.clone();
        async move { controller.play().await }
    });
    tokio::task::yield_now().await;
    assert_eq!(f.controller.status(), PlayerStatus::Loading);

    f.controller.pause().await.unwrap();
    advance_ms(400).await;

    assert!(matches!(
        starting.await.unwrap(),
        Err(PlaybackError::Superseded)
    ));
    assert_eq!(f.controller.status(), PlayerStatus::Paused);
    assert!(f.element.is_paused());
}

// ============================================================================
// ERRORS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn decode_failure_pauses_and_reports() {
    let f = fixture();
    f.controller.set_tracks(tracks(1)).await.unwrap();
    let mut events = f.controller.subscribe();
    f.element
        .push_play_result(Err(MediaError::new(MediaErrorKind::Decode, "corrupt frame")));

    let result = f.controller.play().await;

    assert!(matches!(result, Err(PlaybackError::Media(_))));
    assert_eq!(f.controller.status(), PlayerStatus::Paused);
    assert_eq!(error_categories(&drain(&mut events)), vec![ErrorCategory::Decode]);
}

#[tokio::test(start_paused = true)]
async fn aborted_play_is_not_reported() {
    let f = fixture();
    f.controller.set_tracks(tracks(1)).await.unwrap();
    let mut events = f.controller.subscribe();
    f.element.push_play_result(Err(MediaError::aborted()));

    let error = f.controller.play().await.unwrap_err();

    assert!(error.is_abort());
    assert_eq!(f.controller.status(), PlayerStatus::Paused);
    assert!(error_categories(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn network_error_event_while_playing() {
    let f = fixture();
    playing(&f, 2, 0).await;
    let mut events = f.controller.subscribe();

    f.controller
        .handle_event(MediaEvent::Error(MediaError::new(
            MediaErrorKind::Network,
            "connection reset",
        )))
        .await;

    assert_eq!(f.controller.status(), PlayerStatus::Paused);
    assert!(f.element.is_paused());
    assert_eq!(error_categories(&drain(&mut events)), vec![ErrorCategory::Network]);

    // Retried only when the caller plays again
    f.controller.play().await.unwrap();
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn abort_event_is_ignored() {
    let f = fixture();
    playing(&f, 2, 0).await;
    let mut events = f.controller.subscribe();

    f.controller
        .handle_event(MediaEvent::Error(MediaError::aborted()))
        .await;

    assert_eq!(f.controller.status(), PlayerStatus::Playing);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn abort_with_stopped_device_pauses_quietly() {
    let f = fixture();
    playing(&f, 2, 0).await;
    let mut events = f.controller.subscribe();
    f.element.pause();

    f.controller
        .handle_event(MediaEvent::Error(MediaError::aborted()))
        .await;

    assert_eq!(f.controller.status(), PlayerStatus::Paused);
    assert!(!f.controller.is_fading());
    assert!(error_categories(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn abort_during_loading_leaves_play_in_flight() {
    let f = fixture_with(
        MockMediaElement::new().with_play_delay(Duration::from_millis(200)),
        ClockContextFactory::new(48000),
    );
    f.controller.set_tracks(tracks(2)).await.unwrap();
    let mut events = f.controller.subscribe();

    let starting = tokio::spawn({
        let controller = f.controller.clone();
        async move { controller.play().await }
    });
    tokio::task::yield_now().await;
    assert_eq!(f.controller.status(), PlayerStatus::Loading);

    f.controller
        .handle_event(MediaEvent::Error(MediaError::aborted()))
        .await;
    assert_eq!(f.controller.status(), PlayerStatus::Loading);

    advance_ms(200).await;
    starting.await.unwrap().unwrap();
    assert_eq!(f.controller.status(), PlayerStatus::Playing);
    assert!(error_categories(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_device_plays_unequalized_and_reports_once() {
    let element = Arc::new(MockMediaElement::new());
    let graph = Arc::new(AudioGraphManager::new(
        element.clone(),
        Arc::new(GraphRegistry::new()),
        Arc::new(UnavailableFactory::new("no output device")),
        GraphConfig::default(),
    ));
    let controller = PlaybackController::new(element.clone(), graph, PlaybackConfig::default());
    controller.set_tracks(tracks(2)).await.unwrap();
    let mut events = controller.subscribe();

    controller.play().await.unwrap();
    assert_eq!(controller.status(), PlayerStatus::Playing);
    assert!((element.volume() - 0.8).abs() < 1e-6);

    controller.pause().await.unwrap();
    controller.play().await.unwrap();
    controller.set_volume(50);
    assert!((element.volume() - 0.5).abs() < 1e-6);

    assert_eq!(
        error_categories(&drain(&mut events)),
        vec![ErrorCategory::DeviceUnavailable]
    );
}
