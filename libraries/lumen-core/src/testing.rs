//! Test doubles for the device sink
//!
//! Enabled with the `test-utils` feature.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::media::{MediaElement, MediaError, OutputId};

/// Calls recorded by `MockMediaElement`
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Attach(String),
    Detach,
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
}

#[derive(Debug)]
struct MockState {
    source: Option<String>,
    paused: bool,
    position: f64,
    duration: Option<f64>,
    volume: f32,
    calls: Vec<MediaCall>,
    play_results: VecDeque<Result<(), MediaError>>,
    play_delay: Duration,
}

/// Scriptable in-memory media element
///
/// `play` waits `play_delay` (virtual time under a paused tokio clock) to
/// model device readiness, then pops the next scripted result (success when
/// the script is empty).
#[derive(Debug)]
pub struct MockMediaElement {
    id: OutputId,
    state: Mutex<MockState>,
}

impl MockMediaElement {
    /// Create a paused element with no source
    pub fn new() -> Self {
        Self {
            id: OutputId::next(),
            state: Mutex::new(MockState {
                source: None,
                paused: true,
                position: 0.0,
                duration: None,
                volume: 1.0,
                calls: Vec::new(),
                play_results: VecDeque::new(),
                play_delay: Duration::ZERO,
            }),
        }
    }

    /// Delay every `play` call by this much
    pub fn with_play_delay(self, delay: Duration) -> Self {
        self.state.lock().play_delay = delay;
        self
    }

    /// Queue the result of the next `play` call
    pub fn push_play_result(&self, result: Result<(), MediaError>) {
        self.state.lock().play_results.push_back(result);
    }

    /// Pretend the device reported a duration
    pub fn set_duration(&self, duration: f64) {
        self.state.lock().duration = Some(duration);
    }

    /// Pretend playback advanced to a position
    pub fn set_position(&self, position: f64) {
        self.state.lock().position = position;
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<MediaCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls matching a predicate
    pub fn count(&self, pred: impl Fn(&MediaCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl Default for MockMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaElement for MockMediaElement {
    fn id(&self) -> OutputId {
        self.id
    }

    fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    fn attach(&self, source: &str) {
        let mut state = self.state.lock();
        state.source = Some(source.to_string());
        state.position = 0.0;
        state.duration = None;
        state.calls.push(MediaCall::Attach(source.to_string()));
    }

    fn detach(&self) {
        let mut state = self.state.lock();
        state.source = None;
        state.position = 0.0;
        state.duration = None;
        state.paused = true;
        state.calls.push(MediaCall::Detach);
    }

    async fn play(&self) -> Result<(), MediaError> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(MediaCall::Play);
            state.play_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let result = state.play_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            state.paused = false;
        }
        result
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.paused = true;
        state.calls.push(MediaCall::Pause);
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn seek(&self, position: f64) {
        let mut state = self.state.lock();
        state.position = position;
        state.calls.push(MediaCall::Seek(position));
    }

    fn current_time(&self) -> f64 {
        self.state.lock().position
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        let volume = volume.clamp(0.0, 1.0);
        state.volume = volume;
        state.calls.push(MediaCall::SetVolume(volume));
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }
}
