//! Audio context abstraction
//!
//! A context supplies the clock parameter automation is scheduled against and
//! the suspended/running/closed lifecycle of the output device. Contexts are
//! created through a `ContextFactory` so the graph registry can defer
//! construction until the first play gesture and tests can stand in a
//! virtual-time clock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{AudioError, Result};

/// Lifecycle of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not producing audio (needs a gesture to resume)
    Suspended,
    /// Producing audio
    Running,
    /// Closed or errored; must be recreated
    Closed,
}

/// Output device clock and lifecycle
#[async_trait]
pub trait AudioContext: Send + Sync {
    /// Context time in seconds; monotonic, keeps advancing while suspended
    fn current_time(&self) -> f64;

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    fn state(&self) -> ContextState;

    /// Resume a suspended context (no-op when running)
    async fn resume(&self) -> Result<()>;

    /// Suspend a running context
    async fn suspend(&self) -> Result<()>;

    /// Close the context for good
    async fn close(&self);
}

/// Creates contexts on demand
pub trait ContextFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn AudioContext>>;
}

/// Context driven by the tokio clock
///
/// Under `tokio::time::pause()` time only moves when the test advances it, so
/// ramps and fades can be checked deterministically.
#[derive(Debug)]
pub struct ClockContext {
    origin: Instant,
    sample_rate: u32,
    state: Mutex<ContextState>,
    resume_latency: Duration,
    resumes: AtomicUsize,
}

impl ClockContext {
    /// Create a suspended context
    pub fn new(sample_rate: u32) -> Self {
        Self {
            origin: Instant::now(),
            sample_rate,
            state: Mutex::new(ContextState::Suspended),
            resume_latency: Duration::ZERO,
            resumes: AtomicUsize::new(0),
        }
    }

    /// Make `resume` take this long (device wake-up)
    pub fn with_resume_latency(mut self, latency: Duration) -> Self {
        self.resume_latency = latency;
        self
    }

    /// Number of suspended-to-running transitions so far
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioContext for ClockContext {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<()> {
        match self.state() {
            ContextState::Running => return Ok(()),
            ContextState::Closed => return Err(AudioError::ContextClosed),
            ContextState::Suspended => {}
        }

        if !self.resume_latency.is_zero() {
            tokio::time::sleep(self.resume_latency).await;
        }

        let mut state = self.state.lock();
        match *state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                *state = ContextState::Running;
                self.resumes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn suspend(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                *state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    async fn close(&self) {
        *self.state.lock() = ContextState::Closed;
    }
}

/// Factory producing `ClockContext`s
#[derive(Debug)]
pub struct ClockContextFactory {
    sample_rate: u32,
    resume_latency: Duration,
    created: AtomicUsize,
    last: Mutex<Option<Arc<ClockContext>>>,
}

impl ClockContextFactory {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            resume_latency: Duration::ZERO,
            created: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    /// Contexts created by this factory resume after `latency`
    pub fn with_resume_latency(mut self, latency: Duration) -> Self {
        self.resume_latency = latency;
        self
    }

    /// How many contexts have been created
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// The most recently created context
    pub fn last_context(&self) -> Option<Arc<ClockContext>> {
        self.last.lock().clone()
    }
}

impl ContextFactory for ClockContextFactory {
    fn create(&self) -> Result<Arc<dyn AudioContext>> {
        let context =
            Arc::new(ClockContext::new(self.sample_rate).with_resume_latency(self.resume_latency));
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(context.clone());
        Ok(context)
    }
}

/// Factory for hosts without a usable audio API
#[derive(Debug, Clone)]
pub struct UnavailableFactory {
    reason: String,
}

impl UnavailableFactory {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ContextFactory for UnavailableFactory {
    fn create(&self) -> Result<Arc<dyn AudioContext>> {
        Err(AudioError::DeviceUnavailable(self.reason.clone()))
    }
}
