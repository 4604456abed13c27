//! Sleep timer
//!
//! One-second countdown that stops playback abruptly when it reaches zero.
//!
//! Remaining seconds live in a single shared cell that the UI (through a
//! `watch` receiver) and the countdown task both read. Each arm bumps a
//! generation; a tick from an older driver sees the mismatch and exits, so
//! two countdowns can never decrement the same value.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

const TICK: Duration = Duration::from_secs(1);

/// Called once when the countdown reaches zero
///
/// Runs with the countdown locked; it must not call back into the timer.
pub type ExpiryHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
struct Countdown {
    remaining: u64,
    generation: u64,
}

/// State the countdown driver works on, passed in as a handle
struct Shared {
    countdown: Mutex<Countdown>,
    display: watch::Sender<u64>,
}

impl Shared {
    fn publish(&self, remaining: u64) {
        self.display.send_replace(remaining);
    }
}

/// Sleep timer with a single countdown driver
pub struct SleepTimerController {
    shared: Arc<Shared>,
    driver: Mutex<Option<JoinHandle<()>>>,
    on_expire: ExpiryHandler,
}

impl SleepTimerController {
    pub fn new(on_expire: ExpiryHandler) -> Self {
        let (display, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                countdown: Mutex::new(Countdown::default()),
                display,
            }),
            driver: Mutex::new(None),
            on_expire,
        }
    }

    /// Start (or restart) the countdown; 0 disarms
    ///
    /// Must be called inside a tokio runtime.
    pub fn arm(&self, seconds: u64) {
        let mut driver = self.driver.lock();
        if let Some(previous) = driver.take() {
            previous.abort();
        }

        let generation = {
            let mut countdown = self.shared.countdown.lock();
            countdown.generation += 1;
            countdown.remaining = seconds;
            countdown.generation
        };
        self.shared.publish(seconds);

        if seconds == 0 {
            debug!("Sleep timer disarmed");
            return;
        }
        info!(seconds, "Sleep timer armed");

        let shared = self.shared.clone();
        let on_expire = self.on_expire.clone();
        let first_tick = Instant::now() + TICK;
        *driver = Some(tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, TICK);
            loop {
                ticker.tick().await;

                let mut countdown = shared.countdown.lock();
                if countdown.generation != generation {
                    return;
                }
                countdown.remaining = countdown.remaining.saturating_sub(1);
                shared.publish(countdown.remaining);

                if countdown.remaining == 0 {
                    info!("Sleep timer expired");
                    // Held through the handler so a concurrent re-arm or cancel
                    // waits for the stop to finish instead of racing it
                    on_expire();
                    return;
                }
            }
        }));
    }

    /// Arm for a number of minutes
    pub fn arm_minutes(&self, minutes: u64) {
        self.arm(minutes.saturating_mul(60));
    }

    /// Stop the countdown without touching playback
    pub fn cancel(&self) {
        self.arm(0);
    }

    /// Seconds left; 0 when disarmed
    pub fn remaining(&self) -> u64 {
        self.shared.countdown.lock().remaining
    }

    pub fn is_armed(&self) -> bool {
        self.remaining() > 0
    }

    /// Live countdown for display
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.display.subscribe()
    }
}

impl Drop for SleepTimerController {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.abort();
        }
    }
}
