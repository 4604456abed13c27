//! Fade engine
//!
//! Sole writer of the graph's master gain. Fades and volume changes both go
//! through here, so a slider drag can never fight a fade in the same tick.
//!
//! - `fade_in` cancels whatever is scheduled, pins the gain to 0 at "now" and
//!   ramps linearly to the target.
//! - `fade_out` holds the current (possibly mid-ramp) gain and ramps to 0;
//!   the returned future resolves when the window has elapsed, reporting
//!   whether a newer fade took over in the meantime.
//! - Without a graph every operation collapses to an instant element volume.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use lumen_audio::AudioGraphManager;

/// How an awaited fade-out finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    /// The ramp ran its full window
    Completed,
    /// A newer fade (or a cancel) replaced it before it finished
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeKind {
    In,
    Out,
}

#[derive(Debug, Clone, Copy)]
struct ActiveFade {
    kind: FadeKind,
    generation: u64,
    /// Context time the ramp reaches its target
    ends_at: f64,
}

/// Master-gain fades
pub struct FadeEngine {
    graph: Arc<AudioGraphManager>,
    generation: AtomicU64,
    active: Mutex<Option<ActiveFade>>,
}

impl FadeEngine {
    pub fn new(graph: Arc<AudioGraphManager>) -> Self {
        Self {
            graph,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Ramp master gain from 0 to `target` over `duration`
    pub fn fade_in(&self, target: f32, duration: Duration) {
        let generation = self.next_generation();
        let window = duration.as_secs_f64();

        let scheduled = self.graph.with_master(|param, now| {
            param.cancel_scheduled_values(now);
            param.set_value_at_time(0.0, now);
            param.linear_ramp_to_value_at_time(target, now + window);
            now + window
        });

        match scheduled {
            Some(ends_at) => {
                debug!(target, window, "Fade in");
                *self.active.lock() = Some(ActiveFade {
                    kind: FadeKind::In,
                    generation,
                    ends_at,
                });
            }
            None => {
                self.active.lock().take();
                self.graph.set_master_gain(target);
            }
        }
    }

    /// Ramp master gain from its current value to 0 and wait for the window
    pub async fn fade_out(&self, duration: Duration) -> FadeOutcome {
        let generation = self.next_generation();
        let window = duration.as_secs_f64();

        let scheduled = self.graph.with_master(|param, now| {
            param.cancel_and_hold(now);
            param.linear_ramp_to_value_at_time(0.0, now + window);
            now + window
        });

        let Some(ends_at) = scheduled else {
            // Nothing to fade; the caller pauses straight away
            self.active.lock().take();
            return FadeOutcome::Completed;
        };

        debug!(window, "Fade out");
        *self.active.lock() = Some(ActiveFade {
            kind: FadeKind::Out,
            generation,
            ends_at,
        });

        tokio::time::sleep(duration).await;

        let mut active = self.active.lock();
        if self.generation.load(Ordering::SeqCst) == generation {
            active.take();
            FadeOutcome::Completed
        } else {
            debug!("Fade out superseded");
            FadeOutcome::Superseded
        }
    }

    /// Abandon any fade, freezing master gain where it is
    pub fn cancel(&self) {
        self.next_generation();
        self.active.lock().take();
        self.graph.with_master(|param, now| param.cancel_and_hold(now));
    }

    /// Abandon any fade and drop master gain to 0 at once
    ///
    /// Used when the source changes under an audible output; the next
    /// `fade_in` brings it back.
    pub fn silence(&self) {
        self.next_generation();
        self.active.lock().take();
        let silenced = self.graph.with_master(|param, now| {
            param.cancel_scheduled_values(now);
            param.set_value_at_time(0.0, now);
        });
        if silenced.is_none() {
            self.graph.set_master_gain(0.0);
        }
    }

    /// Whether a fade window is still open
    pub fn is_fading(&self) -> bool {
        self.current().is_some()
    }

    /// Volume path outside fades
    ///
    /// During a fade-in the new gain is scheduled to follow the fade's end;
    /// during a fade-out it is dropped (the next play fades in to the
    /// controller's volume anyway).
    pub fn set_volume(&self, gain: f32) {
        let master_window = self.graph.config().master_ramp_ms / 1000.0;

        match self.current() {
            Some(fade) if fade.kind == FadeKind::In => {
                self.graph.with_master(|param, _| {
                    param.cancel_after(fade.ends_at);
                    param.linear_ramp_to_value_at_time(gain, fade.ends_at + master_window);
                });
            }
            Some(_) => debug!(gain, "Volume change suppressed during fade out"),
            None => self.graph.set_master_gain(gain),
        }
    }

    /// Live master gain (0.0-1.0), including mid-fade values
    pub fn current_gain(&self) -> f32 {
        self.graph
            .master_gain_now()
            .unwrap_or_else(|| self.graph.element_volume())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The open fade, clearing it once its window has passed
    fn current(&self) -> Option<ActiveFade> {
        let mut active = self.active.lock();
        let fade = (*active)?;
        let still_open = self
            .graph
            .current_time()
            .is_some_and(|now| now < fade.ends_at)
            && self.generation.load(Ordering::SeqCst) == fade.generation;
        if still_open {
            Some(fade)
        } else {
            active.take();
            None
        }
    }
}
