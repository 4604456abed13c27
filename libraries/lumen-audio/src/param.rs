//! Automated audio parameters
//!
//! An `AudioParam` holds a timeline of scheduled values in context time
//! (seconds). Writers schedule ramps; the render path evaluates the timeline
//! at each quantum (or frame) start. Nothing audible is ever written as a step:
//! `ramp_to` holds the current value and ramps from there.

/// A scheduled automation event
#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    /// Jump to `value` at `time`
    SetValue { time: f64, value: f32 },
    /// Arrive at `value` at `time`, linearly from the previous event
    LinearRamp { time: f64, value: f32 },
}

impl Automation {
    fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. } | Automation::LinearRamp { time, .. } => time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            Automation::SetValue { value, .. } | Automation::LinearRamp { value, .. } => value,
        }
    }
}

/// Smoothly automatable parameter
#[derive(Debug, Clone)]
pub struct AudioParam {
    name: &'static str,
    min: f32,
    max: f32,

    /// Value before the first event
    intrinsic: f32,

    /// Start point of a ramp with no preceding event
    anchor_time: f64,

    /// Events sorted by time
    events: Vec<Automation>,
}

impl AudioParam {
    /// Create a parameter with a fixed range
    pub fn new(name: &'static str, value: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            min,
            max,
            intrinsic: value.clamp(min, max),
            anchor_time: 0.0,
            events: Vec::new(),
        }
    }

    /// Parameter name (for debugging)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Accepted range
    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Replace the value outright, dropping all automation
    ///
    /// Only for initial setup before anything is audible.
    pub fn set_value(&mut self, value: f32) {
        self.events.clear();
        self.intrinsic = value.clamp(self.min, self.max);
        self.anchor_time = 0.0;
    }

    /// Schedule a jump to `value` at `time`
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(Automation::SetValue {
            time,
            value: value.clamp(self.min, self.max),
        });
    }

    /// Schedule a linear ramp that arrives at `value` at `end_time`
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(Automation::LinearRamp {
            time: end_time,
            value: value.clamp(self.min, self.max),
        });
    }

    /// Drop every event at or after `time`
    ///
    /// A ramp that was in flight at `time` is removed entirely, so the value
    /// falls back to the previous event. Use `cancel_and_hold` to freeze it.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Drop every event strictly after `time`, keeping one that lands on it
    pub fn cancel_after(&mut self, time: f64) {
        self.events.retain(|e| e.time() <= time);
    }

    /// Drop every event after `time` and hold the value it had at `time`
    pub fn cancel_and_hold(&mut self, time: f64) -> f32 {
        let held = self.value_at(time);
        self.cancel_scheduled_values(time);
        self.set_value_at_time(held, time);
        held
    }

    /// Ramp from the current value at `now` to `target` over `window` seconds
    pub fn ramp_to(&mut self, target: f32, now: f64, window: f64) {
        self.cancel_and_hold(now);
        self.linear_ramp_to_value_at_time(target, now + window.max(0.0));
    }

    /// Value the timeline produces at `time`
    pub fn value_at(&self, time: f64) -> f32 {
        // Index of the first event strictly after `time`
        let next = self.events.partition_point(|e| e.time() <= time);

        let (prev_time, prev_value) = match next.checked_sub(1).map(|i| self.events[i]) {
            Some(event) => (event.time(), event.value()),
            None => (self.anchor_time, self.intrinsic),
        };

        match self.events.get(next) {
            Some(Automation::LinearRamp { time: end, value: target }) => {
                let span = end - prev_time;
                if span <= 0.0 {
                    return *target;
                }
                let progress = ((time - prev_time) / span).clamp(0.0, 1.0) as f32;
                prev_value + (target - prev_value) * progress
            }
            _ => prev_value,
        }
    }

    /// Value once every scheduled event has played out
    pub fn target(&self) -> f32 {
        self.events.last().map_or(self.intrinsic, |e| e.value())
    }

    /// Whether any event lies after `time`
    pub fn is_automating(&self, time: f64) -> bool {
        self.events.last().is_some_and(|e| e.time() > time)
    }

    /// Time at which the last scheduled event completes
    pub fn automation_end(&self) -> Option<f64> {
        self.events.last().map(|e| e.time())
    }

    /// Fold events that lie entirely in the past into the intrinsic value
    ///
    /// The most recent past event is kept as the start point of any ramp that
    /// is still in flight.
    pub fn prune(&mut self, now: f64) {
        let past = self.events.partition_point(|e| e.time() <= now);
        if past == 0 {
            return;
        }

        let last_past = self.events[past - 1];
        if past == self.events.len() {
            self.intrinsic = last_past.value();
            self.anchor_time = last_past.time();
            self.events.clear();
        } else if past > 1 {
            self.events.drain(..past - 1);
        }
    }

    /// Number of pending events (for tests and diagnostics)
    pub fn scheduled_len(&self) -> usize {
        self.events.len()
    }

    fn insert(&mut self, event: Automation) {
        // Later writes at the same time win, so insert after equal timestamps
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
    }
}
