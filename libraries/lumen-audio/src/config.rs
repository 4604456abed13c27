//! Graph configuration
//!
//! Every audible parameter write is a ramp; the windows here control how long
//! those ramps take. Windows are kept inside 50-150 ms: shorter clicks,
//! longer feels laggy while dragging a slider.

use serde::{Deserialize, Serialize};

/// Shortest accepted ramp window (ms)
pub const MIN_RAMP_MS: f64 = 50.0;

/// Longest accepted ramp window (ms)
pub const MAX_RAMP_MS: f64 = 150.0;

/// Dynamics stage settings (compressor or limiter)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsSettings {
    /// Level above which gain reduction starts (dB)
    pub threshold_db: f32,
    /// Soft-knee width (dB, 0 = hard knee)
    pub knee_db: f32,
    /// Compression ratio (1.0 to 20.0)
    pub ratio: f32,
    /// Attack time (ms)
    pub attack_ms: f32,
    /// Release time (ms)
    pub release_ms: f32,
}

impl DynamicsSettings {
    /// Program compressor: moderate threshold, gentle knee, attack slow enough
    /// to let bass transients through, release long enough not to pump
    pub fn program() -> Self {
        Self {
            threshold_db: -18.0,
            knee_db: 12.0,
            ratio: 3.0,
            attack_ms: 20.0,
            release_ms: 250.0,
        }
    }

    /// Safety limiter: last-resort ceiling just under full scale
    pub fn safety_limiter() -> Self {
        Self {
            threshold_db: -1.0,
            knee_db: 0.0,
            ratio: 20.0,
            attack_ms: 1.0,
            release_ms: 50.0,
        }
    }

    /// Clamp settings to safe ranges
    pub fn validate(&mut self) {
        self.threshold_db = self.threshold_db.clamp(-60.0, 0.0);
        self.knee_db = self.knee_db.clamp(0.0, 40.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack_ms = self.attack_ms.clamp(0.1, 100.0);
        self.release_ms = self.release_ms.clamp(10.0, 1000.0);
    }
}

/// Processing graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Ramp window for the ten equalizer bands (ms)
    pub band_ramp_ms: f64,
    /// Ramp window for the tone stages (ms)
    pub tone_ramp_ms: f64,
    /// Ramp window for pre-gain and bass compensation (ms)
    pub staging_ramp_ms: f64,
    /// Ramp window for non-fade master gain writes (ms)
    pub master_ramp_ms: f64,
    /// High-pass cutoff (Hz)
    pub highpass_hz: f32,
    /// Program compressor
    pub compressor: DynamicsSettings,
    /// Safety limiter
    pub limiter: DynamicsSettings,
    /// Frames per render quantum; automation is evaluated once per quantum
    pub render_quantum: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            band_ramp_ms: 100.0,
            tone_ramp_ms: 100.0,
            staging_ramp_ms: 150.0,
            master_ramp_ms: 50.0,
            highpass_hz: 25.0,
            compressor: DynamicsSettings::program(),
            limiter: DynamicsSettings::safety_limiter(),
            render_quantum: 128,
        }
    }
}

impl GraphConfig {
    /// Clamp every field to its accepted range
    pub fn validate(&mut self) {
        for window in [
            &mut self.band_ramp_ms,
            &mut self.tone_ramp_ms,
            &mut self.staging_ramp_ms,
            &mut self.master_ramp_ms,
        ] {
            *window = window.clamp(MIN_RAMP_MS, MAX_RAMP_MS);
        }
        self.highpass_hz = self.highpass_hz.clamp(10.0, 40.0);
        self.compressor.validate();
        self.limiter.validate();
        self.render_quantum = self.render_quantum.clamp(16, 4096);
    }

    /// A validated copy
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}
