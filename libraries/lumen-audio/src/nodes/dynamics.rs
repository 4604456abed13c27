/// Dynamics stage (compressor / limiter)
///
/// Two-stage design:
/// 1. Peak detector with instant attack and a fixed slow release, so the
///    detected level holds across waveform cycles
/// 2. Gain-reduction smoother using the configured attack/release
///
/// The same stage serves as the program compressor and the safety limiter;
/// only the `DynamicsSettings` differ.
use super::{AudioNode, RenderContext};
use crate::config::DynamicsSettings;

const NOISE_FLOOR_DB: f32 = -120.0;

/// Peak-hold release of the level detector (ms)
const PEAK_RELEASE_MS: f32 = 50.0;

/// Linked-stereo dynamics processor
#[derive(Debug, Clone)]
pub struct DynamicsNode {
    name: &'static str,
    settings: DynamicsSettings,

    peak_level_db: f32,
    gain_reduction_db: f32,

    peak_release_coeff: f32,
    attack_coeff: f32,
    release_coeff: f32,

    /// Sample rate the coefficients were computed for
    coeff_rate: Option<u32>,
}

impl DynamicsNode {
    /// Create a stage; settings are clamped to safe ranges
    pub fn new(name: &'static str, mut settings: DynamicsSettings) -> Self {
        settings.validate();
        Self {
            name,
            settings,
            peak_level_db: NOISE_FLOOR_DB,
            gain_reduction_db: 0.0,
            peak_release_coeff: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            coeff_rate: None,
        }
    }

    pub fn settings(&self) -> DynamicsSettings {
        self.settings
    }

    /// Current smoothed gain reduction (dB, <= 0)
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn update_coefficients(&mut self, sample_rate: u32) {
        if self.coeff_rate == Some(sample_rate) {
            return;
        }
        let per_ms = sample_rate.max(1) as f32 / 1000.0;
        self.peak_release_coeff = (-1.0 / (PEAK_RELEASE_MS * per_ms)).exp();
        self.attack_coeff = (-1.0 / (self.settings.attack_ms * per_ms)).exp();
        self.release_coeff = (-1.0 / (self.settings.release_ms * per_ms)).exp();
        self.coeff_rate = Some(sample_rate);
    }

    /// Static curve: output level for an input level (dB)
    #[inline]
    fn output_level(&self, input_db: f32) -> f32 {
        let DynamicsSettings {
            threshold_db,
            knee_db,
            ratio,
            ..
        } = self.settings;

        if knee_db <= 0.0 {
            if input_db <= threshold_db {
                input_db
            } else {
                threshold_db + (input_db - threshold_db) / ratio
            }
        } else {
            let knee_start = threshold_db - knee_db / 2.0;
            let knee_end = threshold_db + knee_db / 2.0;

            if input_db <= knee_start {
                input_db
            } else if input_db >= knee_end {
                threshold_db + (input_db - threshold_db) / ratio
            } else {
                // Quadratic transition through the knee
                let x = input_db - knee_start;
                input_db - (1.0 - 1.0 / ratio) / (2.0 * knee_db) * x * x
            }
        }
    }

    #[inline]
    fn track_peak(&mut self, input_db: f32) {
        if input_db > self.peak_level_db {
            self.peak_level_db = input_db;
        } else {
            // Decay toward the floor, not the input (input is -inf at zero crossings)
            self.peak_level_db =
                self.peak_release_coeff * (self.peak_level_db - NOISE_FLOOR_DB) + NOISE_FLOOR_DB;
        }
    }

    #[inline]
    fn smooth(&mut self, target_db: f32) {
        let coeff = if target_db < self.gain_reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain_reduction_db = coeff * self.gain_reduction_db + (1.0 - coeff) * target_db;
    }
}

impl AudioNode for DynamicsNode {
    fn process(&mut self, buffer: &mut [f32], ctx: &RenderContext) {
        self.update_coefficients(ctx.sample_rate);

        for frame in buffer.chunks_exact_mut(2) {
            let level = frame[0].abs().max(frame[1].abs());
            let input_db = if level > 1e-10 {
                20.0 * level.log10()
            } else {
                -200.0
            };

            self.track_peak(input_db);
            let target = self.output_level(self.peak_level_db) - self.peak_level_db;
            self.smooth(target);

            let gain = 10.0_f32.powf(self.gain_reduction_db / 20.0);
            frame[0] *= gain;
            frame[1] *= gain;
        }
    }

    fn reset(&mut self) {
        self.peak_level_db = NOISE_FLOOR_DB;
        self.gain_reduction_db = 0.0;
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::tests::{generate_sine, peak, settled_rms};

    const SR: u32 = 48000;

    fn ctx() -> RenderContext {
        RenderContext {
            sample_rate: SR,
            time: 0.0,
        }
    }

    #[test]
    fn quiet_signal_passes_untouched() {
        let mut comp = DynamicsNode::new("compressor", DynamicsSettings::program());
        let input = generate_sine(1000.0, 0.01, SR, 4800);
        let mut output = input.clone();
        comp.process(&mut output, &ctx());

        let ratio = settled_rms(&output) / settled_rms(&input);
        assert!((ratio - 1.0).abs() < 0.01, "ratio {ratio}");
    }

    #[test]
    fn loud_signal_is_compressed() {
        let mut comp = DynamicsNode::new("compressor", DynamicsSettings::program());
        let mut buffer = generate_sine(1000.0, 0.9, SR, SR as usize);
        comp.process(&mut buffer, &ctx());

        assert!(comp.gain_reduction_db() < -3.0);
        assert!(settled_rms(&buffer) < 0.9 / std::f32::consts::SQRT_2);
    }

    #[test]
    fn limiter_holds_ceiling() {
        let mut limiter = DynamicsNode::new("limiter", DynamicsSettings::safety_limiter());
        // +6 dBFS peaks
        let mut buffer = generate_sine(200.0, 2.0, SR, SR as usize);
        limiter.process(&mut buffer, &ctx());

        let tail = &buffer[buffer.len() / 2..];
        // At least ~5.6 dB pulled off the +6 dBFS input
        assert!(peak(tail) < 1.05, "peak {}", peak(tail));
    }

    #[test]
    fn soft_knee_is_continuous() {
        let comp = DynamicsNode::new("compressor", DynamicsSettings::program());
        let s = comp.settings();
        let start = s.threshold_db - s.knee_db / 2.0;
        let end = s.threshold_db + s.knee_db / 2.0;

        assert!((comp.output_level(start) - start).abs() < 1e-4);
        let expected_end = s.threshold_db + (end - s.threshold_db) / s.ratio;
        assert!((comp.output_level(end) - expected_end).abs() < 1e-3);
    }

    #[test]
    fn reset_releases_gain_reduction() {
        let mut comp = DynamicsNode::new("compressor", DynamicsSettings::program());
        let mut buffer = generate_sine(1000.0, 0.9, SR, 9600);
        comp.process(&mut buffer, &ctx());
        assert!(comp.gain_reduction_db() < 0.0);

        comp.reset();
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }
}
