//! Gain staging policy
//!
//! Keeps the chain from clipping when bands are boosted. Low-frequency boosts
//! carry most of the energy, so they drive both an input attenuation
//! (pre-gain) and a post-EQ make-up gain (bass compensation) that restores
//! part of the perceived level the attenuation took away.
//!
//! Pure: settings in, two factors out.

use lumen_core::{EqBand, EqualizerSettings, Tone};

/// Pre-gain with every control flat (30% headroom)
pub const BASE_PRE_GAIN: f32 = 0.70;

/// Lowest pre-gain the policy will produce
pub const MIN_PRE_GAIN: f32 = 0.40;

/// Highest pre-gain the policy will produce
pub const MAX_PRE_GAIN: f32 = 0.85;

/// Extra pre-gain reduction at full bass boost
const BASS_PRE_GAIN_REDUCTION: f32 = 0.30;

/// Combined bass boost at which the bass terms saturate (dB)
const BASS_SPAN_DB: f32 = 24.0;

/// Total boost at which the overall reduction starts (dB)
const TOTAL_BOOST_KNEE_DB: f32 = 20.0;

/// Total boost at which the overall reduction saturates (dB)
const TOTAL_BOOST_CEILING_DB: f32 = 50.0;

/// Extra pre-gain reduction at the total-boost ceiling
const TOTAL_PRE_GAIN_REDUCTION: f32 = 0.10;

/// Bass compensation at full bass boost, before the tone bonus (~+3 dB)
const BASS_COMPENSATION_CEILING: f32 = 1.41;

/// Hard ceiling for bass compensation (~+3.5 dB)
pub const MAX_BASS_COMPENSATION: f32 = 1.50;

/// Bonus per dB of the smaller tone boost when bass and treble are both up
const TONE_SYNERGY_PER_DB: f32 = 0.02;

/// Factors the graph applies around the boost stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainStaging {
    /// Linear input attenuation ahead of the tone and band stages
    pub pre_gain: f32,
    /// Linear make-up gain after the band stages
    pub bass_compensation: f32,
}

impl GainStaging {
    /// Factors with every control flat
    pub const NEUTRAL: GainStaging = GainStaging {
        pre_gain: BASE_PRE_GAIN,
        bass_compensation: 1.0,
    };

    /// Compute the staging factors for a set of equalizer settings
    ///
    /// Disabled settings stage as if every control were flat.
    pub fn for_settings(settings: &EqualizerSettings) -> Self {
        let bass = bass_boost_db(settings);
        let total = total_boost_db(settings);

        let bass_ratio = (bass / BASS_SPAN_DB).clamp(0.0, 1.0);
        let total_ratio = ((total - TOTAL_BOOST_KNEE_DB)
            / (TOTAL_BOOST_CEILING_DB - TOTAL_BOOST_KNEE_DB))
            .clamp(0.0, 1.0);

        let pre_gain = (BASE_PRE_GAIN
            - bass_ratio * BASS_PRE_GAIN_REDUCTION
            - total_ratio * TOTAL_PRE_GAIN_REDUCTION)
            .clamp(MIN_PRE_GAIN, MAX_PRE_GAIN);

        let mut bass_compensation = 1.0;
        if bass > 0.0 {
            bass_compensation += bass_ratio * (BASS_COMPENSATION_CEILING - 1.0);
        }

        let bass_tone = settings.effective_tone(Tone::Bass);
        let treble_tone = settings.effective_tone(Tone::Treble);
        if bass_tone > 0.0 && treble_tone > 0.0 {
            bass_compensation += TONE_SYNERGY_PER_DB * bass_tone.min(treble_tone);
        }

        Self {
            pre_gain,
            bass_compensation: bass_compensation.clamp(1.0, MAX_BASS_COMPENSATION),
        }
    }
}

/// Sum of the positive parts of sub-bass, bass, low-mid and the bass tone (dB)
pub fn bass_boost_db(settings: &EqualizerSettings) -> f32 {
    [
        settings.effective_band(EqBand::SubBass),
        settings.effective_band(EqBand::Bass),
        settings.effective_band(EqBand::LowMid),
        settings.effective_tone(Tone::Bass),
    ]
    .into_iter()
    .map(|g| g.max(0.0))
    .sum()
}

/// Sum of the positive parts of all ten bands and both tone controls (dB)
pub fn total_boost_db(settings: &EqualizerSettings) -> f32 {
    let bands: f32 = EqBand::ALL
        .iter()
        .map(|b| settings.effective_band(*b).max(0.0))
        .sum();
    let tones = settings.effective_tone(Tone::Bass).max(0.0)
        + settings.effective_tone(Tone::Treble).max(0.0);
    bands + tones
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{EqPreset, BAND_COUNT};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn flat_settings_are_neutral() {
        let staging = GainStaging::for_settings(&EqualizerSettings::default());
        assert_eq!(staging, GainStaging::NEUTRAL);
    }

    #[test]
    fn sub_bass_boost_scenario() {
        let mut settings = EqualizerSettings::default();
        settings.set_band(EqBand::SubBass, 6.0);

        assert_eq!(bass_boost_db(&settings), 6.0);
        let staging = GainStaging::for_settings(&settings);
        assert!(approx(staging.pre_gain, 0.625));
        assert!(approx(staging.bass_compensation, 1.1025));
    }

    #[test]
    fn cuts_do_not_count_as_boost() {
        let mut settings = EqualizerSettings::default();
        settings.set_band(EqBand::SubBass, -12.0);
        settings.set_band(EqBand::Bass, -6.0);
        settings.set_tone(Tone::Bass, -3.0);

        assert_eq!(bass_boost_db(&settings), 0.0);
        assert_eq!(total_boost_db(&settings), 0.0);
        assert_eq!(GainStaging::for_settings(&settings), GainStaging::NEUTRAL);
    }

    #[test]
    fn treble_only_boost_leaves_bass_terms_alone() {
        let mut settings = EqualizerSettings::default();
        settings.set_band(EqBand::Air, 12.0);
        settings.set_tone(Tone::Treble, 6.0);

        assert_eq!(bass_boost_db(&settings), 0.0);
        assert_eq!(total_boost_db(&settings), 18.0);
        let staging = GainStaging::for_settings(&settings);
        assert!(approx(staging.pre_gain, BASE_PRE_GAIN));
        assert_eq!(staging.bass_compensation, 1.0);
    }

    #[test]
    fn disabled_settings_stage_as_flat() {
        let mut settings = EqualizerSettings::new([12.0; BAND_COUNT], 12.0, 12.0, false);
        settings.enabled = false;
        assert_eq!(GainStaging::for_settings(&settings), GainStaging::NEUTRAL);
    }

    #[test]
    fn total_boost_adds_extra_reduction() {
        // 35 dB total, none of it bass: half of the 20-50 dB span
        let mut settings = EqualizerSettings::default();
        for band in [EqBand::Mid, EqBand::UpperMid, EqBand::Presence] {
            settings.set_band(band, 10.0);
        }
        settings.set_band(EqBand::Air, 5.0);

        assert_eq!(total_boost_db(&settings), 35.0);
        let staging = GainStaging::for_settings(&settings);
        assert!(approx(staging.pre_gain, 0.65));
    }

    #[test]
    fn full_boost_hits_floor_and_ceiling() {
        let settings = EqualizerSettings::new([12.0; BAND_COUNT], 12.0, 12.0, true);
        let staging = GainStaging::for_settings(&settings);
        assert_eq!(staging.pre_gain, MIN_PRE_GAIN);
        assert_eq!(staging.bass_compensation, MAX_BASS_COMPENSATION);
    }

    #[test]
    fn tone_synergy_needs_both_tones_up() {
        let mut settings = EqualizerSettings::default();
        settings.set_tone(Tone::Bass, 4.0);
        let bass_only = GainStaging::for_settings(&settings).bass_compensation;

        settings.set_tone(Tone::Treble, 2.0);
        let both = GainStaging::for_settings(&settings).bass_compensation;

        // Bonus is 2% of the smaller tone value
        assert!(approx(both - bass_only, 0.04));
    }

    #[test]
    fn presets_stay_in_bounds() {
        for preset in EqPreset::ALL {
            let mut settings = EqualizerSettings::default();
            settings.apply_preset(preset);
            let staging = GainStaging::for_settings(&settings);
            assert!((MIN_PRE_GAIN..=MAX_PRE_GAIN).contains(&staging.pre_gain));
            assert!((1.0..=MAX_BASS_COMPENSATION).contains(&staging.bass_compensation));
        }
    }
}
