//! Equalizer settings model
//!
//! Ten fixed octave bands plus two tone controls (bass, treble). The settings
//! are the source of truth owned by the UI; the audio graph only mirrors them.
//!
//! Gains are stored even while the equalizer is disabled so that re-enabling
//! restores the previous curve. Use the `effective_*` accessors to read the
//! values that should actually reach the graph.

use serde::{Deserialize, Serialize};

/// Number of equalizer bands
pub const BAND_COUNT: usize = 10;

/// Lowest gain accepted for a band or tone control (dB)
pub const MIN_GAIN_DB: f32 = -12.0;

/// Highest gain accepted for a band or tone control (dB)
pub const MAX_GAIN_DB: f32 = 12.0;

/// Centre frequencies of the ten bands (Hz)
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Preset tag written whenever a band or tone is edited by hand
const CUSTOM_TAG: &str = "custom";

/// One of the ten equalizer bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EqBand {
    /// 32 Hz
    SubBass,
    /// 64 Hz
    Bass,
    /// 125 Hz
    LowMid,
    /// 250 Hz
    Warmth,
    /// 500 Hz
    Mid,
    /// 1 kHz
    UpperMid,
    /// 2 kHz
    Presence,
    /// 4 kHz
    Clarity,
    /// 8 kHz
    Brilliance,
    /// 16 kHz
    Air,
}

impl EqBand {
    /// All bands from lowest to highest frequency
    pub const ALL: [EqBand; BAND_COUNT] = [
        EqBand::SubBass,
        EqBand::Bass,
        EqBand::LowMid,
        EqBand::Warmth,
        EqBand::Mid,
        EqBand::UpperMid,
        EqBand::Presence,
        EqBand::Clarity,
        EqBand::Brilliance,
        EqBand::Air,
    ];

    /// Position of the band in the chain (0 = lowest)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Band at a chain position
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Centre frequency in Hz
    pub fn frequency(self) -> f32 {
        BAND_FREQUENCIES[self.index()]
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::SubBass => "Sub-bass",
            Self::Bass => "Bass",
            Self::LowMid => "Low-mid",
            Self::Warmth => "Warmth",
            Self::Mid => "Mid",
            Self::UpperMid => "Upper-mid",
            Self::Presence => "Presence",
            Self::Clarity => "Clarity",
            Self::Brilliance => "Brilliance",
            Self::Air => "Air",
        }
    }
}

/// Tone-shaping controls that sit ahead of the band equalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Low shelf plus punch peak
    Bass,
    /// High shelf plus sparkle peak
    Treble,
}

/// Built-in band presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EqPreset {
    /// All bands at 0 dB
    #[default]
    Flat,
    /// Enhanced low frequencies
    BassBoost,
    /// Enhanced high frequencies
    TrebleBoost,
    /// Boosted lows and highs, scooped mids
    VShape,
    /// Forward midrange for voice
    Vocal,
    /// Rock
    Rock,
    /// Dance/electronic
    Electronic,
    /// Natural acoustic instruments
    Acoustic,
}

impl EqPreset {
    /// Every built-in preset
    pub const ALL: [EqPreset; 8] = [
        EqPreset::Flat,
        EqPreset::BassBoost,
        EqPreset::TrebleBoost,
        EqPreset::VShape,
        EqPreset::Vocal,
        EqPreset::Rock,
        EqPreset::Electronic,
        EqPreset::Acoustic,
    ];

    /// Band gains for this preset
    pub fn gains(self) -> [f32; BAND_COUNT] {
        match self {
            Self::Flat => [0.0; BAND_COUNT],
            Self::BassBoost => [6.0, 5.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            Self::TrebleBoost => [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 4.0, 5.0, 6.0],
            Self::VShape => [5.0, 4.0, 2.0, -1.0, -2.0, -2.0, -1.0, 2.0, 4.0, 5.0],
            Self::Vocal => [-2.0, -1.0, 0.0, 2.0, 4.0, 4.0, 2.0, 0.0, -1.0, -2.0],
            Self::Rock => [4.0, 3.0, 1.0, 0.0, -1.0, 0.0, 1.0, 3.0, 4.0, 4.0],
            Self::Electronic => [5.0, 4.0, 2.0, 0.0, 1.0, 2.0, 1.0, 3.0, 4.0, 4.0],
            Self::Acoustic => [2.0, 1.0, 0.0, 1.0, 2.0, 2.0, 1.0, 2.0, 2.0, 1.0],
        }
    }

    /// Tag stored in `EqualizerSettings::preset`
    pub fn tag(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::BassBoost => "bass-boost",
            Self::TrebleBoost => "treble-boost",
            Self::VShape => "v-shape",
            Self::Vocal => "vocal",
            Self::Rock => "rock",
            Self::Electronic => "electronic",
            Self::Acoustic => "acoustic",
        }
    }

    /// Look a preset up by its tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.tag() == tag)
    }
}

/// Equalizer settings (source of truth, persisted by the UI layer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerSettings {
    bands: [f32; BAND_COUNT],
    bass: f32,
    treble: f32,

    /// Preset identifier, "custom" once hand-edited
    pub preset: String,

    /// When false the graph behaves as if every gain were 0 dB
    pub enabled: bool,
}

impl Default for EqualizerSettings {
    fn default() -> Self {
        Self {
            bands: [0.0; BAND_COUNT],
            bass: 0.0,
            treble: 0.0,
            preset: EqPreset::Flat.tag().to_string(),
            enabled: true,
        }
    }
}

impl EqualizerSettings {
    /// Create settings from raw values (gains are clamped)
    pub fn new(bands: [f32; BAND_COUNT], bass: f32, treble: f32, enabled: bool) -> Self {
        Self {
            bands: bands.map(clamp_gain),
            bass: clamp_gain(bass),
            treble: clamp_gain(treble),
            preset: CUSTOM_TAG.to_string(),
            enabled,
        }
    }

    /// Stored gain of a band, regardless of `enabled`
    pub fn band(&self, band: EqBand) -> f32 {
        self.bands[band.index()]
    }

    /// All stored band gains
    pub fn bands(&self) -> &[f32; BAND_COUNT] {
        &self.bands
    }

    /// Set a band gain (clamped to -12..+12 dB); marks the preset as custom
    pub fn set_band(&mut self, band: EqBand, gain_db: f32) {
        self.bands[band.index()] = clamp_gain(gain_db);
        self.preset = CUSTOM_TAG.to_string();
    }

    /// Stored gain of a tone control, regardless of `enabled`
    pub fn tone(&self, tone: Tone) -> f32 {
        match tone {
            Tone::Bass => self.bass,
            Tone::Treble => self.treble,
        }
    }

    /// Set a tone gain (clamped to -12..+12 dB); marks the preset as custom
    pub fn set_tone(&mut self, tone: Tone, gain_db: f32) {
        let gain_db = clamp_gain(gain_db);
        match tone {
            Tone::Bass => self.bass = gain_db,
            Tone::Treble => self.treble = gain_db,
        }
        self.preset = CUSTOM_TAG.to_string();
    }

    /// Gain that should reach the graph for a band (0 when disabled)
    pub fn effective_band(&self, band: EqBand) -> f32 {
        if self.enabled {
            self.band(band)
        } else {
            0.0
        }
    }

    /// Gain that should reach the graph for a tone control (0 when disabled)
    pub fn effective_tone(&self, tone: Tone) -> f32 {
        if self.enabled {
            self.tone(tone)
        } else {
            0.0
        }
    }

    /// Load a preset's band curve; tone controls are left alone
    pub fn apply_preset(&mut self, preset: EqPreset) {
        self.bands = preset.gains();
        self.preset = preset.tag().to_string();
    }

    /// Flatten every band and tone control
    pub fn reset(&mut self) {
        self.bands = [0.0; BAND_COUNT];
        self.bass = 0.0;
        self.treble = 0.0;
        self.preset = EqPreset::Flat.tag().to_string();
    }

    /// Re-clamp every gain; used after deserializing untrusted input
    pub fn sanitize(&mut self) {
        self.bands = self.bands.map(clamp_gain);
        self.bass = clamp_gain(self.bass);
        self.treble = clamp_gain(self.treble);
    }
}

fn clamp_gain(gain_db: f32) -> f32 {
    if gain_db.is_finite() {
        gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
    } else {
        0.0
    }
}
