//! Equalizer settings from command-line arguments

use crate::error::{CliError, Result};
use lumen_core::{EqBand, EqPreset, EqualizerSettings, Tone};

/// Equalizer edits gathered from the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Preset tag applied before any band edit
    pub preset: Option<String>,
    /// `band=gain` pairs, e.g. `sub-bass=6`
    pub bands: Vec<String>,
    pub bass: Option<f32>,
    pub treble: Option<f32>,
    pub disabled: bool,
}

impl SettingsArgs {
    /// Layer the edits over `base`
    pub fn apply(&self, mut base: EqualizerSettings) -> Result<EqualizerSettings> {
        if let Some(tag) = &self.preset {
            let preset = EqPreset::from_tag(tag)
                .ok_or_else(|| CliError::InvalidArgument(format!("unknown preset '{tag}'")))?;
            base.apply_preset(preset);
        }
        for pair in &self.bands {
            let (band, gain) = parse_band(pair)?;
            base.set_band(band, gain);
        }
        if let Some(gain) = self.bass {
            base.set_tone(Tone::Bass, gain);
        }
        if let Some(gain) = self.treble {
            base.set_tone(Tone::Treble, gain);
        }
        if self.disabled {
            base.enabled = false;
        }
        Ok(base)
    }

    /// Whether any edit was given
    pub fn is_empty(&self) -> bool {
        self.preset.is_none()
            && self.bands.is_empty()
            && self.bass.is_none()
            && self.treble.is_none()
            && !self.disabled
    }
}

/// Parse `name=gain` where name is a kebab-case band name or a 0-9 index
pub fn parse_band(pair: &str) -> Result<(EqBand, f32)> {
    let (name, gain) = pair
        .split_once('=')
        .ok_or_else(|| CliError::InvalidArgument(format!("expected band=gain, got '{pair}'")))?;

    let name = name.trim();
    let band = match name.parse::<usize>() {
        Ok(index) => EqBand::from_index(index),
        Err(_) => serde_json::from_value(serde_json::Value::String(name.to_lowercase())).ok(),
    }
    .ok_or_else(|| CliError::InvalidArgument(format!("unknown band '{name}'")))?;

    let gain = gain
        .trim()
        .parse::<f32>()
        .map_err(|_| CliError::InvalidArgument(format!("invalid gain '{gain}'")))?;

    Ok((band, gain))
}
