//! Lumen Core
//!
//! Platform-agnostic types shared by the Lumen audio core.
//!
//! This crate provides:
//! - **Equalizer model**: ten fixed bands, bass/treble tone controls, presets
//! - **Device sink contract**: the `MediaElement` trait and the events it emits
//! - **Persistence contract**: `EqualizerStore` with in-memory and JSON-file stores
//! - **Error handling**: `CoreError` and the `ErrorCategory` taxonomy
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{EqBand, EqualizerSettings, EqPreset};
//!
//! let mut settings = EqualizerSettings::default();
//! settings.apply_preset(EqPreset::BassBoost);
//! assert_eq!(settings.preset, "bass-boost");
//!
//! // Any hand edit turns the preset into "custom"
//! settings.set_band(EqBand::Mid, 2.0);
//! assert_eq!(settings.preset, "custom");
//!
//! // Disabled settings keep their values but apply nothing
//! settings.enabled = false;
//! assert_eq!(settings.effective_band(EqBand::SubBass), 0.0);
//! assert_eq!(settings.band(EqBand::SubBass), 6.0);
//! ```

#![forbid(unsafe_code)]

pub mod equalizer;
pub mod error;
pub mod media;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use equalizer::{
    EqBand, EqPreset, EqualizerSettings, Tone, BAND_COUNT, BAND_FREQUENCIES, MAX_GAIN_DB,
    MIN_GAIN_DB,
};
pub use error::{CoreError, ErrorCategory, Result};
pub use media::{MediaElement, MediaError, MediaErrorKind, MediaEvent, OutputId};
pub use store::{EqualizerStore, JsonFileStore, MemoryStore};
