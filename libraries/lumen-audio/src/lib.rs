//! Lumen Audio
//!
//! The processing graph behind Lumen playback.
//!
//! This crate provides:
//! - Gain staging policy (pre-gain and bass compensation from equalizer settings)
//! - Automated parameters with linear ramps in context time
//! - DSP stages: biquad filters, gain, compressor/limiter
//! - The fixed processing chain and a per-output graph registry
//! - `AudioGraphManager`, which turns settings into parameter ramps and
//!   degrades to direct volume control when no audio context is available
//!
//! # Example: Gain Staging
//!
//! ```rust
//! use lumen_audio::GainStaging;
//! use lumen_core::{EqBand, EqualizerSettings};
//!
//! let mut settings = EqualizerSettings::default();
//! settings.set_band(EqBand::SubBass, 6.0);
//!
//! let staging = GainStaging::for_settings(&settings);
//! assert!((staging.pre_gain - 0.625).abs() < 1e-6);
//! assert!((staging.bass_compensation - 1.1025).abs() < 1e-4);
//! ```
//!
//! # Example: Offline Rendering
//!
//! ```rust
//! use lumen_audio::{AudioGraph, GraphConfig, GraphParam};
//!
//! let mut graph = AudioGraph::new(48000, &GraphConfig::default());
//! graph.param_mut(GraphParam::Master).ramp_to(1.0, 0.0, 0.05);
//!
//! let mut buffer = vec![0.0f32; 48000 * 2]; // one second of stereo
//! graph.process(&mut buffer, 0.0);
//! assert!(buffer.iter().all(|s| s.is_finite()));
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod context;
mod error;
pub mod gain_staging;
pub mod graph;
pub mod manager;
pub mod nodes;
pub mod param;
pub mod registry;

pub use config::{DynamicsSettings, GraphConfig, MAX_RAMP_MS, MIN_RAMP_MS};
pub use context::{
    AudioContext, ClockContext, ClockContextFactory, ContextFactory, ContextState,
    UnavailableFactory,
};
pub use error::{AudioError, Result};
pub use gain_staging::{GainStaging, MAX_BASS_COMPENSATION, MAX_PRE_GAIN, MIN_PRE_GAIN};
pub use graph::{AudioGraph, GraphParam, GraphSnapshot};
pub use manager::{AudioGraphManager, GraphAccess};
pub use param::AudioParam;
pub use registry::{GraphHandle, GraphRegistry};
