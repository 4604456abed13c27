//! Lumen command-line front end
//!
//! Offline tools around the audio core: inspect gain staging, render WAV
//! files through the processing graph, and edit the persisted equalizer.

pub mod config;
pub mod error;
pub mod render;
pub mod settings;

pub use config::CliConfig;
pub use error::{CliError, Result};
pub use render::{render_buffer, render_file, RenderOptions, RenderReport};
pub use settings::SettingsArgs;
