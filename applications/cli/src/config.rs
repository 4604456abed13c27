/// CLI configuration
use crate::error::{CliError, Result};
use lumen_audio::GraphConfig;
use lumen_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "lumen.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub equalizer: EqualizerFileSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EqualizerFileSettings {
    /// Where the equalizer settings are persisted
    #[serde(default = "default_equalizer_path")]
    pub path: PathBuf,
}

impl Default for EqualizerFileSettings {
    fn default() -> Self {
        Self {
            path: default_equalizer_path(),
        }
    }
}

fn default_equalizer_path() -> PathBuf {
    PathBuf::from("equalizer.json")
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit path must exist; the default file is optional.
    /// Environment variables use the `LUMEN_` prefix with `__` between
    /// sections, e.g. `LUMEN_PLAYBACK__FADE_IN_MS=400`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("LUMEN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let built = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let mut config: Self = built
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))?;
        config.graph.validate();
        Ok(config)
    }
}
