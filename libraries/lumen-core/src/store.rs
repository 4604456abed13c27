//! Equalizer persistence contract
//!
//! The audio core never blocks on persistence: settings are applied to the
//! graph first and stored afterwards. Implementations only need to provide
//! `load` and `save`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::equalizer::EqualizerSettings;
use crate::error::{CoreError, Result};

/// Load/save contract for named equalizer settings
#[async_trait]
pub trait EqualizerStore: Send + Sync {
    /// Load stored settings; `None` on first run
    async fn load(&self) -> Result<Option<EqualizerSettings>>;

    /// Persist settings, replacing whatever was stored
    async fn save(&self, settings: &EqualizerSettings) -> Result<()>;
}

/// In-memory store (tests, ephemeral sessions)
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<EqualizerSettings>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds settings
    pub fn with_settings(settings: EqualizerSettings) -> Self {
        Self {
            slot: Mutex::new(Some(settings)),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed saves
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }

    /// Currently stored settings
    pub async fn stored(&self) -> Option<EqualizerSettings> {
        self.slot.lock().await.clone()
    }
}

#[async_trait]
impl EqualizerStore for MemoryStore {
    async fn load(&self) -> Result<Option<EqualizerSettings>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, settings: &EqualizerSettings) -> Result<()> {
        *self.slot.lock().await = Some(settings.clone());
        *self.saves.lock().await += 1;
        Ok(())
    }
}

/// Store that keeps settings as a JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the given file (created on first save)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EqualizerStore for JsonFileStore {
    async fn load(&self) -> Result<Option<EqualizerSettings>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored equalizer settings at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut settings: EqualizerSettings = serde_json::from_slice(&bytes)?;
        settings.sanitize();
        Ok(Some(settings))
    }

    async fn save(&self, settings: &EqualizerSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(settings)?;

        // Write to a sibling file first so a crash never leaves half a document
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CoreError::persistence(format!("{}: {e}", self.path.display())))?;

        debug!("Saved equalizer settings to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equalizer::{EqBand, EqPreset};

    #[tokio::test]
    async fn memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.save_count().await, 0);
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryStore::new();
        let mut settings = EqualizerSettings::default();
        settings.apply_preset(EqPreset::Rock);

        store.save(&settings).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(settings));
        assert_eq!(store.save_count().await, 1);
    }

    #[tokio::test]
    async fn json_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("eq.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_store_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("eq.json");
        let store = JsonFileStore::new(&path);

        let mut settings = EqualizerSettings::default();
        settings.set_band(EqBand::Bass, 4.5);
        settings.enabled = false;
        store.save(&settings).await.unwrap();

        assert!(path.exists());
        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn json_store_clamps_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eq.json");
        let json = r#"{"bands":[30,0,0,0,0,0,0,0,0,-30],"bass":0,"treble":99,"preset":"custom","enabled":true}"#;
        std::fs::write(&path, json).unwrap();

        let settings = JsonFileStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(settings.band(EqBand::SubBass), 12.0);
        assert_eq!(settings.band(EqBand::Air), -12.0);
        assert_eq!(settings.tone(crate::Tone::Treble), 12.0);
    }

    #[tokio::test]
    async fn json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eq.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
