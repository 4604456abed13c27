//! Equalizer controller
//!
//! Holds the user's equalizer settings, notifies observers synchronously on
//! every change (the session wires the audio graph in as one), and persists
//! in the background. Saves never block a caller; a failed save is logged and
//! the in-memory settings stay applied.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lumen_core::{EqBand, EqPreset, EqualizerSettings, EqualizerStore, Tone};

/// Observer called with the new settings after each change
pub type SettingsObserver = Arc<dyn Fn(&EqualizerSettings) + Send + Sync>;

struct Persistence {
    store: Arc<dyn EqualizerStore>,
    /// Serializes saves; stale ones are skipped once they get the lock
    save_lock: tokio::sync::Mutex<()>,
    latest: AtomicU64,
}

/// Settings mutator with observers and background persistence
pub struct EqualizerController {
    settings: Mutex<EqualizerSettings>,
    observers: Mutex<Vec<SettingsObserver>>,
    persistence: Arc<Persistence>,
    pending: Mutex<Vec<JoinHandle<()>>>,
    edited: AtomicBool,
}

impl EqualizerController {
    pub fn new(store: Arc<dyn EqualizerStore>) -> Self {
        Self {
            settings: Mutex::new(EqualizerSettings::default()),
            observers: Mutex::new(Vec::new()),
            persistence: Arc::new(Persistence {
                store,
                save_lock: tokio::sync::Mutex::new(()),
                latest: AtomicU64::new(0),
            }),
            pending: Mutex::new(Vec::new()),
            edited: AtomicBool::new(false),
        }
    }

    /// Load stored settings
    ///
    /// With nothing stored (first run), or if the user already edited before
    /// the store answered, the in-memory settings are saved instead.
    pub async fn init(&self) -> EqualizerSettings {
        match self.persistence.store.load().await {
            Ok(Some(mut stored)) if !self.edited.load(Ordering::SeqCst) => {
                stored.sanitize();
                debug!(preset = %stored.preset, "Loaded equalizer settings");
                *self.settings.lock() = stored.clone();
                self.notify(&stored);
            }
            Ok(Some(_)) => {
                info!("Equalizer edited before load finished, keeping edits");
                self.persist(self.settings());
            }
            Ok(None) => {
                info!("No stored equalizer settings, saving current");
                self.persist(self.settings());
            }
            Err(error) => {
                warn!(%error, "Could not load equalizer settings, using defaults");
            }
        }
        self.settings()
    }

    /// Register an observer; it is called immediately with the current settings
    pub fn subscribe(&self, observer: impl Fn(&EqualizerSettings) + Send + Sync + 'static) {
        let observer: SettingsObserver = Arc::new(observer);
        observer(&self.settings());
        self.observers.lock().push(observer);
    }

    pub fn settings(&self) -> EqualizerSettings {
        self.settings.lock().clone()
    }

    pub fn set_band(&self, band: EqBand, gain_db: f32) {
        self.update(|settings| settings.set_band(band, gain_db));
    }

    pub fn set_tone(&self, tone: Tone, gain_db: f32) {
        self.update(|settings| settings.set_tone(tone, gain_db));
    }

    pub fn apply_preset(&self, preset: EqPreset) {
        self.update(|settings| settings.apply_preset(preset));
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|settings| settings.enabled = enabled);
    }

    /// Flatten everything
    pub fn reset(&self) {
        self.update(EqualizerSettings::reset);
    }

    /// Replace all settings at once
    pub fn replace(&self, settings: EqualizerSettings) {
        self.update(move |current| {
            *current = settings;
            current.sanitize();
        });
    }

    /// Wait for every save issued so far
    pub async fn flush(&self) {
        let pending: Vec<_> = self.pending.lock().drain(..).collect();
        for save in pending {
            let _ = save.await;
        }
    }

    fn update(&self, change: impl FnOnce(&mut EqualizerSettings)) {
        self.edited.store(true, Ordering::SeqCst);
        let settings = {
            let mut current = self.settings.lock();
            change(&mut current);
            current.clone()
        };
        self.notify(&settings);
        self.persist(settings);
    }

    fn notify(&self, settings: &EqualizerSettings) {
        let observers = self.observers.lock().clone();
        for observer in observers {
            observer(settings);
        }
    }

    /// Save in the background; only the newest settings reach the store
    fn persist(&self, settings: EqualizerSettings) {
        let persistence = self.persistence.clone();
        let version = persistence.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let save = tokio::spawn(async move {
            let _serial = persistence.save_lock.lock().await;
            if persistence.latest.load(Ordering::SeqCst) != version {
                return;
            }
            if let Err(error) = persistence.store.save(&settings).await {
                warn!(%error, "Failed to save equalizer settings");
            }
        });

        let mut pending = self.pending.lock();
        pending.retain(|handle| !handle.is_finished());
        pending.push(save);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::MemoryStore;

    #[tokio::test]
    async fn observers_see_changes_synchronously() {
        let controller = EqualizerController::new(Arc::new(MemoryStore::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        controller.subscribe(move |settings| sink.lock().push(settings.band(EqBand::Mid)));

        controller.set_band(EqBand::Mid, 4.0);
        controller.set_band(EqBand::Mid, -2.0);

        assert_eq!(*seen.lock(), vec![0.0, 4.0, -2.0]);
    }

    #[tokio::test]
    async fn last_write_reaches_the_store() {
        let store = Arc::new(MemoryStore::new());
        let controller = EqualizerController::new(store.clone());

        controller.set_tone(Tone::Bass, 3.0);
        controller.set_tone(Tone::Bass, 5.0);
        controller.set_tone(Tone::Bass, 7.0);
        controller.flush().await;

        let stored = store.stored().await.unwrap();
        assert_eq!(stored.tone(Tone::Bass), 7.0);
    }

    #[tokio::test]
    async fn preset_and_reset() {
        let controller = EqualizerController::new(Arc::new(MemoryStore::new()));
        controller.apply_preset(EqPreset::BassBoost);
        assert_eq!(controller.settings().preset, "bass-boost");

        controller.reset();
        assert!(controller.settings().bands().iter().all(|g| *g == 0.0));
    }

    #[tokio::test]
    async fn replace_keeps_gains_in_range() {
        let controller = EqualizerController::new(Arc::new(MemoryStore::new()));
        controller.replace(EqualizerSettings::new([40.0; 10], -40.0, 0.0, false));

        let settings = controller.settings();
        assert_eq!(settings.band(EqBand::Air), 12.0);
        assert_eq!(settings.tone(Tone::Bass), -12.0);
        assert!(!settings.enabled);
    }
}
