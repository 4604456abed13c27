//! Player session
//!
//! Wires one media element to its graph, playback controller, equalizer and
//! sleep timer.

use std::sync::Arc;
use tracing::info;

use lumen_audio::{AudioGraphManager, ContextFactory, GraphConfig, GraphRegistry};
use lumen_core::{EqualizerStore, MediaElement};

use crate::controller::PlaybackController;
use crate::equalizer::EqualizerController;
use crate::timer::SleepTimerController;
use crate::types::PlaybackConfig;

/// Everything one output needs
pub struct PlayerSession {
    pub playback: PlaybackController,
    pub equalizer: Arc<EqualizerController>,
    pub sleep_timer: SleepTimerController,
    graph: Arc<AudioGraphManager>,
}

impl PlayerSession {
    /// Build a session; the graph itself is created on the first play
    pub fn new(
        element: Arc<dyn MediaElement>,
        registry: Arc<GraphRegistry>,
        factory: Arc<dyn ContextFactory>,
        store: Arc<dyn EqualizerStore>,
        graph_config: GraphConfig,
        playback_config: PlaybackConfig,
    ) -> Self {
        let graph = Arc::new(AudioGraphManager::new(
            element.clone(),
            registry,
            factory,
            graph_config,
        ));
        let playback = PlaybackController::new(element, graph.clone(), playback_config);

        let equalizer = Arc::new(EqualizerController::new(store));
        let observed = graph.clone();
        equalizer.subscribe(move |settings| observed.apply_settings(settings));

        let expiring = playback.clone();
        let sleep_timer = SleepTimerController::new(Arc::new(move || expiring.force_sleep_stop()));

        Self {
            playback,
            equalizer,
            sleep_timer,
            graph,
        }
    }

    /// Load persisted equalizer settings
    pub async fn init(&self) {
        let settings = self.equalizer.init().await;
        info!(preset = %settings.preset, enabled = settings.enabled, "Player session ready");
    }

    pub fn graph(&self) -> &Arc<AudioGraphManager> {
        &self.graph
    }

    /// Tear down: timer off, playback stopped, graph dropped
    pub async fn dispose(&self) {
        self.sleep_timer.cancel();
        self.playback.hard_stop();
        self.equalizer.flush().await;
        self.graph.dispose().await;
    }
}
