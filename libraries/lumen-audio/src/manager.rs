//! Audio graph manager
//!
//! Owns the output's processing graph and translates equalizer settings into
//! live parameter ramps. Keeps a mirror of the last applied settings so edits
//! made before the graph exists are applied when it is built.
//!
//! If no audio context can be created the manager degrades to direct volume
//! control on the media element with no equalization. The degradation is
//! logged and reported once.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use lumen_core::{EqBand, EqualizerSettings, MediaElement, OutputId, Tone};

use crate::config::GraphConfig;
use crate::context::{ContextFactory, ContextState};
use crate::error::{AudioError, Result};
use crate::gain_staging::GainStaging;
use crate::graph::{AudioGraph, GraphParam, GraphSnapshot};
use crate::param::AudioParam;
use crate::registry::{GraphHandle, GraphRegistry};

/// Outcome of asking for the output's graph
#[derive(Debug)]
pub enum GraphAccess {
    /// The graph is built (or already was)
    Live(Arc<GraphHandle>),
    /// No graph; volume goes straight to the element. Carries the error the
    /// first time only, so callers surface it once.
    Fallback(Option<AudioError>),
}

impl GraphAccess {
    pub fn handle(&self) -> Option<&Arc<GraphHandle>> {
        match self {
            GraphAccess::Live(handle) => Some(handle),
            GraphAccess::Fallback(_) => None,
        }
    }
}

/// Per-output graph owner
pub struct AudioGraphManager {
    element: Arc<dyn MediaElement>,
    registry: Arc<GraphRegistry>,
    factory: Arc<dyn ContextFactory>,
    config: GraphConfig,

    settings: Mutex<EqualizerSettings>,
    bound: Mutex<Option<Arc<GraphHandle>>>,

    degraded: AtomicBool,
    degraded_reported: AtomicBool,
}

impl AudioGraphManager {
    pub fn new(
        element: Arc<dyn MediaElement>,
        registry: Arc<GraphRegistry>,
        factory: Arc<dyn ContextFactory>,
        config: GraphConfig,
    ) -> Self {
        Self {
            element,
            registry,
            factory,
            config: config.validated(),
            settings: Mutex::new(EqualizerSettings::default()),
            bound: Mutex::new(None),
            degraded: AtomicBool::new(false),
            degraded_reported: AtomicBool::new(false),
        }
    }

    pub fn output(&self) -> OutputId {
        self.element.id()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Settings the graph is converging to
    pub fn settings(&self) -> EqualizerSettings {
        self.settings.lock().clone()
    }

    /// Whether the manager fell back to direct volume control
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Build the graph if needed (call from a play gesture)
    pub fn ensure_graph(&self) -> GraphAccess {
        if self.is_degraded() {
            return GraphAccess::Fallback(None);
        }

        match self
            .registry
            .get_or_create(self.output(), self.factory.as_ref(), &self.config)
        {
            Ok(handle) => {
                self.bind(&handle);
                GraphAccess::Live(handle)
            }
            Err(error) => {
                self.degraded.store(true, Ordering::SeqCst);
                if self.degraded_reported.swap(true, Ordering::SeqCst) {
                    GraphAccess::Fallback(None)
                } else {
                    warn!(
                        output = %self.output(),
                        %error,
                        "Audio graph unavailable, using direct volume control"
                    );
                    GraphAccess::Fallback(Some(error))
                }
            }
        }
    }

    /// The live graph, without building one
    pub fn handle(&self) -> Option<Arc<GraphHandle>> {
        self.registry.get(self.output())
    }

    /// Ramp the whole graph to `settings`
    pub fn apply_settings(&self, settings: &EqualizerSettings) {
        *self.settings.lock() = settings.clone();
        if let Some(handle) = self.handle() {
            let now = handle.now();
            self.ramp_all(&mut handle.graph(), settings, now);
            debug!(output = %self.output(), preset = %settings.preset, "Applied equalizer settings");
        }
    }

    /// Ramp one band and restage
    pub fn set_band_gain(&self, band: EqBand, gain_db: f32) {
        let settings = {
            let mut mirror = self.settings.lock();
            mirror.set_band(band, gain_db);
            mirror.clone()
        };
        if let Some(handle) = self.handle() {
            let now = handle.now();
            let mut graph = handle.graph();
            graph.param_mut(GraphParam::Band(band)).ramp_to(
                settings.effective_band(band),
                now,
                ms(self.config.band_ramp_ms),
            );
            self.ramp_staging(&mut graph, &settings, now);
        }
    }

    /// Ramp one tone control (shelf and companion) and restage
    pub fn set_tone_gain(&self, tone: Tone, gain_db: f32) {
        let settings = {
            let mut mirror = self.settings.lock();
            mirror.set_tone(tone, gain_db);
            mirror.clone()
        };
        if let Some(handle) = self.handle() {
            let now = handle.now();
            let mut graph = handle.graph();
            graph.ramp_tone(
                tone,
                settings.effective_tone(tone),
                now,
                ms(self.config.tone_ramp_ms),
            );
            self.ramp_staging(&mut graph, &settings, now);
        }
    }

    /// Ramp the pre-gain factor
    pub fn set_pre_gain(&self, factor: f32) {
        self.ramp_param(GraphParam::PreGain, factor, self.config.staging_ramp_ms);
    }

    /// Ramp the bass-compensation factor
    pub fn set_bass_compensation(&self, factor: f32) {
        self.ramp_param(GraphParam::BassCompensation, factor, self.config.staging_ramp_ms);
    }

    /// Ramp master gain; sets the element volume directly without a graph
    pub fn set_master_gain(&self, gain: f32) {
        if !self.ramp_param(GraphParam::Master, gain, self.config.master_ramp_ms) {
            self.element.set_volume(gain);
        }
    }

    /// Run `f` against the master gain parameter and the current context time
    pub fn with_master<R>(&self, f: impl FnOnce(&mut AudioParam, f64) -> R) -> Option<R> {
        let handle = self.handle()?;
        let now = handle.now();
        let mut graph = handle.graph();
        Some(f(graph.param_mut(GraphParam::Master), now))
    }

    /// Live master gain (mid-ramp values included)
    pub fn master_gain_now(&self) -> Option<f32> {
        let handle = self.handle()?;
        let now = handle.now();
        let value = handle.graph().param(GraphParam::Master).value_at(now);
        Some(value)
    }

    /// Direct element volume (what plays when there is no graph)
    pub fn element_volume(&self) -> f32 {
        self.element.volume()
    }

    /// Parameter values once every ramp has finished
    pub fn targets(&self) -> Option<GraphSnapshot> {
        self.handle().map(|handle| handle.graph().targets())
    }

    /// Parameter values right now
    pub fn snapshot_now(&self) -> Option<GraphSnapshot> {
        self.handle().map(|handle| {
            let now = handle.now();
            handle.graph().snapshot_at(now)
        })
    }

    /// Context time, if a graph exists
    pub fn current_time(&self) -> Option<f64> {
        self.handle().map(|handle| handle.now())
    }

    /// Resume the context if it is suspended (awaited before playback starts)
    pub async fn resume_if_suspended(&self) -> Result<()> {
        let Some(handle) = self.handle() else {
            return Ok(());
        };
        if handle.context().state() == ContextState::Suspended {
            debug!(output = %self.output(), "Resuming audio context");
            handle.context().resume().await?;
        }
        Ok(())
    }

    /// Drop the graph (element disposal)
    pub async fn dispose(&self) {
        self.bound.lock().take();
        self.registry.dispose(self.output()).await;
    }

    /// Push mirrored settings into a graph seen for the first time
    fn bind(&self, handle: &Arc<GraphHandle>) {
        let mut bound = self.bound.lock();
        if bound.as_ref().is_some_and(|b| Arc::ptr_eq(b, handle)) {
            return;
        }
        *bound = Some(handle.clone());
        drop(bound);

        // The graph's master gain takes over from the element volume
        self.element.set_volume(1.0);

        let settings = self.settings();
        let now = handle.now();
        self.ramp_all(&mut handle.graph(), &settings, now);
    }

    fn ramp_all(&self, graph: &mut AudioGraph, settings: &EqualizerSettings, now: f64) {
        let band_window = ms(self.config.band_ramp_ms);
        for band in EqBand::ALL {
            graph
                .param_mut(GraphParam::Band(band))
                .ramp_to(settings.effective_band(band), now, band_window);
        }

        let tone_window = ms(self.config.tone_ramp_ms);
        for tone in [Tone::Bass, Tone::Treble] {
            graph.ramp_tone(tone, settings.effective_tone(tone), now, tone_window);
        }

        self.ramp_staging(graph, settings, now);
    }

    fn ramp_staging(&self, graph: &mut AudioGraph, settings: &EqualizerSettings, now: f64) {
        let staging = GainStaging::for_settings(settings);
        let window = ms(self.config.staging_ramp_ms);
        graph
            .param_mut(GraphParam::PreGain)
            .ramp_to(staging.pre_gain, now, window);
        graph
            .param_mut(GraphParam::BassCompensation)
            .ramp_to(staging.bass_compensation, now, window);
    }

    /// Returns false when there is no graph
    fn ramp_param(&self, param: GraphParam, target: f32, window_ms: f64) -> bool {
        match self.handle() {
            Some(handle) => {
                let now = handle.now();
                handle.graph().param_mut(param).ramp_to(target, now, ms(window_ms));
                true
            }
            None => false,
        }
    }
}

fn ms(window_ms: f64) -> f64 {
    window_ms / 1000.0
}
