//! Graph registry
//!
//! One graph per output element, keyed by `OutputId`. Lifecycle:
//! created on the first play gesture, reused for every later track, dropped
//! when the element is disposed. A graph whose context was closed is rebuilt
//! on the next request.

use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use lumen_core::OutputId;

use crate::config::GraphConfig;
use crate::context::{AudioContext, ContextFactory, ContextState};
use crate::error::Result;
use crate::graph::AudioGraph;

/// A live graph bound to its context
pub struct GraphHandle {
    output: OutputId,
    context: Arc<dyn AudioContext>,
    graph: Mutex<AudioGraph>,
}

impl GraphHandle {
    pub fn output(&self) -> OutputId {
        self.output
    }

    pub fn context(&self) -> &Arc<dyn AudioContext> {
        &self.context
    }

    /// Context time (seconds)
    pub fn now(&self) -> f64 {
        self.context.current_time()
    }

    /// Whether the context can still produce audio
    pub fn is_live(&self) -> bool {
        self.context.state() != ContextState::Closed
    }

    /// Lock the graph for parameter scheduling or inspection
    pub fn graph(&self) -> MutexGuard<'_, AudioGraph> {
        self.graph.lock()
    }

    /// Process a block starting at the current context time
    pub fn render(&self, buffer: &mut [f32]) {
        let now = self.now();
        self.graph.lock().process(buffer, now);
    }
}

impl std::fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphHandle")
            .field("output", &self.output)
            .field("state", &self.context.state())
            .finish()
    }
}

/// Explicit map from output element to its graph
#[derive(Default)]
pub struct GraphRegistry {
    graphs: Mutex<HashMap<OutputId, Arc<GraphHandle>>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the output's graph, building it on first use
    ///
    /// Calling this again for the same output returns the same handle; a
    /// second construction attempt is a no-op, not an error.
    pub fn get_or_create(
        &self,
        output: OutputId,
        factory: &dyn ContextFactory,
        config: &GraphConfig,
    ) -> Result<Arc<GraphHandle>> {
        let mut graphs = self.graphs.lock();

        if let Some(handle) = graphs.get(&output) {
            if handle.is_live() {
                debug!(%output, "Reusing processing graph");
                return Ok(handle.clone());
            }
            info!(%output, "Audio context closed, rebuilding processing graph");
            graphs.remove(&output);
        }

        let context = factory.create()?;
        let graph = AudioGraph::new(context.sample_rate(), config);
        let handle = Arc::new(GraphHandle {
            output,
            context,
            graph: Mutex::new(graph),
        });
        info!(
            %output,
            sample_rate = handle.context.sample_rate(),
            "Built processing graph"
        );

        graphs.insert(output, handle.clone());
        Ok(handle)
    }

    /// The output's graph if one is live
    pub fn get(&self, output: OutputId) -> Option<Arc<GraphHandle>> {
        self.graphs
            .lock()
            .get(&output)
            .filter(|handle| handle.is_live())
            .cloned()
    }

    /// Drop the output's graph and close its context
    ///
    /// Returns whether a graph was registered.
    pub async fn dispose(&self, output: OutputId) -> bool {
        let removed = self.graphs.lock().remove(&output);
        match removed {
            Some(handle) => {
                handle.context.close().await;
                info!(%output, "Disposed processing graph");
                true
            }
            None => false,
        }
    }

    /// Number of registered graphs
    pub fn len(&self) -> usize {
        self.graphs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ClockContextFactory, UnavailableFactory};
    use crate::error::AudioError;

    #[tokio::test]
    async fn second_build_reuses_graph() {
        let registry = GraphRegistry::new();
        let factory = ClockContextFactory::new(48000);
        let output = OutputId::from_raw(1);
        let config = GraphConfig::default();

        let first = registry.get_or_create(output, &factory, &config).unwrap();
        let second = registry.get_or_create(output, &factory, &config).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn outputs_get_separate_graphs() {
        let registry = GraphRegistry::new();
        let factory = ClockContextFactory::new(48000);
        let config = GraphConfig::default();

        let a = registry
            .get_or_create(OutputId::from_raw(1), &factory, &config)
            .unwrap();
        let b = registry
            .get_or_create(OutputId::from_raw(2), &factory, &config)
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn closed_context_is_rebuilt() {
        let registry = GraphRegistry::new();
        let factory = ClockContextFactory::new(48000);
        let output = OutputId::from_raw(7);
        let config = GraphConfig::default();

        let first = registry.get_or_create(output, &factory, &config).unwrap();
        first.context().close().await;
        assert!(registry.get(output).is_none());

        let second = registry.get_or_create(output, &factory, &config).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.is_live());
        assert_eq!(factory.created(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn dispose_closes_context() {
        let registry = GraphRegistry::new();
        let factory = ClockContextFactory::new(48000);
        let output = OutputId::from_raw(3);

        let handle = registry
            .get_or_create(output, &factory, &GraphConfig::default())
            .unwrap();
        assert!(registry.dispose(output).await);
        assert!(!handle.is_live());
        assert!(registry.is_empty());
        assert!(!registry.dispose(output).await);
    }

    #[test]
    fn unavailable_device_registers_nothing() {
        let registry = GraphRegistry::new();
        let factory = UnavailableFactory::new("headless");
        let result = registry.get_or_create(OutputId::from_raw(1), &factory, &GraphConfig::default());

        assert!(matches!(result, Err(AudioError::DeviceUnavailable(_))));
        assert!(registry.is_empty());
    }
}
