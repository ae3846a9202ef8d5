//! Source adapter implementations and the registry the pipeline reads them
//! from.
//!
//! Real provider connectors live outside this crate and register themselves
//! through [`SourceRegistry::register`]. [`FixtureSource`] serves fixed
//! records for development and tests.

pub mod fixture;

pub use fixture::FixtureSource;

use std::collections::HashMap;
use std::sync::Arc;

use crate::source::SourceAdapter;
use crate::types::Source;

/// Adapters by source. At most one adapter per [`Source`].
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own [`SourceAdapter::source`].
    ///
    /// Replaces and returns any adapter previously registered for that source.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> Option<Arc<dyn SourceAdapter>> {
        let source = adapter.source();
        let previous = self.adapters.insert(source, adapter);
        if previous.is_some() {
            tracing::debug!(%source, "replaced source adapter");
        }
        previous
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.register(Arc::new(adapter));
        self
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&source).cloned()
    }

    pub fn contains(&self, source: Source) -> bool {
        self.adapters.contains_key(&source)
    }

    /// Registered sources in canonical order.
    pub fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.adapters.keys().copied().collect();
        sources.sort();
        sources
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.sources())
            .finish()
    }
}
