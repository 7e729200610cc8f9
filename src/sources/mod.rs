// src/sources/mod.rs
pub mod extract;
pub mod kavak;
pub mod mercadolibre;

pub use kavak::KavakAdapter;
pub use mercadolibre::MercadoLibreAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::{RawListing, Source};

/// Capability set every marketplace implements: fetch + parse behind one call.
///
/// Adapters are tolerant by contract: a record missing title or link is
/// dropped, a malformed price becomes zero, and markup drift degrades to an
/// empty batch rather than a panic.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Top listings for `query`, at most `limit`, in source-native ranking
    /// order. The overall wall-clock bound is enforced by the aggregator.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawListing>, SourceError>;

    fn source(&self) -> Source;
}

/// Adapter registry keyed by source identifier.
///
/// The priority order decides which record wins a cross-source dedup and
/// breaks price ties in the final ordering.
pub struct SourceRegistry {
    adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
    priority: Vec<Source>,
}

impl SourceRegistry {
    pub fn new(priority: Vec<Source>) -> Self {
        Self {
            adapters: HashMap::new(),
            priority,
        }
    }

    /// Register an adapter under its own source id. An adapter outside the
    /// configured priority list is appended at the end.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        let src = adapter.source();
        if !self.priority.contains(&src) {
            self.priority.push(src);
        }
        self.adapters.insert(src, adapter);
        self
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&source).cloned()
    }

    /// Registered sources in priority order.
    pub fn configured(&self) -> Vec<Source> {
        self.priority
            .iter()
            .copied()
            .filter(|s| self.adapters.contains_key(s))
            .collect()
    }

    /// Position in the priority order; unregistered sources sort last.
    pub fn priority_index(&self, source: Source) -> usize {
        self.priority
            .iter()
            .position(|&s| s == source)
            .unwrap_or(self.priority.len())
    }
}
