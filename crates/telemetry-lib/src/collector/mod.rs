//! Telemetry collectors
//!
//! Each collector turns one family of provider responses into one flat
//! table. A collector either returns its rows (plus any item-scoped failures
//! it tolerated) or fails as a whole with [`CollectionError::SourceUnavailable`].
//! The [`CollectionOrchestrator`] runs them one after another and keeps a
//! failing source from affecting its siblings.

mod adapters;
mod costs;
mod orchestrator;
mod resources;
mod utilization;

#[cfg(test)]
mod tests;

pub use adapters::{
    flatten_tags, AdapterRegistry, BlockStorageAdapter, ComputeAdapter, ObjectStorageAdapter,
    ResourceAdapter,
};
pub use costs::{CostAggregator, CostWindow, QUICK_CHECK_DAYS, TRAINING_PULL_DAYS};
pub use orchestrator::{
    CollectionConfig, CollectionOrchestrator, CollectionOrchestratorBuilder, MetadataCapability,
};
pub use resources::ResourceNormalizer;
pub use utilization::{SamplerConfig, UtilizationSampler};

use crate::error::{CollectionError, CollectionResult};
use crate::models::TableName;
use crate::provider::ProviderGateway;
use chrono::{DateTime, Utc};

pub use async_trait::async_trait;

/// Rows produced by a collector run, with the item failures it carried past
#[derive(Debug, Clone)]
pub struct Collected<T> {
    pub rows: Vec<T>,
    pub item_failures: Vec<CollectionError>,
}

impl<T> Collected<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            item_failures: Vec::new(),
        }
    }

    pub fn push(&mut self, row: T) {
        self.rows.push(row);
    }

    pub fn record_failure(&mut self, failure: CollectionError) {
        self.item_failures.push(failure);
    }

    /// Append another run's rows and failures, preserving order
    pub fn extend(&mut self, other: Collected<T>) {
        self.rows.extend(other.rows);
        self.item_failures.extend(other.item_failures);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> Default for Collected<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A collector producing one table of the bundle
#[async_trait]
pub trait TableCollector: Send + Sync {
    type Row: Send;

    /// Bundle table this collector fills
    fn table(&self) -> TableName;

    /// Collect the table as of `now`
    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        now: DateTime<Utc>,
    ) -> CollectionResult<Collected<Self::Row>>;
}
