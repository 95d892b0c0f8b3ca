//! Inventory normalization across resource types

use super::{async_trait, AdapterRegistry, Collected, TableCollector};
use crate::error::CollectionResult;
use crate::models::{ResourceRecord, TableName};
use crate::provider::ProviderGateway;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Runs every registered adapter in order and concatenates their records.
///
/// A failed listing in any adapter fails the whole table; per-item failures
/// are carried through in [`Collected::item_failures`].
#[derive(Clone, Default)]
pub struct ResourceNormalizer {
    registry: AdapterRegistry,
}

impl ResourceNormalizer {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }
}

#[async_trait]
impl TableCollector for ResourceNormalizer {
    type Row = ResourceRecord;

    fn table(&self) -> TableName {
        TableName::Resources
    }

    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        now: DateTime<Utc>,
    ) -> CollectionResult<Collected<ResourceRecord>> {
        let mut collected = Collected::new();

        for adapter in self.registry.iter() {
            let part = adapter.collect(gateway, now).await?;
            debug!(
                resource_type = %adapter.resource_type(),
                count = part.len(),
                "Adapter finished"
            );
            collected.extend(part);
        }

        info!(count = collected.len(), "Collected resources");
        Ok(collected)
    }
}
