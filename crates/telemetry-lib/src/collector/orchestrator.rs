//! Collection orchestration
//!
//! Runs the cost, resource and utilization collectors one after another
//! against a single gateway and assembles their tables into a
//! [`CollectionBundle`]. A collector that fails leaves its own table empty
//! and marked unavailable; it never stops the others from running.

use super::{
    AdapterRegistry, CostAggregator, ResourceNormalizer, SamplerConfig, TableCollector,
    UtilizationSampler, TRAINING_PULL_DAYS,
};
use crate::bundle::{BundleEntry, CollectionBundle};
use crate::error::{CollectionError, CollectionResult};
use crate::models::{MetadataRecord, TableName};
use crate::observability::{CollectionLogger, CollectorMetrics};
use crate::provider::ProviderGateway;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Configuration for a collection run
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Days of cost history to pull (default: 60)
    pub days_back: u32,
    /// Utilization sampling parameters
    pub sampler: SamplerConfig,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            days_back: TRAINING_PULL_DAYS,
            sampler: SamplerConfig::default(),
        }
    }
}

/// Availability of the per-resource metadata source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataCapability {
    NotImplemented,
}

impl MetadataCapability {
    fn entry(&self) -> BundleEntry<MetadataRecord> {
        match self {
            MetadataCapability::NotImplemented => {
                BundleEntry::not_implemented("metadata collection is not implemented")
            }
        }
    }
}

/// Sequences the collectors and isolates their failures
pub struct CollectionOrchestrator {
    gateway: Arc<dyn ProviderGateway>,
    costs: CostAggregator,
    resources: ResourceNormalizer,
    utilization: UtilizationSampler,
    metadata: MetadataCapability,
    metrics: CollectorMetrics,
    logger: CollectionLogger,
}

impl CollectionOrchestrator {
    /// Create an orchestrator with the default adapter registry.
    ///
    /// Invalid configuration is rejected here, before any provider call.
    pub fn new(gateway: Arc<dyn ProviderGateway>, config: CollectionConfig) -> CollectionResult<Self> {
        CollectionOrchestratorBuilder::new()
            .gateway(gateway)
            .days_back(config.days_back)
            .sampler(config.sampler)
            .build()
    }

    pub fn days_back(&self) -> u32 {
        self.costs.days_back()
    }

    /// Collect every table as of now
    pub async fn collect(&self) -> CollectionBundle {
        self.collect_at(Utc::now()).await
    }

    /// Collect every table as of `now`
    pub async fn collect_at(&self, now: DateTime<Utc>) -> CollectionBundle {
        self.logger.log_run_started(self.costs.days_back());

        let costs = self.run(&self.costs, now).await;
        let resources = self.run(&self.resources, now).await;
        let utilization = self.run(&self.utilization, now).await;

        self.logger.log_not_implemented(TableName::Metadata);
        let metadata = self.metadata.entry();

        let bundle = CollectionBundle {
            costs,
            resources,
            utilization,
            metadata,
            collected_at: now,
        };

        self.logger.log_run_finished(bundle.status());
        bundle
    }

    /// Run one collector, converting a whole-source failure into an empty,
    /// unavailable entry
    async fn run<C: TableCollector>(&self, collector: &C, now: DateTime<Utc>) -> BundleEntry<C::Row> {
        let table = collector.table();
        let start = Instant::now();

        let result = collector.collect(self.gateway.as_ref(), now).await;

        let elapsed = start.elapsed();
        self.metrics
            .observe_collection_latency(table, elapsed.as_secs_f64());

        match result {
            Ok(collected) => {
                for failure in &collected.item_failures {
                    self.logger.log_item_failed(failure);
                }
                self.metrics.add_rows_collected(table, collected.len());
                self.metrics
                    .add_item_failures(table, collected.item_failures.len());
                self.logger.log_table_collected(
                    table,
                    collected.len(),
                    collected.item_failures.len(),
                    elapsed.as_millis(),
                );

                BundleEntry::collected(collected.rows, collected.item_failures.len())
            }
            Err(err) => {
                self.metrics.inc_source_failures(table);
                self.logger.log_source_unavailable(table, &err);
                BundleEntry::unavailable(err.to_string())
            }
        }
    }
}

/// Builder for [`CollectionOrchestrator`]
pub struct CollectionOrchestratorBuilder {
    gateway: Option<Arc<dyn ProviderGateway>>,
    registry: AdapterRegistry,
    config: CollectionConfig,
}

impl CollectionOrchestratorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            gateway: None,
            registry: AdapterRegistry::default(),
            config: CollectionConfig::default(),
        }
    }

    /// Set the provider gateway
    pub fn gateway(mut self, gateway: Arc<dyn ProviderGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the cost history window in days
    pub fn days_back(mut self, days_back: u32) -> Self {
        self.config.days_back = days_back;
        self
    }

    /// Replace the resource adapter registry
    pub fn registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the utilization sampling parameters
    pub fn sampler(mut self, sampler: SamplerConfig) -> Self {
        self.config.sampler = sampler;
        self
    }

    /// Build the orchestrator, validating the configuration
    pub fn build(self) -> CollectionResult<CollectionOrchestrator> {
        let gateway = self
            .gateway
            .ok_or_else(|| CollectionError::invalid_config("gateway", "a provider gateway is required"))?;

        if self.config.sampler.period_secs == 0 {
            return Err(CollectionError::invalid_config(
                "sampler.period_secs",
                "must be positive",
            ));
        }

        let costs = CostAggregator::new(self.config.days_back)?;
        let logger = CollectionLogger::new(gateway.region());

        debug!(
            days_back = self.config.days_back,
            adapters = self.registry.len(),
            "Built collection orchestrator"
        );

        Ok(CollectionOrchestrator {
            gateway,
            costs,
            resources: ResourceNormalizer::new(self.registry),
            utilization: UtilizationSampler::new(self.config.sampler),
            metadata: MetadataCapability::NotImplemented,
            metrics: CollectorMetrics::new(),
            logger,
        })
    }
}

impl Default for CollectionOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
