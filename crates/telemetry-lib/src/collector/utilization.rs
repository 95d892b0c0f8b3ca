//! Utilization sampling for running compute resources

use super::{async_trait, Collected, TableCollector};
use crate::error::{CollectionError, CollectionResult};
use crate::models::{TableName, UtilizationSample};
use crate::provider::raw::Datapoint;
use crate::provider::{list_all_instances, Dimension, MetricQuery, ProviderGateway, Statistic};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

/// What to sample and over which trailing window
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub namespace: String,
    pub metric_name: String,
    pub dimension_name: String,
    /// Only resources in this state are sampled
    pub state_filter: String,
    pub window: Duration,
    pub period_secs: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            namespace: "AWS/EC2".to_string(),
            metric_name: "CPUUtilization".to_string(),
            dimension_name: "InstanceId".to_string(),
            state_filter: "running".to_string(),
            window: Duration::days(7),
            period_secs: 3600,
        }
    }
}

/// Collects hourly metric buckets for every running instance
#[derive(Debug, Clone, Default)]
pub struct UtilizationSampler {
    config: SamplerConfig,
}

impl UtilizationSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn query(&self, resource_id: &str, now: DateTime<Utc>) -> MetricQuery {
        MetricQuery {
            namespace: self.config.namespace.clone(),
            metric_name: self.config.metric_name.clone(),
            dimensions: vec![Dimension::new(&self.config.dimension_name, resource_id)],
            start_time: now - self.config.window,
            end_time: now,
            period_secs: self.config.period_secs,
            statistics: vec![Statistic::Average, Statistic::Maximum, Statistic::Minimum],
        }
    }

    /// Convert a series into samples ordered by bucket time.
    ///
    /// Points missing one of the requested statistics are dropped.
    pub fn samples_from(
        &self,
        resource_id: &str,
        mut datapoints: Vec<Datapoint>,
    ) -> Vec<UtilizationSample> {
        datapoints.sort_by_key(|d| d.timestamp);

        datapoints
            .into_iter()
            .filter_map(|d| match (d.average, d.maximum, d.minimum) {
                (Some(average), Some(maximum), Some(minimum)) => Some(UtilizationSample {
                    resource_id: resource_id.to_string(),
                    metric: self.config.metric_name.clone(),
                    timestamp: d.timestamp,
                    average,
                    maximum,
                    minimum,
                }),
                _ => {
                    debug!(resource_id = %resource_id, timestamp = %d.timestamp, "Dropping incomplete datapoint");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl TableCollector for UtilizationSampler {
    type Row = UtilizationSample;

    fn table(&self) -> TableName {
        TableName::Utilization
    }

    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        now: DateTime<Utc>,
    ) -> CollectionResult<Collected<UtilizationSample>> {
        let instances = list_all_instances(gateway, Some(&self.config.state_filter))
            .await
            .map_err(|e| CollectionError::source_unavailable(TableName::Utilization, e))?;

        let mut collected = Collected::new();
        for instance in &instances {
            let resource_id = &instance.instance_id;
            match gateway.metric_statistics(&self.query(resource_id, now)).await {
                Ok(output) => {
                    collected
                        .rows
                        .extend(self.samples_from(resource_id, output.datapoints));
                }
                Err(e) => {
                    warn!(resource_id = %resource_id, error = %e, "Metric fetch failed, skipping resource");
                    collected.record_failure(CollectionError::item_scoped(
                        TableName::Utilization,
                        resource_id.as_str(),
                        e,
                    ));
                }
            }
        }

        info!(
            resources = instances.len(),
            samples = collected.len(),
            "Collected utilization samples"
        );
        Ok(collected)
    }
}
