//! Provider gateway abstraction
//!
//! The collectors talk to the cloud provider only through the
//! [`ProviderGateway`] trait. Implementations return provider-shaped
//! responses (see [`raw`]) and report failures as [`GatewayError`] without
//! interpreting provider error codes.
//!
//! - [`SnapshotGateway`] replays captured responses from a directory
//! - [`InMemoryGateway`] is programmable, with pagination and failure injection

mod memory;
pub mod raw;
mod snapshot;

pub use memory::InMemoryGateway;
pub use snapshot::SnapshotGateway;

use crate::error::GatewayError;
use chrono::{DateTime, NaiveDate, Utc};
use raw::{
    CostAndUsageOutput, DescribeInstancesOutput, DescribeVolumesOutput, ListBucketsOutput,
    MetricStatisticsOutput, RawInstance, RawVolume,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use async_trait::async_trait;

/// Provider calls the pipeline issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CostAndUsage,
    DescribeInstances,
    DescribeVolumes,
    ListBuckets,
    MetricStatistics,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CostAndUsage => "GetCostAndUsage",
            Operation::DescribeInstances => "DescribeInstances",
            Operation::DescribeVolumes => "DescribeVolumes",
            Operation::ListBuckets => "ListBuckets",
            Operation::MetricStatistics => "GetMetricStatistics",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    Daily,
    Monthly,
}

/// Grouped cost-and-usage query over `[start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct CostQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
    pub metrics: Vec<String>,
    /// Dimension keys, e.g. `SERVICE`, `USAGE_TYPE`
    pub group_by: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Instance listing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceQuery {
    /// Only instances in this state, e.g. `running`
    pub state: Option<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Average,
    Maximum,
    Minimum,
}

/// Point-in-time metric statistics request
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub period_secs: u32,
    pub statistics: Vec<Statistic>,
}

impl MetricQuery {
    /// Value of the first dimension, which identifies the resource
    pub fn primary_dimension(&self) -> Option<&str> {
        self.dimensions.first().map(|d| d.value.as_str())
    }
}

/// Raw calls against a cloud provider
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Region the gateway is bound to
    fn region(&self) -> &str;

    async fn cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsageOutput, GatewayError>;

    async fn describe_instances(
        &self,
        query: &InstanceQuery,
    ) -> Result<DescribeInstancesOutput, GatewayError>;

    async fn describe_volumes(
        &self,
        next_token: Option<&str>,
    ) -> Result<DescribeVolumesOutput, GatewayError>;

    async fn list_buckets(&self) -> Result<ListBucketsOutput, GatewayError>;

    async fn metric_statistics(
        &self,
        query: &MetricQuery,
    ) -> Result<MetricStatisticsOutput, GatewayError>;
}

/// List instances across every page, flattening reservations in order
pub async fn list_all_instances(
    gateway: &dyn ProviderGateway,
    state: Option<&str>,
) -> Result<Vec<RawInstance>, GatewayError> {
    let mut instances = Vec::new();
    let mut query = InstanceQuery {
        state: state.map(str::to_string),
        next_token: None,
    };

    loop {
        let page = gateway.describe_instances(&query).await?;
        instances.extend(
            page.reservations
                .into_iter()
                .flat_map(|reservation| reservation.instances),
        );

        match page.next_token {
            Some(token) => query.next_token = Some(token),
            None => break,
        }
    }

    Ok(instances)
}

/// List volumes across every page
pub async fn list_all_volumes(gateway: &dyn ProviderGateway) -> Result<Vec<RawVolume>, GatewayError> {
    let mut volumes = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = gateway.describe_volumes(next_token.as_deref()).await?;
        volumes.extend(page.volumes);

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(volumes)
}
