//! Programmable in-memory gateway
//!
//! Serves canned pages and can be told to fail whole operations or
//! individual metric lookups. Every call is recorded so tests can assert on
//! what the collectors asked for.

use super::raw::{
    CostAndUsageOutput, Datapoint, DescribeInstancesOutput, DescribeVolumesOutput,
    ListBucketsOutput, MetricStatisticsOutput, RawBucket, RawVolume, Reservation, ResultByTime,
};
use super::{async_trait, CostQuery, InstanceQuery, MetricQuery, Operation, ProviderGateway};
use crate::error::GatewayError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryGateway {
    region: String,
    reservation_pages: Vec<Vec<Reservation>>,
    volume_pages: Vec<Vec<RawVolume>>,
    buckets: Vec<RawBucket>,
    cost_pages: Vec<Vec<ResultByTime>>,
    /// (namespace, metric name, primary dimension value) -> series
    series: HashMap<(String, String, String), Vec<Datapoint>>,
    failing_operations: HashSet<Operation>,
    failing_dimensions: HashSet<String>,
    calls: Mutex<Vec<Operation>>,
    cost_queries: Mutex<Vec<CostQuery>>,
    metric_queries: Mutex<Vec<MetricQuery>>,
}

impl InMemoryGateway {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Append a page of reservations
    pub fn with_reservations(mut self, page: Vec<Reservation>) -> Self {
        self.reservation_pages.push(page);
        self
    }

    /// Append a page of volumes
    pub fn with_volumes(mut self, page: Vec<RawVolume>) -> Self {
        self.volume_pages.push(page);
        self
    }

    pub fn with_buckets(mut self, buckets: Vec<RawBucket>) -> Self {
        self.buckets = buckets;
        self
    }

    /// Append a page of cost results
    pub fn with_cost_results(mut self, page: Vec<ResultByTime>) -> Self {
        self.cost_pages.push(page);
        self
    }

    pub fn with_series(
        mut self,
        namespace: &str,
        metric_name: &str,
        dimension_value: &str,
        datapoints: Vec<Datapoint>,
    ) -> Self {
        self.series.insert(
            (
                namespace.to_string(),
                metric_name.to_string(),
                dimension_value.to_string(),
            ),
            datapoints,
        );
        self
    }

    /// Make every call of `operation` fail
    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing_operations.insert(operation);
        self
    }

    /// Make metric lookups for one resource fail
    pub fn failing_metric_for(mut self, dimension_value: impl Into<String>) -> Self {
        self.failing_dimensions.insert(dimension_value.into());
        self
    }

    /// Operations issued so far, in call order
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn cost_queries(&self) -> Vec<CostQuery> {
        self.cost_queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn metric_queries(&self) -> Vec<MetricQuery> {
        self.metric_queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn record(&self, operation: Operation) -> Result<(), GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation);
        }
        if self.failing_operations.contains(&operation) {
            return Err(GatewayError::call_failed(operation, "injected failure"));
        }
        Ok(())
    }
}

/// Page index encoded in a continuation token
fn page_index(operation: Operation, token: Option<&str>) -> Result<usize, GatewayError> {
    match token {
        None => Ok(0),
        Some(t) => t
            .parse()
            .map_err(|_| GatewayError::call_failed(operation, format!("invalid page token {t}"))),
    }
}

fn next_token(index: usize, pages: usize) -> Option<String> {
    (index + 1 < pages).then(|| (index + 1).to_string())
}

#[async_trait]
impl ProviderGateway for InMemoryGateway {
    fn region(&self) -> &str {
        &self.region
    }

    async fn cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsageOutput, GatewayError> {
        if let Ok(mut queries) = self.cost_queries.lock() {
            queries.push(query.clone());
        }
        self.record(Operation::CostAndUsage)?;

        let index = page_index(Operation::CostAndUsage, query.next_page_token.as_deref())?;
        Ok(CostAndUsageOutput {
            results_by_time: self.cost_pages.get(index).cloned().unwrap_or_default(),
            next_page_token: next_token(index, self.cost_pages.len()),
        })
    }

    async fn describe_instances(
        &self,
        query: &InstanceQuery,
    ) -> Result<DescribeInstancesOutput, GatewayError> {
        self.record(Operation::DescribeInstances)?;

        let index = page_index(Operation::DescribeInstances, query.next_token.as_deref())?;
        let mut reservations = self.reservation_pages.get(index).cloned().unwrap_or_default();

        if let Some(state) = &query.state {
            for reservation in &mut reservations {
                reservation.instances.retain(|i| &i.state.name == state);
            }
            reservations.retain(|r| !r.instances.is_empty());
        }

        Ok(DescribeInstancesOutput {
            reservations,
            next_token: next_token(index, self.reservation_pages.len()),
        })
    }

    async fn describe_volumes(
        &self,
        next_token_in: Option<&str>,
    ) -> Result<DescribeVolumesOutput, GatewayError> {
        self.record(Operation::DescribeVolumes)?;

        let index = page_index(Operation::DescribeVolumes, next_token_in)?;
        Ok(DescribeVolumesOutput {
            volumes: self.volume_pages.get(index).cloned().unwrap_or_default(),
            next_token: next_token(index, self.volume_pages.len()),
        })
    }

    async fn list_buckets(&self) -> Result<ListBucketsOutput, GatewayError> {
        self.record(Operation::ListBuckets)?;
        Ok(ListBucketsOutput {
            buckets: self.buckets.clone(),
        })
    }

    async fn metric_statistics(
        &self,
        query: &MetricQuery,
    ) -> Result<MetricStatisticsOutput, GatewayError> {
        if let Ok(mut queries) = self.metric_queries.lock() {
            queries.push(query.clone());
        }
        self.record(Operation::MetricStatistics)?;

        let dimension = query.primary_dimension().unwrap_or_default().to_string();
        if self.failing_dimensions.contains(&dimension) {
            return Err(GatewayError::call_failed(
                Operation::MetricStatistics,
                format!("injected failure for {dimension}"),
            ));
        }

        let key = (query.namespace.clone(), query.metric_name.clone(), dimension);
        Ok(MetricStatisticsOutput {
            label: Some(query.metric_name.clone()),
            datapoints: self.series.get(&key).cloned().unwrap_or_default(),
        })
    }
}
