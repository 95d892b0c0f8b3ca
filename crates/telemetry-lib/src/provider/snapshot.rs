//! Gateway that replays captured provider responses from disk
//!
//! Directory layout:
//!
//! ```text
//! <root>/instances.json        DescribeInstances response
//! <root>/volumes.json          DescribeVolumes response
//! <root>/buckets.json          ListBuckets response
//! <root>/cost_and_usage.json   GetCostAndUsage response
//! <root>/metrics/<namespace>/<metric>/<dimension value>.json
//! ```
//!
//! Namespace separators (`/`) become `_` in directory names, so the CPU
//! series for `i-0abc` lives at `metrics/AWS_EC2/CPUUtilization/i-0abc.json`.
//! A missing metric file means the series has no data points; any other I/O
//! error on the metric path fails the call.

use super::raw::{
    CostAndUsageOutput, DescribeInstancesOutput, DescribeVolumesOutput, ListBucketsOutput,
    MetricStatisticsOutput,
};
use super::{async_trait, CostQuery, InstanceQuery, MetricQuery, Operation, ProviderGateway};
use crate::error::GatewayError;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SnapshotGateway {
    root: PathBuf,
    region: String,
}

impl SnapshotGateway {
    pub fn new(root: impl Into<PathBuf>, region: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            region: region.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metric_path(&self, query: &MetricQuery) -> Option<PathBuf> {
        let dimension = query.primary_dimension()?;
        Some(
            self.root
                .join("metrics")
                .join(query.namespace.replace('/', "_"))
                .join(&query.metric_name)
                .join(format!("{}.json", dimension)),
        )
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        path: &Path,
    ) -> Result<T, GatewayError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::call_failed(operation, format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| GatewayError::malformed(operation, format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl ProviderGateway for SnapshotGateway {
    fn region(&self) -> &str {
        &self.region
    }

    async fn cost_and_usage(&self, query: &CostQuery) -> Result<CostAndUsageOutput, GatewayError> {
        let path = self.root.join("cost_and_usage.json");
        let mut output: CostAndUsageOutput = self.read_json(Operation::CostAndUsage, &path).await?;

        output
            .results_by_time
            .retain(|r| r.time_period.start >= query.start && r.time_period.start < query.end);
        output.next_page_token = None;

        Ok(output)
    }

    async fn describe_instances(
        &self,
        query: &InstanceQuery,
    ) -> Result<DescribeInstancesOutput, GatewayError> {
        let path = self.root.join("instances.json");
        let mut output: DescribeInstancesOutput =
            self.read_json(Operation::DescribeInstances, &path).await?;

        if let Some(state) = &query.state {
            for reservation in &mut output.reservations {
                reservation.instances.retain(|i| &i.state.name == state);
            }
            output.reservations.retain(|r| !r.instances.is_empty());
        }
        output.next_token = None;

        Ok(output)
    }

    async fn describe_volumes(
        &self,
        _next_token: Option<&str>,
    ) -> Result<DescribeVolumesOutput, GatewayError> {
        let path = self.root.join("volumes.json");
        let mut output: DescribeVolumesOutput =
            self.read_json(Operation::DescribeVolumes, &path).await?;
        output.next_token = None;
        Ok(output)
    }

    async fn list_buckets(&self) -> Result<ListBucketsOutput, GatewayError> {
        let path = self.root.join("buckets.json");
        self.read_json(Operation::ListBuckets, &path).await
    }

    async fn metric_statistics(
        &self,
        query: &MetricQuery,
    ) -> Result<MetricStatisticsOutput, GatewayError> {
        let path = self.metric_path(query).ok_or_else(|| {
            GatewayError::call_failed(Operation::MetricStatistics, "query has no dimensions")
        })?;

        let exists = tokio::fs::try_exists(&path).await.map_err(|e| {
            GatewayError::call_failed(Operation::MetricStatistics, format!("{}: {}", path.display(), e))
        })?;
        if !exists {
            debug!(path = %path.display(), "No metric snapshot, returning empty series");
            return Ok(MetricStatisticsOutput {
                label: Some(query.metric_name.clone()),
                datapoints: Vec::new(),
            });
        }

        let mut output: MetricStatisticsOutput =
            self.read_json(Operation::MetricStatistics, &path).await?;
        output
            .datapoints
            .retain(|d| d.timestamp >= query.start_time && d.timestamp < query.end_time);

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Dimension, Granularity, Statistic};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;
    use tokio::fs;

    async fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_instances_state_filter() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "instances.json",
            r#"{"Reservations": [
                {"Instances": [
                    {"InstanceId": "i-1", "InstanceType": "t3.micro", "State": {"Name": "running"},
                     "LaunchTime": "2024-01-01T00:00:00Z", "Placement": {"AvailabilityZone": "us-east-1a"}},
                    {"InstanceId": "i-2", "InstanceType": "t3.micro", "State": {"Name": "stopped"},
                     "LaunchTime": "2024-01-01T00:00:00Z", "Placement": {"AvailabilityZone": "us-east-1b"}}
                ]},
                {"Instances": [
                    {"InstanceId": "i-3", "InstanceType": "m5.large", "State": {"Name": "stopped"},
                     "LaunchTime": "2024-01-01T00:00:00Z", "Placement": {"AvailabilityZone": "us-east-1c"}}
                ]}
            ]}"#,
        )
        .await;

        let gateway = SnapshotGateway::new(temp_dir.path(), "us-east-1");

        let all = gateway.describe_instances(&InstanceQuery::default()).await.unwrap();
        assert_eq!(all.reservations.len(), 2);

        let running = gateway
            .describe_instances(&InstanceQuery {
                state: Some("running".to_string()),
                next_token: None,
            })
            .await
            .unwrap();
        assert_eq!(running.reservations.len(), 1);
        assert_eq!(running.reservations[0].instances[0].instance_id, "i-1");
    }

    #[tokio::test]
    async fn test_cost_results_limited_to_window() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "cost_and_usage.json",
            r#"{"ResultsByTime": [
                {"TimePeriod": {"Start": "2024-05-01", "End": "2024-05-02"}, "Groups": []},
                {"TimePeriod": {"Start": "2024-05-02", "End": "2024-05-03"}, "Groups": []},
                {"TimePeriod": {"Start": "2024-05-03", "End": "2024-05-04"}, "Groups": []}
            ]}"#,
        )
        .await;

        let gateway = SnapshotGateway::new(temp_dir.path(), "us-east-1");
        let output = gateway
            .cost_and_usage(&CostQuery {
                start: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                granularity: Granularity::Daily,
                metrics: vec!["UnblendedCost".to_string()],
                group_by: vec!["SERVICE".to_string()],
                next_page_token: None,
            })
            .await
            .unwrap();

        assert_eq!(output.results_by_time.len(), 1);
        assert_eq!(output.results_by_time[0].time_period.start.to_string(), "2024-05-02");
    }

    #[tokio::test]
    async fn test_missing_metric_file_is_empty_series() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = SnapshotGateway::new(temp_dir.path(), "us-east-1");

        let output = gateway
            .metric_statistics(&MetricQuery {
                namespace: "AWS/EC2".to_string(),
                metric_name: "CPUUtilization".to_string(),
                dimensions: vec![Dimension::new("InstanceId", "i-missing")],
                start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap(),
                period_secs: 3600,
                statistics: vec![Statistic::Average],
            })
            .await
            .unwrap();

        assert!(output.datapoints.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_metric_path_fails_call() {
        let temp_dir = TempDir::new().unwrap();
        // A plain file where the metrics directory should be
        write(temp_dir.path(), "metrics", "").await;
        let gateway = SnapshotGateway::new(temp_dir.path(), "us-east-1");

        let err = gateway
            .metric_statistics(&MetricQuery {
                namespace: "AWS/S3".to_string(),
                metric_name: "BucketSizeBytes".to_string(),
                dimensions: vec![Dimension::new("BucketName", "logs")],
                start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
                period_secs: 86400,
                statistics: vec![Statistic::Average],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::CallFailed {
                operation: Operation::MetricStatistics,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_listing_file_fails_call() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = SnapshotGateway::new(temp_dir.path(), "us-east-1");

        let err = gateway.list_buckets().await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::CallFailed {
                operation: Operation::ListBuckets,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_listing_file() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "volumes.json", "{not json").await;
        let gateway = SnapshotGateway::new(temp_dir.path(), "us-east-1");

        let err = gateway.describe_volumes(None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Malformed { .. }));
    }
}
