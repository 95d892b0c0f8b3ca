//! Integration tests for the collectors
//!
//! These drive the collectors and the orchestrator against the in-memory
//! gateway and a captured-response directory, without a live account.

#[cfg(test)]
mod gateway_tests {
    use crate::collector::{
        CollectionConfig, CollectionOrchestrator, CollectionOrchestratorBuilder, CostAggregator,
        ResourceNormalizer, TableCollector, UtilizationSampler,
    };
    use crate::error::CollectionError;
    use crate::models::{detail_keys, ResourceType, TableName, NOT_AVAILABLE};
    use crate::provider::raw::{
        DateInterval, Datapoint, Group, InstanceState, MetricValue, Placement, RawBucket,
        RawInstance, RawVolume, Reservation, ResultByTime, Tag,
    };
    use crate::output::TableWriter;
    use crate::provider::{InMemoryGateway, Operation};
    use crate::status::{RunStatus, SourceStatus};
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn instance(id: &str, state: &str, tags: Vec<Tag>) -> RawInstance {
        RawInstance {
            instance_id: id.to_string(),
            instance_type: "t3.micro".to_string(),
            state: InstanceState {
                name: state.to_string(),
            },
            launch_time: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            placement: Placement {
                availability_zone: "us-east-1a".to_string(),
            },
            tags,
        }
    }

    fn reservation(instances: Vec<RawInstance>) -> Reservation {
        Reservation {
            reservation_id: None,
            instances,
        }
    }

    fn volume(id: &str) -> RawVolume {
        RawVolume {
            volume_id: id.to_string(),
            size: 20,
            volume_type: "gp3".to_string(),
            state: "available".to_string(),
            create_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            availability_zone: Some("us-east-1b".to_string()),
            attachments: vec![],
            tags: vec![Tag::new("Name", "scratch")],
        }
    }

    fn bucket(name: &str) -> RawBucket {
        RawBucket {
            name: name.to_string(),
            creation_date: Utc.with_ymd_and_hms(2023, 9, 1, 10, 30, 0).unwrap(),
        }
    }

    fn cpu_point(hours_ago: i64, average: f64) -> Datapoint {
        Datapoint {
            timestamp: now() - Duration::hours(hours_ago),
            average: Some(average),
            maximum: Some(average + 10.0),
            minimum: Some((average - 10.0).max(0.0)),
            unit: Some("Percent".to_string()),
        }
    }

    fn size_point(bytes: f64) -> Datapoint {
        Datapoint {
            timestamp: now() - Duration::hours(12),
            average: Some(bytes),
            maximum: None,
            minimum: None,
            unit: Some("Bytes".to_string()),
        }
    }

    fn cost_day(date: &str, services: &[(&str, &str, &str)]) -> ResultByTime {
        let start: NaiveDate = date.parse().unwrap();
        ResultByTime {
            time_period: DateInterval {
                start,
                end: start.succ_opt().unwrap(),
            },
            groups: services
                .iter()
                .map(|(service, usage_type, cost)| {
                    let mut metrics = BTreeMap::new();
                    metrics.insert("UnblendedCost".to_string(), MetricValue::new(*cost));
                    metrics.insert("UsageQuantity".to_string(), MetricValue::new("1"));
                    metrics.insert("NormalizedUsageAmount".to_string(), MetricValue::new("0"));
                    Group {
                        keys: vec![service.to_string(), usage_type.to_string()],
                        metrics,
                    }
                })
                .collect(),
            estimated: false,
        }
    }

    /// Account with two instance pages, one volume, three buckets and cost data
    fn populated_gateway() -> InMemoryGateway {
        InMemoryGateway::new("us-east-1")
            .with_reservations(vec![reservation(vec![
                instance("i-1", "running", vec![Tag::new("Name", "web")]),
                instance("i-2", "stopped", vec![]),
            ])])
            .with_reservations(vec![reservation(vec![instance("i-3", "running", vec![])])])
            .with_volumes(vec![volume("vol-1")])
            .with_buckets(vec![bucket("b1"), bucket("b2"), bucket("b3")])
            .with_series("AWS/S3", "BucketSizeBytes", "b1", vec![size_point(4096.0)])
            .with_series(
                "AWS/EC2",
                "CPUUtilization",
                "i-1",
                vec![cpu_point(3, 30.0), cpu_point(2, 45.0), cpu_point(1, 60.0)],
            )
            .with_cost_results(vec![
                cost_day("2024-06-01", &[("Amazon EC2", "BoxUsage:t3.micro", "0.25")]),
                cost_day(
                    "2024-06-02",
                    &[
                        ("Amazon EC2", "BoxUsage:t3.micro", "0.25"),
                        ("Amazon S3", "TimedStorage-ByteHrs", "0.01"),
                    ],
                ),
            ])
            .with_cost_results(vec![cost_day(
                "2024-06-03",
                &[("Amazon EC2", "BoxUsage:t3.micro", "0.30")],
            )])
    }

    #[tokio::test]
    async fn test_normalizer_orders_types_and_preserves_source_order() {
        let gateway = populated_gateway();
        let collected = ResourceNormalizer::default()
            .collect(&gateway, now())
            .await
            .unwrap();

        let ids: Vec<&str> = collected.rows.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["i-1", "i-2", "i-3", "vol-1", "b1", "b2", "b3"]);

        let types: Vec<ResourceType> = collected.rows.iter().map(|r| r.resource_type).collect();
        assert_eq!(&types[..3], &[ResourceType::Compute; 3]);
        assert_eq!(types[3], ResourceType::BlockStorage);
        assert_eq!(&types[4..], &[ResourceType::ObjectStorage; 3]);

        assert_eq!(collected.rows[0].name, "web");
        assert_eq!(collected.rows[1].name, NOT_AVAILABLE);
        assert!(collected.rows[1].tags.is_empty());
        assert_eq!(collected.rows[3].name, "scratch");
        assert_eq!(
            collected.rows[4].details[detail_keys::SIZE_BYTES].as_f64(),
            Some(4096.0)
        );
        assert!(collected.item_failures.is_empty());
    }

    #[tokio::test]
    async fn test_failed_bucket_lookup_keeps_bucket_with_zero_size() {
        let gateway = populated_gateway().failing_metric_for("b2");
        let collected = ResourceNormalizer::default()
            .collect(&gateway, now())
            .await
            .unwrap();

        let buckets: Vec<_> = collected
            .rows
            .iter()
            .filter(|r| r.resource_type == ResourceType::ObjectStorage)
            .collect();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[1].resource_id, "b2");
        assert_eq!(buckets[1].details[detail_keys::SIZE_BYTES].as_f64(), Some(0.0));
        assert_eq!(buckets[0].details[detail_keys::SIZE_BYTES].as_f64(), Some(4096.0));
        // b3 has no data points, which is not a failure
        assert_eq!(buckets[2].details[detail_keys::SIZE_BYTES].as_f64(), Some(0.0));

        assert_eq!(collected.item_failures.len(), 1);
        assert!(matches!(
            &collected.item_failures[0],
            CollectionError::ItemScoped { item, .. } if item == "b2"
        ));
    }

    #[tokio::test]
    async fn test_instance_listing_failure_aborts_normalizer() {
        let gateway = populated_gateway().failing(Operation::DescribeInstances);
        let result = ResourceNormalizer::default().collect(&gateway, now()).await;

        assert!(matches!(
            result,
            Err(CollectionError::SourceUnavailable {
                table: TableName::Resources,
                ..
            })
        ));
        assert_eq!(gateway.calls(), vec![Operation::DescribeInstances]);
    }

    #[tokio::test]
    async fn test_volume_listing_failure_discards_collected_instances() {
        let gateway = populated_gateway().failing(Operation::DescribeVolumes);
        let result = ResourceNormalizer::default().collect(&gateway, now()).await;

        assert!(result.is_err());
        assert!(!gateway.calls().contains(&Operation::ListBuckets));
    }

    #[tokio::test]
    async fn test_cost_aggregator_follows_pages_and_queries_window() {
        let gateway = populated_gateway();
        let collected = CostAggregator::new(30)
            .unwrap()
            .collect(&gateway, now())
            .await
            .unwrap();

        assert_eq!(collected.len(), 4);
        let dates: Vec<String> = collected.rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-06-01", "2024-06-02", "2024-06-02", "2024-06-03"]);
        assert_eq!(collected.rows[2].service, "Amazon S3");
        assert_eq!(collected.rows[3].cost, 0.30);

        let queries = gateway.cost_queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].end, now().date_naive());
        assert_eq!((queries[0].end - queries[0].start).num_days(), 30);
        assert_eq!(queries[0].group_by, vec!["SERVICE", "USAGE_TYPE"]);
        assert_eq!(queries[1].next_page_token.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_cost_failure_is_source_unavailable() {
        let gateway = populated_gateway().failing(Operation::CostAndUsage);
        let result = CostAggregator::new(30).unwrap().collect(&gateway, now()).await;

        assert!(matches!(
            result,
            Err(CollectionError::SourceUnavailable {
                table: TableName::Costs,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_sampler_only_samples_running_instances() {
        let gateway = populated_gateway();
        let collected = UtilizationSampler::default()
            .collect(&gateway, now())
            .await
            .unwrap();

        // i-1 has three points, i-3 has none, i-2 is stopped
        assert_eq!(collected.len(), 3);
        assert!(collected.rows.iter().all(|s| s.resource_id == "i-1"));
        assert_eq!(collected.rows[0].average, 30.0);
        assert_eq!(collected.rows[2].average, 60.0);

        let sampled: Vec<String> = gateway
            .metric_queries()
            .iter()
            .filter_map(|q| q.primary_dimension().map(str::to_string))
            .collect();
        assert_eq!(sampled, vec!["i-1", "i-3"]);
    }

    #[tokio::test]
    async fn test_sampler_metric_failure_is_item_scoped() {
        let gateway = populated_gateway().failing_metric_for("i-1");
        let collected = UtilizationSampler::default()
            .collect(&gateway, now())
            .await
            .unwrap();

        assert!(collected.is_empty());
        assert_eq!(collected.item_failures.len(), 1);
        assert!(collected.item_failures[0].is_item_scoped());
        assert_eq!(gateway.metric_queries().len(), 2);
    }

    #[tokio::test]
    async fn test_orchestrator_isolates_cost_failure() {
        let gateway = Arc::new(populated_gateway().failing(Operation::CostAndUsage));
        let orchestrator =
            CollectionOrchestrator::new(gateway.clone(), CollectionConfig::default()).unwrap();

        let bundle = orchestrator.collect_at(now()).await;

        assert!(bundle.costs.is_empty());
        assert_eq!(bundle.costs.report.status, SourceStatus::Unavailable);
        assert!(bundle.costs.report.message.is_some());

        assert_eq!(bundle.resources.len(), 7);
        assert_eq!(bundle.resources.report.status, SourceStatus::Collected);
        assert_eq!(bundle.utilization.len(), 3);

        assert!(bundle.metadata.is_empty());
        assert_eq!(bundle.metadata.report.status, SourceStatus::NotImplemented);

        assert_eq!(bundle.reports().len(), 4);
        assert_eq!(bundle.status(), RunStatus::Partial);
    }

    #[tokio::test]
    async fn test_cost_outage_removes_previous_costs_file() {
        let out = tempfile::TempDir::new().unwrap();
        std::fs::write(out.path().join("costs.csv"), "date,service\n2024-06-01,old\n").unwrap();

        let gateway = Arc::new(populated_gateway().failing(Operation::CostAndUsage));
        let orchestrator =
            CollectionOrchestrator::new(gateway, CollectionConfig::default()).unwrap();
        let bundle = orchestrator.collect_at(now()).await;

        let written = TableWriter::new(out.path()).write_bundle(&bundle).unwrap();

        assert!(written.iter().all(|table| table.name != "costs"));
        assert!(!out.path().join("costs.csv").exists());
        assert!(out.path().join("resources.csv").exists());
    }

    #[tokio::test]
    async fn test_orchestrator_runs_collectors_in_order() {
        let gateway = Arc::new(populated_gateway());
        let orchestrator = CollectionOrchestratorBuilder::new()
            .gateway(gateway.clone())
            .days_back(7)
            .build()
            .unwrap();

        let bundle = orchestrator.collect_at(now()).await;
        assert_eq!(bundle.status(), RunStatus::Complete);
        assert_eq!(bundle.costs.len(), 4);

        let calls = gateway.calls();
        assert_eq!(calls[0], Operation::CostAndUsage);
        let first_listing = calls
            .iter()
            .position(|op| *op == Operation::DescribeInstances)
            .unwrap();
        assert!(calls[..first_listing]
            .iter()
            .all(|op| *op == Operation::CostAndUsage));
        assert_eq!(calls.last(), Some(&Operation::MetricStatistics));
    }

    #[tokio::test]
    async fn test_everything_down_still_yields_four_tables() {
        let gateway = Arc::new(
            InMemoryGateway::new("us-east-1")
                .failing(Operation::CostAndUsage)
                .failing(Operation::DescribeInstances),
        );
        let orchestrator =
            CollectionOrchestrator::new(gateway, CollectionConfig::default()).unwrap();

        let bundle = orchestrator.collect_at(now()).await;

        assert_eq!(bundle.status(), RunStatus::Failed);
        for (_, report) in bundle.reports() {
            assert_eq!(report.rows, 0);
        }
    }

    #[tokio::test]
    async fn test_invalid_days_back_rejected_before_any_call() {
        let gateway = Arc::new(populated_gateway());
        let result = CollectionOrchestratorBuilder::new()
            .gateway(gateway.clone())
            .days_back(0)
            .build();

        assert!(matches!(
            result,
            Err(CollectionError::ConfigurationInvalid { field: "days_back", .. })
        ));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_days_back_rejected_before_any_call() {
        let gateway = Arc::new(populated_gateway());
        let result = CollectionOrchestratorBuilder::new()
            .gateway(gateway.clone())
            .days_back(u32::MAX)
            .build();

        assert!(matches!(
            result,
            Err(CollectionError::ConfigurationInvalid { field: "days_back", .. })
        ));
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn test_builder_requires_gateway() {
        let result = CollectionOrchestratorBuilder::new().build();
        assert!(matches!(
            result,
            Err(CollectionError::ConfigurationInvalid { field: "gateway", .. })
        ));
    }
}

#[cfg(test)]
mod snapshot_tests {
    use crate::collector::{CollectionConfig, CollectionOrchestrator};
    use crate::provider::SnapshotGateway;
    use crate::status::{RunStatus, SourceStatus};
    use chrono::{TimeZone, Utc};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::fs;

    async fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, content).await.unwrap();
    }

    /// Helper to create a captured-response directory
    async fn create_snapshot(temp_dir: &TempDir) {
        let root = temp_dir.path();

        write(
            root,
            "instances.json",
            r#"{"Reservations": [{"Instances": [
                {"InstanceId": "i-0aa", "InstanceType": "t3.small", "State": {"Name": "running"},
                 "LaunchTime": "2024-03-01T08:00:00Z", "Placement": {"AvailabilityZone": "us-west-2a"},
                 "Tags": [{"Key": "Name", "Value": "batch"}]}
            ]}]}"#,
        )
        .await;

        write(
            root,
            "volumes.json",
            r#"{"Volumes": [
                {"VolumeId": "vol-0bb", "Size": 50, "VolumeType": "gp2", "State": "in-use",
                 "CreateTime": "2024-03-01T08:00:00Z", "AvailabilityZone": "us-west-2a",
                 "Attachments": [{"InstanceId": "i-0aa", "State": "attached"}]}
            ]}"#,
        )
        .await;

        write(
            root,
            "buckets.json",
            r#"{"Buckets": [{"Name": "artifacts", "CreationDate": "2023-01-01T00:00:00Z"}]}"#,
        )
        .await;

        write(
            root,
            "cost_and_usage.json",
            r#"{"ResultsByTime": [
                {"TimePeriod": {"Start": "2024-06-10", "End": "2024-06-11"},
                 "Groups": [{"Keys": ["Amazon EC2", "BoxUsage:t3.small"],
                             "Metrics": {"UnblendedCost": {"Amount": "0.50"},
                                         "UsageQuantity": {"Amount": "24"},
                                         "NormalizedUsageAmount": {"Amount": "12"}}}]},
                {"TimePeriod": {"Start": "2023-01-01", "End": "2023-01-02"},
                 "Groups": [{"Keys": ["Amazon EC2", "BoxUsage:t3.small"],
                             "Metrics": {"UnblendedCost": {"Amount": "9.99"},
                                         "UsageQuantity": {"Amount": "24"},
                                         "NormalizedUsageAmount": {"Amount": "12"}}}]}
            ]}"#,
        )
        .await;

        write(
            root,
            "metrics/AWS_EC2/CPUUtilization/i-0aa.json",
            r#"{"Label": "CPUUtilization", "Datapoints": [
                {"Timestamp": "2024-06-15T10:00:00Z", "Average": 12.5, "Maximum": 40.0, "Minimum": 2.0},
                {"Timestamp": "2024-06-15T09:00:00Z", "Average": 11.0, "Maximum": 30.0, "Minimum": 1.0}
            ]}"#,
        )
        .await;
    }

    #[tokio::test]
    async fn test_snapshot_directory_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        create_snapshot(&temp_dir).await;

        let gateway = Arc::new(SnapshotGateway::new(temp_dir.path(), "us-west-2"));
        let orchestrator =
            CollectionOrchestrator::new(gateway, CollectionConfig::default()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        let bundle = orchestrator.collect_at(now).await;

        assert_eq!(bundle.status(), RunStatus::Complete);
        // The 2023 day falls outside the 60-day window
        assert_eq!(bundle.costs.len(), 1);
        assert_eq!(bundle.costs.rows[0].normalized_usage, 12.0);
        assert_eq!(bundle.resources.len(), 3);
        assert_eq!(bundle.resources.rows[0].name, "batch");
        assert_eq!(bundle.utilization.len(), 2);
        assert!(bundle.utilization.rows[0].timestamp < bundle.utilization.rows[1].timestamp);
        assert_eq!(bundle.metadata.report.status, SourceStatus::NotImplemented);
    }

    #[tokio::test]
    async fn test_snapshot_without_cost_file() {
        let temp_dir = TempDir::new().unwrap();
        create_snapshot(&temp_dir).await;
        fs::remove_file(temp_dir.path().join("cost_and_usage.json"))
            .await
            .unwrap();

        let gateway = Arc::new(SnapshotGateway::new(temp_dir.path(), "us-west-2"));
        let orchestrator =
            CollectionOrchestrator::new(gateway, CollectionConfig::default()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        let bundle = orchestrator.collect_at(now).await;

        assert_eq!(bundle.costs.report.status, SourceStatus::Unavailable);
        assert_eq!(bundle.resources.len(), 3);
        assert_eq!(bundle.utilization.len(), 2);
        assert_eq!(bundle.status(), RunStatus::Partial);
    }
}
