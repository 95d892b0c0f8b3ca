//! Per-type inventory adapters
//!
//! Each adapter lists one kind of resource and maps every raw item onto the
//! common [`ResourceRecord`] shape. The normalizer only walks the registry,
//! so supporting a new resource type means registering one more adapter.

use super::Collected;
use crate::error::{CollectionError, CollectionResult};
use crate::models::{
    detail_keys, ResourceRecord, ResourceType, TableName, GLOBAL_REGION, NOT_AVAILABLE,
};
use crate::provider::raw::{RawBucket, RawInstance, RawVolume, Tag};
use crate::provider::{
    async_trait, list_all_instances, list_all_volumes, Dimension, MetricQuery, ProviderGateway,
    Statistic,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const BUCKET_SIZE_NAMESPACE: &str = "AWS/S3";
const BUCKET_SIZE_METRIC: &str = "BucketSizeBytes";
const BUCKET_STORAGE_TYPE: &str = "StandardStorage";
const BUCKET_SIZE_PERIOD_SECS: u32 = 86_400;

/// Lists and normalizes one resource type
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    fn resource_type(&self) -> ResourceType;

    /// Collect every resource of this type.
    ///
    /// A failed listing call is a [`CollectionError::SourceUnavailable`];
    /// per-item problems are recorded in the returned [`Collected`].
    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        now: DateTime<Utc>,
    ) -> CollectionResult<Collected<ResourceRecord>>;
}

/// Flatten a provider tag list; later duplicates win
pub fn flatten_tags(tags: &[Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

fn listing_failed(err: impl std::fmt::Display) -> CollectionError {
    CollectionError::source_unavailable(TableName::Resources, err)
}

/// Compute instances, one record per instance per reservation
pub struct ComputeAdapter;

impl ComputeAdapter {
    pub fn normalize(instance: &RawInstance) -> ResourceRecord {
        ResourceRecord::new(
            &instance.instance_id,
            ResourceType::Compute,
            instance.launch_time,
        )
        .with_region(&instance.placement.availability_zone)
        .with_state(&instance.state.name)
        .with_tags(flatten_tags(&instance.tags))
        .with_detail(detail_keys::INSTANCE_TYPE, instance.instance_type.clone())
    }
}

#[async_trait]
impl ResourceAdapter for ComputeAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Compute
    }

    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        _now: DateTime<Utc>,
    ) -> CollectionResult<Collected<ResourceRecord>> {
        let instances = list_all_instances(gateway, None)
            .await
            .map_err(listing_failed)?;

        let mut collected = Collected::new();
        for instance in &instances {
            collected.push(Self::normalize(instance));
        }

        debug!(count = collected.len(), "Normalized compute instances");
        Ok(collected)
    }
}

/// Block-storage volumes
pub struct BlockStorageAdapter;

impl BlockStorageAdapter {
    /// `fallback_region` is used when the volume carries no zone
    pub fn normalize(volume: &RawVolume, fallback_region: &str) -> ResourceRecord {
        let region = volume
            .availability_zone
            .clone()
            .unwrap_or_else(|| fallback_region.to_string());

        ResourceRecord::new(&volume.volume_id, ResourceType::BlockStorage, volume.create_time)
            .with_region(region)
            .with_state(&volume.state)
            .with_tags(flatten_tags(&volume.tags))
            .with_detail(detail_keys::SIZE, volume.size)
            .with_detail(detail_keys::VOLUME_TYPE, volume.volume_type.clone())
            .with_detail(detail_keys::ATTACHED, !volume.attachments.is_empty())
    }
}

#[async_trait]
impl ResourceAdapter for BlockStorageAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::BlockStorage
    }

    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        _now: DateTime<Utc>,
    ) -> CollectionResult<Collected<ResourceRecord>> {
        let volumes = list_all_volumes(gateway).await.map_err(listing_failed)?;

        let mut collected = Collected::new();
        for volume in &volumes {
            collected.push(Self::normalize(volume, gateway.region()));
        }

        debug!(count = collected.len(), "Normalized block-storage volumes");
        Ok(collected)
    }
}

/// Object-storage buckets with a best-effort size lookup
pub struct ObjectStorageAdapter;

impl ObjectStorageAdapter {
    pub fn normalize(bucket: &RawBucket, size_bytes: f64) -> ResourceRecord {
        ResourceRecord::new(&bucket.name, ResourceType::ObjectStorage, bucket.creation_date)
            .with_region(GLOBAL_REGION)
            .with_state(NOT_AVAILABLE)
            .with_detail(detail_keys::SIZE_BYTES, size_bytes)
    }

    fn size_query(bucket: &RawBucket, now: DateTime<Utc>) -> MetricQuery {
        MetricQuery {
            namespace: BUCKET_SIZE_NAMESPACE.to_string(),
            metric_name: BUCKET_SIZE_METRIC.to_string(),
            dimensions: vec![
                Dimension::new("BucketName", &bucket.name),
                Dimension::new("StorageType", BUCKET_STORAGE_TYPE),
            ],
            start_time: now - Duration::days(1),
            end_time: now,
            period_secs: BUCKET_SIZE_PERIOD_SECS,
            statistics: vec![Statistic::Average],
        }
    }

    /// Trailing 1-day average size; zero when the series has no points
    async fn bucket_size(
        gateway: &dyn ProviderGateway,
        bucket: &RawBucket,
        now: DateTime<Utc>,
    ) -> CollectionResult<f64> {
        let output = gateway
            .metric_statistics(&Self::size_query(bucket, now))
            .await
            .map_err(|e| CollectionError::item_scoped(TableName::Resources, &bucket.name, e))?;

        Ok(output
            .datapoints
            .iter()
            .max_by_key(|d| d.timestamp)
            .and_then(|d| d.average)
            .unwrap_or(0.0))
    }
}

#[async_trait]
impl ResourceAdapter for ObjectStorageAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ObjectStorage
    }

    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        now: DateTime<Utc>,
    ) -> CollectionResult<Collected<ResourceRecord>> {
        let buckets = gateway.list_buckets().await.map_err(listing_failed)?.buckets;

        let mut collected = Collected::new();
        for bucket in &buckets {
            let size_bytes = match Self::bucket_size(gateway, bucket, now).await {
                Ok(size) => size,
                Err(e) => {
                    warn!(bucket = %bucket.name, error = %e, "Bucket size lookup failed, recording size 0");
                    collected.record_failure(e);
                    0.0
                }
            };
            collected.push(Self::normalize(bucket, size_bytes));
        }

        debug!(count = collected.len(), "Normalized object-storage buckets");
        Ok(collected)
    }
}

/// Ordered set of adapters; output order follows registration order
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn ResourceAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    pub fn register(mut self, adapter: Arc<dyn ResourceAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ResourceAdapter>> {
        self.adapters.iter()
    }

    pub fn resource_types(&self) -> Vec<ResourceType> {
        self.adapters.iter().map(|a| a.resource_type()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    /// Instances, then volumes, then buckets
    fn default() -> Self {
        Self::empty()
            .register(Arc::new(ComputeAdapter))
            .register(Arc::new(BlockStorageAdapter))
            .register(Arc::new(ObjectStorageAdapter))
    }
}
