//! Core data models for the telemetry pipeline

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel for fields a resource type has no value for
pub const NOT_AVAILABLE: &str = "N/A";

/// Region assigned to region-less resources such as buckets
pub const GLOBAL_REGION: &str = "global";

/// Keys used in [`ResourceRecord::details`]
pub mod detail_keys {
    pub const INSTANCE_TYPE: &str = "InstanceType";
    pub const SIZE: &str = "Size";
    pub const VOLUME_TYPE: &str = "VolumeType";
    pub const ATTACHED: &str = "Attached";
    pub const SIZE_BYTES: &str = "size_bytes";
}

/// Logical names of the tables in a collection bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Costs,
    Resources,
    Utilization,
    Metadata,
}

impl TableName {
    /// Every table name, in bundle order
    pub const ALL: [TableName; 4] = [
        TableName::Costs,
        TableName::Resources,
        TableName::Utilization,
        TableName::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Costs => "costs",
            TableName::Resources => "resources",
            TableName::Utilization => "utilization",
            TableName::Metadata => "metadata",
        }
    }

    /// File name used when the table is persisted
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of provisioned resource tracked in the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Compute,
    BlockStorage,
    ObjectStorage,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Compute => "COMPUTE",
            ResourceType::BlockStorage => "BLOCK_STORAGE",
            ResourceType::ObjectStorage => "OBJECT_STORAGE",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inventory item at one point in time, normalized across resource types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub region: String,
    pub state: String,
    #[serde(with = "minute_precision")]
    pub creation_date: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
    pub name: String,
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ResourceRecord {
    /// Create a record with every standardized field set to its sentinel
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: ResourceType,
        creation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type,
            region: NOT_AVAILABLE.to_string(),
            state: NOT_AVAILABLE.to_string(),
            creation_date: truncate_to_minute(creation_date),
            tags: BTreeMap::new(),
            name: NOT_AVAILABLE.to_string(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Set the tags; `name` follows the `Name` tag
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.name = tags
            .get("Name")
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        self.tags = tags;
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// One (day, service, usage type) billing bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub date: NaiveDate,
    pub service: String,
    pub usage_type: String,
    pub cost: f64,
    pub usage_quantity: f64,
    pub normalized_usage: f64,
}

/// One (resource, metric, hourly bucket) observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSample {
    pub resource_id: String,
    pub metric: String,
    pub timestamp: DateTime<Utc>,
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
}

/// Per-resource attribute row of the metadata table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub resource_id: String,
    pub attribute: String,
    pub value: String,
}

/// One (day, synthetic resource) observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRecord {
    pub date: NaiveDate,
    pub resource_id: String,
    pub resource_type: String,
    pub cost: f64,
    pub usage_percent: f64,
    /// Monday = 0
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub is_weekend: bool,
    pub is_idle: bool,
    pub is_underutilized: bool,
    pub is_optimized: bool,
    pub is_overutilized: bool,
    pub region: String,
    pub environment: String,
}

/// Drop seconds and sub-second precision
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Serde adapter for `YYYY-MM-DD HH:MM` timestamps
pub mod minute_precision {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}
