//! Named bundle of result tables from one collection run

use crate::models::{CostRecord, MetadataRecord, ResourceRecord, TableName, UtilizationSample};
use crate::status::{RunStatus, SourceReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One table together with the report of the source that produced it
#[derive(Debug, Clone)]
pub struct BundleEntry<T> {
    pub rows: Vec<T>,
    pub report: SourceReport,
}

impl<T> BundleEntry<T> {
    pub fn collected(rows: Vec<T>, item_failures: usize) -> Self {
        let report = SourceReport::collected(rows.len(), item_failures);
        Self { rows, report }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            report: SourceReport::unavailable(reason),
        }
    }

    pub fn not_implemented(reason: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            report: SourceReport::not_implemented(reason),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of one orchestrated run. All four tables are always present.
#[derive(Debug, Clone)]
pub struct CollectionBundle {
    pub costs: BundleEntry<CostRecord>,
    pub resources: BundleEntry<ResourceRecord>,
    pub utilization: BundleEntry<UtilizationSample>,
    pub metadata: BundleEntry<MetadataRecord>,
    pub collected_at: DateTime<Utc>,
}

impl CollectionBundle {
    pub fn report(&self, table: TableName) -> &SourceReport {
        match table {
            TableName::Costs => &self.costs.report,
            TableName::Resources => &self.resources.report,
            TableName::Utilization => &self.utilization.report,
            TableName::Metadata => &self.metadata.report,
        }
    }

    /// Reports in bundle order
    pub fn reports(&self) -> Vec<(TableName, &SourceReport)> {
        TableName::ALL
            .iter()
            .map(|table| (*table, self.report(*table)))
            .collect()
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::compute(TableName::ALL.iter().map(|table| self.report(*table)))
    }

    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            status: self.status(),
            collected_at: self.collected_at,
            tables: self
                .reports()
                .into_iter()
                .map(|(table, report)| TableSummary {
                    table,
                    report: report.clone(),
                })
                .collect(),
        }
    }
}

/// Serializable overview of a bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSummary {
    pub status: RunStatus,
    pub collected_at: DateTime<Utc>,
    pub tables: Vec<TableSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub table: TableName,
    #[serde(flatten)]
    pub report: SourceReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SourceStatus;

    fn bundle() -> CollectionBundle {
        CollectionBundle {
            costs: BundleEntry::unavailable("billing query failed"),
            resources: BundleEntry::collected(vec![], 0),
            utilization: BundleEntry::collected(vec![], 2),
            metadata: BundleEntry::not_implemented("no metadata collector"),
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_reports_cover_every_table_in_order() {
        let bundle = bundle();
        let tables: Vec<TableName> = bundle.reports().into_iter().map(|(t, _)| t).collect();
        assert_eq!(tables, TableName::ALL.to_vec());
    }

    #[test]
    fn test_unavailable_differs_from_empty() {
        let bundle = bundle();

        assert!(bundle.costs.is_empty());
        assert!(bundle.resources.is_empty());
        assert_eq!(bundle.report(TableName::Costs).status, SourceStatus::Unavailable);
        assert_eq!(bundle.report(TableName::Resources).status, SourceStatus::Collected);
        assert_eq!(bundle.status(), RunStatus::Partial);
    }

    #[test]
    fn test_summary_serializes_flat_reports() {
        let summary = bundle().summary();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["status"], "partial");
        assert_eq!(json["tables"][0]["table"], "costs");
        assert_eq!(json["tables"][0]["status"], "unavailable");
        assert_eq!(json["tables"][2]["item_failures"], 2);
        assert_eq!(json["tables"][3]["status"], "not_implemented");
    }
}
