//! Per-source status reporting
//!
//! Every table in a bundle carries a [`SourceReport`] so consumers can tell
//! an empty table that was collected apart from one whose source was down,
//! or one whose collector does not exist yet.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one source in a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// The collector ran; the table holds everything it found
    Collected,
    /// The provider call backing the collector failed
    Unavailable,
    /// No collector exists for this table
    NotImplemented,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Collected => "collected",
            SourceStatus::Unavailable => "unavailable",
            SourceStatus::NotImplemented => "not_implemented",
        }
    }

    /// Returns true if the source has a collector behind it
    pub fn is_implemented(&self) -> bool {
        !matches!(self, SourceStatus::NotImplemented)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report attached to one bundle table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub rows: usize,
    pub item_failures: usize,
    pub last_check_timestamp: i64,
}

impl SourceReport {
    pub fn collected(rows: usize, item_failures: usize) -> Self {
        Self {
            status: SourceStatus::Collected,
            message: None,
            rows,
            item_failures,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: SourceStatus::Unavailable,
            message: Some(message.into()),
            rows: 0,
            item_failures: 0,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self {
            status: SourceStatus::NotImplemented,
            message: Some(message.into()),
            rows: 0,
            item_failures: 0,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Roll-up of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every implemented source was collected
    Complete,
    /// At least one implemented source was unavailable
    Partial,
    /// Every implemented source was unavailable
    Failed,
}

impl RunStatus {
    /// Compute the roll-up; `not_implemented` sources are ignored
    pub fn compute<'a>(reports: impl IntoIterator<Item = &'a SourceReport>) -> RunStatus {
        let mut implemented = 0usize;
        let mut unavailable = 0usize;

        for report in reports {
            match report.status {
                SourceStatus::Collected => implemented += 1,
                SourceStatus::Unavailable => {
                    implemented += 1;
                    unavailable += 1;
                }
                SourceStatus::NotImplemented => {}
            }
        }

        if unavailable == 0 {
            RunStatus::Complete
        } else if unavailable == implemented {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Complete => "complete",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_collected_is_complete() {
        let reports = [
            SourceReport::collected(10, 0),
            SourceReport::collected(0, 0),
            SourceReport::not_implemented("metadata collector not implemented"),
        ];
        assert_eq!(RunStatus::compute(&reports), RunStatus::Complete);
    }

    #[test]
    fn test_one_unavailable_is_partial() {
        let reports = [
            SourceReport::unavailable("access denied"),
            SourceReport::collected(3, 1),
            SourceReport::collected(5, 0),
        ];
        assert_eq!(RunStatus::compute(&reports), RunStatus::Partial);
    }

    #[test]
    fn test_all_unavailable_is_failed() {
        let reports = [
            SourceReport::unavailable("a"),
            SourceReport::unavailable("b"),
            SourceReport::not_implemented("c"),
        ];
        assert_eq!(RunStatus::compute(&reports), RunStatus::Failed);
    }

    #[test]
    fn test_status_serialization() {
        let report = SourceReport::not_implemented("stub");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "not_implemented");
        assert_eq!(json["message"], "stub");

        let report = SourceReport::collected(4, 0);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("message").is_none());
        assert!(SourceStatus::Collected.is_implemented());
        assert!(!SourceStatus::NotImplemented.is_implemented());
    }
}
