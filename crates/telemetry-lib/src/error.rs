//! Error types for the telemetry pipeline

use crate::models::TableName;
use crate::provider::Operation;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a provider gateway call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{operation} call failed: {reason}")]
    CallFailed { operation: Operation, reason: String },

    #[error("{operation} returned a malformed response: {reason}")]
    Malformed { operation: Operation, reason: String },
}

impl GatewayError {
    pub fn call_failed(operation: Operation, reason: impl Display) -> Self {
        Self::CallFailed {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(operation: Operation, reason: impl Display) -> Self {
        Self::Malformed {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// Collection failure, classified by how far it reaches
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectionError {
    /// The provider call backing a whole collector failed
    #[error("{table} source unavailable: {reason}")]
    SourceUnavailable { table: TableName, reason: String },

    /// A single item inside a collector loop failed
    #[error("{table} item {item} failed: {reason}")]
    ItemScoped {
        table: TableName,
        item: String,
        reason: String,
    },

    /// Invalid parameters, rejected before any provider call
    #[error("invalid configuration for {field}: {reason}")]
    ConfigurationInvalid { field: &'static str, reason: String },
}

impl CollectionError {
    pub fn source_unavailable(table: TableName, reason: impl Display) -> Self {
        Self::SourceUnavailable {
            table,
            reason: reason.to_string(),
        }
    }

    pub fn item_scoped(table: TableName, item: impl Into<String>, reason: impl Display) -> Self {
        Self::ItemScoped {
            table,
            item: item.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_config(field: &'static str, reason: impl Display) -> Self {
        Self::ConfigurationInvalid {
            field,
            reason: reason.to_string(),
        }
    }

    pub fn is_item_scoped(&self) -> bool {
        matches!(self, CollectionError::ItemScoped { .. })
    }
}

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Failure while persisting tables
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove stale table {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("failed to encode {column} column: {source}")]
    Encode {
        column: &'static str,
        source: serde_json::Error,
    },
}
