//! Cloud cost telemetry library
//!
//! This crate provides the core functionality for:
//! - Provider access behind a gateway trait (captured snapshots, in-memory)
//! - Normalizing compute, block-storage and object-storage inventory
//! - Flattening the daily cost ledger and sampling utilization
//! - Orchestrating collectors into a bundle of tables with per-source status
//! - Seeded synthetic cost/usage data generation
//! - CSV persistence, metrics and structured logging

pub mod bundle;
pub mod collector;
pub mod error;
pub mod models;
pub mod observability;
pub mod output;
pub mod provider;
pub mod status;
pub mod synthetic;

pub use bundle::{BundleEntry, BundleSummary, CollectionBundle, TableSummary};
pub use collector::{CollectionConfig, CollectionOrchestrator, CollectionOrchestratorBuilder};
pub use error::{CollectionError, CollectionResult, GatewayError, OutputError};
pub use models::*;
pub use observability::{CollectionLogger, CollectorMetrics};
pub use output::{write_file, write_synthetic, TableWriter, WrittenTable};
pub use provider::{InMemoryGateway, ProviderGateway, SnapshotGateway};
pub use status::{RunStatus, SourceReport, SourceStatus};
pub use synthetic::{SyntheticDataGenerator, SyntheticSummary};
