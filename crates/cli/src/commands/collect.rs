//! Full collection run against a snapshot directory

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;
use telemetry_lib::{
    BundleSummary, CollectionBundle, CollectionLogger, CollectionOrchestratorBuilder,
    CollectorMetrics, SnapshotGateway, TableWriter, WrittenTable,
};

use crate::output::{color_status, print_info, print_json, print_success, print_table, print_warning, OutputFormat};

pub struct CollectArgs {
    pub snapshot_dir: PathBuf,
    pub output_dir: PathBuf,
    pub region: String,
    pub days_back: u32,
    pub metrics_file: Option<PathBuf>,
}

/// Row for the per-table status table
#[derive(Tabled)]
struct TableStatusRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Item failures")]
    item_failures: usize,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Serialize)]
struct WrittenFile {
    table: String,
    path: String,
    rows: usize,
}

#[derive(Serialize)]
struct CollectOutput {
    #[serde(flatten)]
    summary: BundleSummary,
    files: Vec<WrittenFile>,
}

fn status_rows(bundle: &CollectionBundle) -> Vec<TableStatusRow> {
    bundle
        .reports()
        .into_iter()
        .map(|(table, report)| TableStatusRow {
            table: table.to_string(),
            status: color_status(report.status.as_str()),
            rows: report.rows,
            item_failures: report.item_failures,
            message: report.message.clone().unwrap_or_default(),
        })
        .collect()
}

/// Collect every table, write the non-empty ones and report per-source status
pub async fn run_collect(args: CollectArgs, format: OutputFormat) -> Result<()> {
    if !args.snapshot_dir.is_dir() {
        bail!(
            "Snapshot directory {} does not exist",
            args.snapshot_dir.display()
        );
    }

    let gateway = Arc::new(SnapshotGateway::new(&args.snapshot_dir, &args.region));
    let orchestrator = CollectionOrchestratorBuilder::new()
        .gateway(gateway)
        .days_back(args.days_back)
        .build()
        .context("Invalid collection configuration")?;

    let bundle = orchestrator.collect().await;

    let writer = TableWriter::new(&args.output_dir);
    let written: Vec<WrittenTable> = writer
        .write_bundle(&bundle)
        .context("Failed to write bundle tables")?;

    let logger = CollectionLogger::new(&args.region);
    for table in &written {
        logger.log_table_written(&table.name, &table.path, table.rows);
    }

    if let Some(path) = &args.metrics_file {
        let text = CollectorMetrics::new().encode_text()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => {
            let output = CollectOutput {
                summary: bundle.summary(),
                files: written
                    .iter()
                    .map(|w| WrittenFile {
                        table: w.name.clone(),
                        path: w.path.display().to_string(),
                        rows: w.rows,
                    })
                    .collect(),
            };
            print_json(&output)?;
        }
        OutputFormat::Table => {
            println!("{}", "Collection Summary".bold());
            println!("{}", "=".repeat(50));
            println!("Snapshot:               {}", args.snapshot_dir.display());
            println!("Region:                 {}", args.region.cyan());
            println!("Days back:              {}", args.days_back);
            println!(
                "Run status:             {}",
                color_status(bundle.status().as_str())
            );
            println!();

            print_table(&status_rows(&bundle));
            println!();

            if written.is_empty() {
                print_warning("No tables had rows; nothing written");
            }
            for table in &written {
                print_success(&format!(
                    "Wrote {} rows to {}",
                    table.rows,
                    table.path.display()
                ));
            }
            if let Some(path) = &args.metrics_file {
                print_info(&format!("Metrics written to {}", path.display()));
            }
        }
    }

    Ok(())
}
