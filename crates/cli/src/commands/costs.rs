//! Cost-related CLI commands

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tabled::Tabled;
use telemetry_lib::collector::{CostAggregator, CostWindow, TableCollector};
use telemetry_lib::{write_file, CostRecord, SnapshotGateway, TableName};

use crate::output::{
    format_currency, print_info, print_json, print_success, print_table, OutputFormat,
};

pub struct CostsArgs {
    pub snapshot_dir: PathBuf,
    pub region: String,
    pub days_back: u32,
    pub top: usize,
    /// Ledger file; defaults to [`ledger_file_name`] inside `output_dir`
    pub output: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Spend attributed to one service over the window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCost {
    pub service: String,
    pub cost: f64,
    /// Share of the window's total, in percent
    pub share: f64,
}

#[derive(Serialize)]
struct CostReport {
    start: NaiveDate,
    end: NaiveDate,
    total_cost: f64,
    daily_average: f64,
    records: usize,
    top_services: Vec<ServiceCost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<String>,
}

/// Default ledger file name for a window
pub fn ledger_file_name(window: &CostWindow) -> String {
    format!("aws_costs_{}_to_{}.csv", window.start, window.end)
}

/// Row for the top services table
#[derive(Tabled)]
struct ServiceCostRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Share")]
    share: String,
}

/// Sum cost per service and keep the `top` most expensive, highest first
pub fn top_services(records: &[CostRecord], top: usize) -> Vec<ServiceCost> {
    let total: f64 = records.iter().map(|r| r.cost).sum();

    let mut by_service: HashMap<&str, f64> = HashMap::new();
    for record in records {
        *by_service.entry(record.service.as_str()).or_default() += record.cost;
    }

    let mut services: Vec<ServiceCost> = by_service
        .into_iter()
        .map(|(service, cost)| ServiceCost {
            service: service.to_string(),
            cost,
            share: if total > 0.0 { cost / total * 100.0 } else { 0.0 },
        })
        .collect();

    services.sort_by(|a, b| {
        b.cost
            .total_cmp(&a.cost)
            .then_with(|| a.service.cmp(&b.service))
    });
    services.truncate(top);
    services
}

/// Show recent spend by service and save the ledger
pub async fn show_costs(args: CostsArgs, format: OutputFormat) -> Result<()> {
    if !args.snapshot_dir.is_dir() {
        bail!("Snapshot directory {} does not exist", args.snapshot_dir.display());
    }

    let now = Utc::now();
    let window = CostWindow::trailing(args.days_back, now.date_naive())?;
    let aggregator = CostAggregator::new(args.days_back)?;
    let gateway = SnapshotGateway::new(&args.snapshot_dir, &args.region);

    let collected = aggregator
        .collect(&gateway, now)
        .await
        .context("Failed to collect cost records")?;
    let records = collected.rows;

    // An empty ledger is reported, not written
    let saved = if records.is_empty() {
        None
    } else {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| args.output_dir.join(ledger_file_name(&window)));
        let written = write_file(&path, TableName::Costs.as_str(), &records)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Some(written)
    };

    let total_cost: f64 = records.iter().map(|r| r.cost).sum();
    let report = CostReport {
        start: window.start,
        end: window.end,
        total_cost,
        daily_average: total_cost / window.len_days() as f64,
        records: records.len(),
        top_services: top_services(&records, args.top),
        saved_to: saved.as_ref().map(|w| w.path.display().to_string()),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Cost Analysis".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Window:                 {} .. {}",
                report.start, report.end
            );
            println!("Line items:             {}", report.records);
            println!(
                "{} {}",
                "Total Cost:".bold(),
                format_currency(report.total_cost).green().bold()
            );
            println!(
                "Daily average:          {}",
                format_currency(report.daily_average)
            );
            println!();

            println!("{}", format!("Top {} Services", args.top).bold());
            println!("{}", "-".repeat(50));
            let rows: Vec<ServiceCostRow> = report
                .top_services
                .iter()
                .map(|s| ServiceCostRow {
                    service: s.service.clone(),
                    cost: format_currency(s.cost),
                    share: format!("{:.1}%", s.share),
                })
                .collect();
            print_table(&rows);
            println!();

            match &saved {
                Some(written) => print_success(&format!(
                    "Saved {} cost records to {}",
                    written.rows,
                    written.path.display()
                )),
                None => print_info("No costs found in the window; nothing saved"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(service: &str, cost: f64) -> CostRecord {
        CostRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            service: service.to_string(),
            usage_type: "Usage".to_string(),
            cost,
            usage_quantity: 1.0,
            normalized_usage: 0.0,
        }
    }

    #[test]
    fn test_top_services_sums_and_orders() {
        let records = vec![
            record("Amazon S3", 1.0),
            record("Amazon EC2", 5.0),
            record("Amazon EC2", 2.0),
            record("AWS Lambda", 2.0),
        ];

        let top = top_services(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].service, "Amazon EC2");
        assert_eq!(top[0].cost, 7.0);
        assert_eq!(top[1].service, "AWS Lambda");
        assert!((top[0].share - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_ledger_file_name_spans_window() {
        let window = CostWindow::trailing(30, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()).unwrap();
        assert_eq!(
            ledger_file_name(&window),
            "aws_costs_2024-05-16_to_2024-06-15.csv"
        );
    }

    #[test]
    fn test_top_services_empty_ledger() {
        assert!(top_services(&[], 5).is_empty());
        let zero = top_services(&[record("Tax", 0.0)], 5);
        assert_eq!(zero[0].share, 0.0);
    }
}
