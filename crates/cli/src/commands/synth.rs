//! Synthetic dataset generation

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;
use telemetry_lib::{
    write_synthetic, CollectionLogger, CollectorMetrics, SyntheticDataGenerator, SyntheticRecord,
    SyntheticSummary,
};

use crate::output::{format_currency, print_json, print_success, print_table, OutputFormat};

/// Rows shown as a preview of the generated table
const SAMPLE_ROWS: usize = 5;

pub struct SynthArgs {
    pub seed: u64,
    pub num_days: u32,
    pub num_resources: u32,
    pub end_date: Option<NaiveDate>,
    pub output: PathBuf,
}

#[derive(Serialize)]
struct SynthOutput<'a> {
    seed: u64,
    path: String,
    #[serde(flatten)]
    summary: &'a SyntheticSummary,
}

/// Row for the sample preview table
#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Resource")]
    resource_id: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Usage")]
    usage: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Environment")]
    environment: String,
}

impl From<&SyntheticRecord> for SampleRow {
    fn from(record: &SyntheticRecord) -> Self {
        Self {
            date: record.date.to_string(),
            resource_id: record.resource_id.clone(),
            cost: format_currency(record.cost),
            usage: format!("{:.1}%", record.usage_percent),
            region: record.region.clone(),
            environment: record.environment.clone(),
        }
    }
}

/// Generate the dataset, write it and print a summary
pub fn run_synth(args: SynthArgs, format: OutputFormat) -> Result<()> {
    let mut generator = SyntheticDataGenerator::new(args.seed);
    if let Some(end_date) = args.end_date {
        generator = generator.with_end_date(end_date);
    }

    let records = generator
        .generate_synthetic_training_data(args.num_days, args.num_resources)
        .context("Invalid generator parameters")?;
    let summary = SyntheticSummary::from_records(&records);

    CollectorMetrics::new().add_synthetic_records(records.len());
    CollectionLogger::new("synthetic").log_synthetic_summary(&summary);

    let written = write_synthetic(&args.output, &records)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    match format {
        OutputFormat::Json => print_json(&SynthOutput {
            seed: args.seed,
            path: written.path.display().to_string(),
            summary: &summary,
        })?,
        OutputFormat::Table => {
            print_success(&format!("Generated {} synthetic records", summary.records));
            println!("  • {} unique resources", summary.resources);
            println!("  • {} days of data", summary.days);
            println!(
                "  • Total synthetic cost: {}",
                format_currency(summary.total_cost)
            );
            println!("  • Idle: {}", summary.idle);
            println!("  • Underutilized: {}", summary.underutilized);
            println!("  • Optimized: {}", summary.optimized);
            println!("  • Overutilized: {}", summary.overutilized);
            println!("  • Unique regions: {}", summary.regions);
            println!("  • Unique environments: {}", summary.environments);
            print_success(&format!("Saved synthetic data to {}", written.path.display()));
            println!();

            println!("{}", "Sample".bold());
            let sample: Vec<SampleRow> = records.iter().take(SAMPLE_ROWS).map(SampleRow::from).collect();
            print_table(&sample);
        }
    }

    Ok(())
}
