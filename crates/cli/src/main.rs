//! Cloud Cost Telemetry CLI
//!
//! A command-line tool for collecting cost, inventory and utilization
//! tables from captured provider responses, checking recent spend, and
//! generating synthetic training data.

mod commands;
mod config;
mod output;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use commands::{collect, costs, synth};
use std::path::PathBuf;
use telemetry_lib::collector::{QUICK_CHECK_DAYS, TRAINING_PULL_DAYS};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cloud Cost Telemetry CLI
#[derive(Parser)]
#[command(name = "cloudcost")]
#[command(author, version, about = "CLI for Cloud Cost Telemetry", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines (can also be set via CLOUDCOST_LOG_JSON)
    #[arg(long, env = "CLOUDCOST_LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect every table from a snapshot directory and write them as CSV
    Collect {
        /// Directory of captured provider responses
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Days of cost history to pull
        #[arg(long, default_value_t = TRAINING_PULL_DAYS)]
        days_back: u32,

        /// Directory the tables are written to
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Write Prometheus metrics in text format to this file
        #[arg(long)]
        metrics_file: Option<PathBuf>,

        /// Region label for the snapshot
        #[arg(long)]
        region: Option<String>,
    },

    /// Show recent spend by service
    Costs {
        /// Directory of captured provider responses
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Days of cost history to inspect
        #[arg(long, default_value_t = QUICK_CHECK_DAYS)]
        days_back: u32,

        /// Number of services to list
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Region label for the snapshot
        #[arg(long)]
        region: Option<String>,

        /// Ledger CSV path (default: aws_costs_<start>_to_<end>.csv in the output directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Generate a synthetic cost and utilization dataset
    Synth {
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Days of data per resource
        #[arg(long, default_value_t = 365)]
        num_days: u32,

        /// Number of synthetic resources
        #[arg(long, default_value_t = 100)]
        num_resources: u32,

        /// Day after the last generated day (YYYY-MM-DD, default: today)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Output file path
        #[arg(long, short, default_value = "synthetic_cloud_data.csv")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = config::Config::load()?;
    debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Collect {
            snapshot_dir,
            days_back,
            output_dir,
            metrics_file,
            region,
        } => {
            let args = collect::CollectArgs {
                snapshot_dir: config.snapshot_dir(snapshot_dir)?,
                output_dir: config.output_dir(output_dir),
                region: config.region(region),
                days_back,
                metrics_file,
            };
            collect::run_collect(args, cli.format).await?;
        }
        Commands::Costs {
            snapshot_dir,
            days_back,
            top,
            region,
            output,
        } => {
            let args = costs::CostsArgs {
                snapshot_dir: config.snapshot_dir(snapshot_dir)?,
                region: config.region(region),
                output_dir: config.output_dir(None),
                days_back,
                top,
                output,
            };
            costs::show_costs(args, cli.format).await?;
        }
        Commands::Synth {
            seed,
            num_days,
            num_resources,
            end_date,
            output,
        } => {
            let args = synth::SynthArgs {
                seed,
                num_days,
                num_resources,
                end_date,
                output,
            };
            synth::run_synth(args, cli.format)?;
        }
    }

    Ok(())
}
