//! Configuration management for the CLI
//!
//! Defaults come from an optional `~/.config/cloudcost/config.toml`,
//! overridden by `CLOUDCOST_*` environment variables, overridden by flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Region reported when neither config nor flags name one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Output directory used when neither config nor flags name one
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// CLI configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Directory of captured provider responses
    pub snapshot_dir: Option<PathBuf>,
    /// Directory bundle tables are written to
    pub output_dir: Option<PathBuf>,
    /// Region label for the gateway
    pub region: Option<String>,
}

impl Config {
    /// Load configuration from the default file and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path().as_deref())
    }

    /// Load configuration from `file` (if it exists) and the environment
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("CLOUDCOST"))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Snapshot directory, preferring the flag value
    pub fn snapshot_dir(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        flag.or_else(|| self.snapshot_dir.clone()).context(
            "No snapshot directory given; pass --snapshot-dir or set CLOUDCOST_SNAPSHOT_DIR",
        )
    }

    pub fn output_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn region(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("cloudcost").join("config.toml"))
    }
}
