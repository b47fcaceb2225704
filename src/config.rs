//! Configuration management for salesdash.
//!
//! This module provides configuration handling through multiple sources:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/salesdash/config.toml`)
//! 3. User-specified configuration file
//! 4. Environment variables (prefixed with `SALESDASH_`, sections separated by `__`)
//! 5. Command-line arguments
//!
//! Configuration options are loaded in order of precedence, with later sources
//! overriding earlier ones.
//!
//! # Environment Variables
//!
//! - `SALESDASH_STORAGE__DATABASE` - Path of the DuckDB database file
//! - `SALESDASH_DASHBOARD__DATE_FORMAT` - `invoice_date` format (chrono syntax)
//! - `SALESDASH_EXPORT__DIR` - Directory the CSV downloads are written to

use clap::Args;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::error::Result;
use crate::schema::DEFAULT_DATE_FORMAT;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Command-line arguments shared by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// DuckDB database file to read from
    #[arg(long, value_name = "FILE", env = "SALESDASH_DATABASE")]
    pub database: Option<PathBuf>,
}

/// Complete dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Storage configuration
    pub storage: StorageSettings,
    /// Report configuration
    #[serde(default)]
    pub dashboard: DashboardSettings,
    /// Download configuration
    #[serde(default)]
    pub export: ExportSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Database file
    pub database: PathBuf,
    /// Open connections read-only
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// chrono format of `Sales.invoice_date`
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Number of categories in the best-sellers ranking
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
    /// Payment methods offered by the customer filter
    #[serde(default = "default_payment_methods")]
    pub payment_methods: Vec<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            top_categories: default_top_categories(),
            payment_methods: default_payment_methods(),
        }
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Output directory for CSV downloads
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

/// Logging settings from the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; logs go to stderr when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::with_name("/etc/salesdash/config.toml").required(false));

        if let Some(path) = &args.config {
            builder = builder.add_source(File::from(path.as_path()));
        }

        builder = builder.add_source(Environment::with_prefix("SALESDASH").separator("__"));

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(database) = &args.database {
            settings.storage.database = database.clone();
        }

        Ok(settings)
    }
}

fn default_read_only() -> bool {
    true
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_top_categories() -> usize {
    5
}

fn default_payment_methods() -> Vec<String> {
    vec![
        "Credit Card".to_string(),
        "Debit Card".to_string(),
        "Cash".to_string(),
    ]
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}
