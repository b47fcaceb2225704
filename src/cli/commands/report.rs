use super::config::LoggingConfig;
use crate::config::ConfigArgs;
use crate::dashboard::Selections;
use crate::filter::{Selection, ALL};
use clap::{Args, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Widget selections given on the command line
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Customer payment method, or "All"
    #[arg(long = "payment-method", value_name = "METHOD", default_value = ALL)]
    pub payment_method: String,

    /// Product category, or "All"
    #[arg(long, value_name = "CATEGORY", default_value = ALL)]
    pub category: String,

    /// Shopping mall to include (repeatable); every mall when omitted
    #[arg(long = "mall", value_name = "MALL")]
    pub malls: Vec<String>,

    /// Deselect every mall
    #[arg(long = "no-malls", conflicts_with = "malls")]
    pub no_malls: bool,
}

impl SelectionArgs {
    pub fn selections(&self) -> Selections {
        let malls = if self.no_malls {
            Some(BTreeSet::new())
        } else if self.malls.is_empty() {
            None
        } else {
            Some(self.malls.iter().cloned().collect())
        };

        Selections {
            payment_method: Selection::from_choice(&self.payment_method),
            category: Selection::from_choice(&self.category),
            malls,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Text,
    /// The whole report as one JSON document
    Json,
}

/// Render the dashboard report
#[derive(Debug, Args)]
pub struct ReportCommand {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

/// Write the CSV downloads of the report
#[derive(Debug, Args)]
pub struct ExportCommand {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output directory (defaults to `export.dir` from the configuration)
    #[arg(short = 'o', long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

/// Load the Customers and Sales relations from CSV files
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// CSV file for the Customers relation
    #[arg(long, value_name = "FILE")]
    pub customers: Option<PathBuf>,

    /// CSV file for the Sales relation
    #[arg(long, value_name = "FILE")]
    pub sales: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingConfig,
}
