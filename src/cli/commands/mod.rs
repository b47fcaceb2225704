pub mod config;
pub mod report;

pub use config::LoggingConfig;
pub use report::{ExportCommand, ImportCommand, OutputFormat, ReportCommand, SelectionArgs};

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the dashboard report for the given selections
    Report(ReportCommand),
    /// Write the customer and filtered sales CSV downloads
    Export(ExportCommand),
    /// Seed the database from CSV files
    Import(ImportCommand),
}

impl Commands {
    pub fn logging(&self) -> &LoggingConfig {
        match self {
            Commands::Report(cmd) => &cmd.logging,
            Commands::Export(cmd) => &cmd.logging,
            Commands::Import(cmd) => &cmd.logging,
        }
    }

    pub fn config(&self) -> &crate::config::ConfigArgs {
        match self {
            Commands::Report(cmd) => &cmd.config,
            Commands::Export(cmd) => &cmd.config,
            Commands::Import(cmd) => &cmd.config,
        }
    }
}
