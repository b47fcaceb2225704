//! Salesdash binary.
//!
//! This binary provides the command-line entry point for the sales dashboard:
//! rendering the report, writing the CSV downloads and seeding the database.

use anyhow::Context;
use clap::Parser;
use salesdash_core::{
    cli::commands::Commands,
    cli::handlers::{handle_export, handle_import, handle_report, init_logging},
    config::Settings,
};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.command.config()).context("Failed to load configuration")?;

    // Held until exit so buffered file logs are flushed
    let _guard = init_logging(cli.command.logging(), &settings)?;

    info!(database = %settings.storage.database.display(), "Salesdash starting up");

    match &cli.command {
        Commands::Report(cmd) => handle_report(cmd, &settings)?,
        Commands::Export(cmd) => handle_export(cmd, &settings)?,
        Commands::Import(cmd) => handle_import(cmd, &settings)?,
    }

    Ok(())
}
