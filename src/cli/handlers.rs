use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    cli::commands::{ExportCommand, ImportCommand, LoggingConfig, OutputFormat, ReportCommand},
    config::Settings,
    dashboard::{Dashboard, Report},
    metrics::format_currency,
    schema::{CUSTOMERS_TABLE, SALES_TABLE},
    storage::DuckDbSource,
};

/// Initialize the tracing subscriber.
///
/// Logs go to stderr, or to `settings.logging.file` when set. The returned
/// guard flushes the file writer and must be held until exit.
pub fn init_logging(logging: &LoggingConfig, settings: &Settings) -> Result<Option<WorkerGuard>> {
    let level = logging.get_effective_level_or(&settings.logging.level);
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse::<tracing::Level>()
                .unwrap_or(tracing::Level::INFO)
                .into(),
        )
        .parse_lossy(logging.log_filter.as_deref().unwrap_or(""));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match &settings.logging.file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            builder.with_writer(non_blocking).with_ansi(false).init();
            Ok(Some(guard))
        }
        None => {
            builder.with_writer(std::io::stderr).init();
            Ok(None)
        }
    }
}

fn open_dashboard(settings: &Settings) -> Dashboard<DuckDbSource> {
    Dashboard::new(
        DuckDbSource::from_settings(&settings.storage),
        settings.dashboard.clone(),
    )
}

pub fn handle_report(cmd: &ReportCommand, settings: &Settings) -> Result<()> {
    let dashboard = open_dashboard(settings);
    let report = dashboard
        .refresh(&cmd.selection.selections())
        .context("Failed to build the dashboard report")?;

    match cmd.format {
        OutputFormat::Json => {
            println!("{}", report.to_json().context("Failed to encode report")?);
        }
        OutputFormat::Text => print!("{}", render_text(&report)?),
    }
    Ok(())
}

pub fn handle_export(cmd: &ExportCommand, settings: &Settings) -> Result<()> {
    let dashboard = open_dashboard(settings);
    let report = dashboard
        .refresh(&cmd.selection.selections())
        .context("Failed to build the dashboard report")?;

    let dir = cmd.out_dir.as_deref().unwrap_or(settings.export.dir.as_path());
    if report.customer_export.is_none() {
        tracing::warn!("No customer rows match; skipping the customer download");
    }
    for file in report.exports() {
        let path = file
            .write_to(dir)
            .with_context(|| format!("Failed to write {}", file.file_name))?;
        println!("{}", path.display());
    }
    Ok(())
}

pub fn handle_import(cmd: &ImportCommand, settings: &Settings) -> Result<()> {
    if cmd.customers.is_none() && cmd.sales.is_none() {
        anyhow::bail!("Nothing to import: pass --customers and/or --sales");
    }

    let source = DuckDbSource::from_settings(&settings.storage).with_read_only(false);
    let imports: [(&str, &Option<PathBuf>); 2] =
        [(CUSTOMERS_TABLE, &cmd.customers), (SALES_TABLE, &cmd.sales)];

    for (table, path) in imports {
        let Some(path) = path else { continue };
        let rows = source
            .import_csv(table, path)
            .with_context(|| format!("Failed to import {} into {table}", path.display()))?;
        println!("{table}: {rows} rows");
    }
    Ok(())
}

fn render_text(report: &Report) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "Customer Data")?;
    writeln!(out, "{}", table(&report.customers)?)?;

    writeln!(out, "\nKey Performance Indicators")?;
    writeln!(out, "  Total Sales:        {}", format_currency(report.kpis.total_sales))?;
    writeln!(out, "  Total Transactions: {}", report.kpis.total_transactions)?;
    writeln!(out, "  Avg. Sale Value:    {}", format_currency(report.kpis.avg_sale))?;

    let sections = [
        ("Top Best-Selling Categories", &report.top_categories),
        ("Category Sales Breakdown", &report.sales_by_category),
        ("Sales by Shopping Mall", &report.sales_by_mall),
        ("Sales Over Time", &report.sales_trend),
        ("Filtered Sales Data", &report.filtered_sales),
    ];
    for (title, batch) in sections {
        writeln!(out, "\n{title}")?;
        writeln!(out, "{}", table(batch)?)?;
    }
    Ok(out)
}

fn table(batch: &RecordBatch) -> Result<String> {
    Ok(pretty_format_batches(std::slice::from_ref(batch))
        .context("Failed to format table")?
        .to_string())
}
