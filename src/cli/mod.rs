//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Rendering the dashboard report
//! - Writing the CSV downloads
//! - Seeding the database from CSV files

pub mod commands;
pub mod handlers;

pub use handlers::{handle_export, handle_import, handle_report, init_logging};
