//! Salesdash: the data core of a sales reporting dashboard.
//!
//! Reads customer and sales relations from a local DuckDB file, memoizes the
//! reads, filters and aggregates the sales into report sections and encodes
//! tables as CSV downloads.

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod query;
pub mod schema;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use aggregation::{aggregate, AggregateRequest};
pub use config::Settings;
pub use dashboard::{Dashboard, Report, Selections};
pub use error::{Error, Result};
pub use export::{to_csv, ExportFile};
pub use filter::{FilterSpec, Selection};
pub use metrics::Kpis;
pub use storage::{DataSource, DuckDbSource, Query, QueryCache};
