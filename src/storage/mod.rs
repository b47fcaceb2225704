//! Storage access for the dashboard.
//!
//! This module provides:
//! - `duckdb`: the data source adapter reading from a local DuckDB file
//! - `cached`: a memoizing decorator keyed by query text and bound parameters
//!
//! Both implement the `DataSource` trait, so the pipeline does not care whether
//! a read is served from the store or from the cache.

pub mod cached;
pub mod duckdb;

pub use self::cached::{CacheKey, CacheStats, QueryCache};
pub use self::duckdb::DuckDbSource;

use crate::error::{Error, Result};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use std::fmt;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    Float(f64),
    Int(i64),
}

impl fmt::Display for QueryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParam::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            QueryParam::Float(v) => write!(f, "{:?}", v),
            QueryParam::Int(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for QueryParam {
    fn from(s: &str) -> Self {
        QueryParam::Text(s.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(s: String) -> Self {
        QueryParam::Text(s)
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        QueryParam::Float(v)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        QueryParam::Int(v)
    }
}

/// A read query: SQL text with `?` placeholders plus the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind the next placeholder.
    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// Source of tabular results for read queries.
///
/// Implementations materialize the full result before returning and hold no
/// connection between calls.
pub trait DataSource: Send + Sync {
    /// Execute `query` and return every row as a single batch.
    fn fetch(&self, query: &Query) -> Result<RecordBatch>;
}

impl<T: DataSource + ?Sized> DataSource for std::sync::Arc<T> {
    fn fetch(&self, query: &Query) -> Result<RecordBatch> {
        (**self).fetch(query)
    }
}

/// Quote an identifier for SQL (`Total Sales` -> `"Total Sales"`).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Utility functions for SQL operations
pub struct StorageUtils;

impl StorageUtils {
    /// Generate SQL for creating a table with the given schema
    pub fn generate_create_table_sql(table_name: &str, schema: &Schema) -> Result<String> {
        let mut columns = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let sql_type = match field.data_type() {
                DataType::Int64 => "BIGINT",
                DataType::Float64 => "DOUBLE",
                DataType::Utf8 => "VARCHAR",
                DataType::Boolean => "BOOLEAN",
                DataType::Date32 => "DATE",
                other => {
                    return Err(Error::Schema(format!(
                        "Unsupported data type for column {}: {:?}",
                        field.name(),
                        other
                    )))
                }
            };
            columns.push(format!("{} {}", quote_ident(field.name()), sql_type));
        }

        Ok(format!(
            "CREATE OR REPLACE TABLE {} ({})",
            quote_ident(table_name),
            columns.join(", ")
        ))
    }

    /// Generate SQL for inserting data into a table
    pub fn generate_insert_sql(table_name: &str, column_count: usize) -> String {
        let placeholders = vec!["?"; column_count].join(", ");
        format!("INSERT INTO {} VALUES ({})", quote_ident(table_name), placeholders)
    }

    /// Generate SQL for selecting data from a table
    pub fn generate_select_sql(table_name: &str, projection: Option<&[&str]>) -> String {
        let columns = projection
            .map(|cols| cols.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "))
            .unwrap_or_else(|| "*".to_string());
        format!("SELECT {} FROM {}", columns, quote_ident(table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::Field;

    #[test]
    fn test_create_table_sql_quotes_identifiers() {
        let schema = Schema::new(vec![
            Field::new("category", DataType::Utf8, true),
            Field::new("Total Sales", DataType::Float64, true),
        ]);
        let sql = StorageUtils::generate_create_table_sql("Sales", &schema).unwrap();
        assert_eq!(
            sql,
            "CREATE OR REPLACE TABLE \"Sales\" (\"category\" VARCHAR, \"Total Sales\" DOUBLE)"
        );
    }

    #[test]
    fn test_create_table_sql_rejects_unsupported() {
        let schema = Schema::new(vec![Field::new("blob", DataType::Binary, true)]);
        assert!(StorageUtils::generate_create_table_sql("t", &schema).is_err());
    }

    #[test]
    fn test_insert_and_select_sql() {
        assert_eq!(
            StorageUtils::generate_insert_sql("Sales", 3),
            "INSERT INTO \"Sales\" VALUES (?, ?, ?)"
        );
        assert_eq!(
            StorageUtils::generate_select_sql("Sales", None),
            "SELECT * FROM \"Sales\""
        );
        assert_eq!(
            StorageUtils::generate_select_sql("Sales", Some(&["category", "Total Sales"])),
            "SELECT \"category\", \"Total Sales\" FROM \"Sales\""
        );
    }

    #[test]
    fn test_query_display() {
        let query = Query::new("SELECT * FROM Customers WHERE payment_method LIKE ?")
            .bind("%O'Hara%");
        assert_eq!(query.params.len(), 1);
        assert_eq!(
            query.to_string(),
            "SELECT * FROM Customers WHERE payment_method LIKE ? ['%O''Hara%']"
        );
    }
}
