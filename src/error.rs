//! Error types for the salesdash pipeline.
//!
//! Every stage of a dashboard refresh returns [`Result`]. None of these errors
//! are recovered locally: they propagate to the caller and abort the refresh.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// A specialized Result type for salesdash operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for salesdash operations.
#[derive(Debug)]
pub enum Error {
    /// The store could not be opened or the query failed to execute
    DataAccess(String),
    /// A sales row carried an `invoice_date` that does not match the expected format
    DateParse {
        row: usize,
        value: String,
        format: String,
    },
    /// A required column is missing or has an unusable type
    Schema(String),
    /// Arrow compute or encoding errors
    Arrow(String),
    /// Configuration errors
    Config(String),
    /// I/O errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serialization(String),
}

impl Error {
    /// Whether this error comes from the data source rather than the data itself.
    pub fn is_data_access(&self) -> bool {
        matches!(self, Error::DataAccess(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DataAccess(msg) => write!(f, "Data access error: {}", msg),
            Error::DateParse { row, value, format } => write!(
                f,
                "Date parse error: row {} has invoice_date '{}' which does not match '{}'",
                row, value, format
            ),
            Error::Schema(msg) => write!(f, "Schema error: {}", msg),
            Error::Arrow(msg) => write!(f, "Arrow error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Arrow(err.to_string())
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::DataAccess(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parse_display() {
        let err = Error::DateParse {
            row: 3,
            value: "2024/13/01".to_string(),
            format: "%d-%m-%Y".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("row 3"));
        assert!(msg.contains("2024/13/01"));
        assert!(msg.contains("%d-%m-%Y"));
    }

    #[test]
    fn test_io_source() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(!err.is_data_access());
    }
}
