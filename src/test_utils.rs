//! Shared fixtures for unit tests.

use crate::schema::sales_schema;
use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::Date32Type;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::sync::Arc;

/// Validated sales rows built from `(date, category, mall, total)` tuples.
pub fn sales_batch(rows: &[(&str, &str, &str, f64)]) -> RecordBatch {
    let dates: Vec<i32> = rows
        .iter()
        .map(|(d, ..)| {
            Date32Type::from_naive_date(NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap())
        })
        .collect();
    RecordBatch::try_new(
        Arc::new(sales_schema()),
        vec![
            Arc::new(Date32Array::from(dates)),
            Arc::new(StringArray::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())),
            Arc::new(StringArray::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.3).collect::<Vec<_>>())),
        ],
    )
    .unwrap()
}

/// The three-row sales table used throughout the tests.
pub fn sample_sales() -> RecordBatch {
    sales_batch(&[
        ("2024-01-01", "Clothing", "MallA", 100.0),
        ("2024-01-02", "Electronics", "MallB", 250.0),
        ("2024-01-03", "Clothing", "MallA", 50.0),
    ])
}
