//! Typed schemas of the two relations the dashboard reads.
//!
//! Query results come back from the store with whatever types the store
//! holds. They are validated once, right after loading, into the column types
//! the rest of the pipeline relies on:
//!
//! | relation    | column           | type    |
//! |-------------|------------------|---------|
//! | `Customers` | `payment_method` | Utf8    |
//! | `Sales`     | `invoice_date`   | Date32  |
//! | `Sales`     | `category`       | Utf8    |
//! | `Sales`     | `shopping_mall`  | Utf8    |
//! | `Sales`     | `Total Sales`    | Float64 |
//!
//! Columns not listed pass through untouched.

use crate::error::{Error, Result};
use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::compute::{cast, cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

pub const CUSTOMERS_TABLE: &str = "Customers";
pub const SALES_TABLE: &str = "Sales";

pub const PAYMENT_METHOD: &str = "payment_method";
pub const INVOICE_DATE: &str = "invoice_date";
pub const CATEGORY: &str = "category";
pub const SHOPPING_MALL: &str = "shopping_mall";
pub const TOTAL_SALES: &str = "Total Sales";

/// Default `invoice_date` format (day-month-year).
pub const DEFAULT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Validated schema of the required `Sales` columns.
pub fn sales_schema() -> Schema {
    Schema::new(vec![
        Field::new(INVOICE_DATE, DataType::Date32, true),
        Field::new(CATEGORY, DataType::Utf8, true),
        Field::new(SHOPPING_MALL, DataType::Utf8, true),
        Field::new(TOTAL_SALES, DataType::Float64, true),
    ])
}

/// Validated schema of the required `Customers` columns.
pub fn customers_schema() -> Schema {
    Schema::new(vec![Field::new(PAYMENT_METHOD, DataType::Utf8, true)])
}

/// Validate a raw `Customers` result.
pub fn validate_customers(batch: &RecordBatch) -> Result<RecordBatch> {
    conform(batch, &customers_schema(), |_, col| Ok(col))
}

/// Validate a raw `Sales` result, parsing `invoice_date` with `date_format`.
///
/// The first date that does not parse fails the whole load with
/// [`Error::DateParse`]; no row is skipped.
pub fn validate_sales(batch: &RecordBatch, date_format: &str) -> Result<RecordBatch> {
    let validated = conform(batch, &sales_schema(), |name, col| {
        if name == INVOICE_DATE {
            parse_dates(&col, date_format)
        } else {
            Ok(col)
        }
    })?;
    check_amounts(&validated)?;
    Ok(validated)
}

/// Sale amounts must be finite and non-negative. Null amounts are allowed.
fn check_amounts(batch: &RecordBatch) -> Result<()> {
    let totals = batch
        .column_by_name(TOTAL_SALES)
        .and_then(|col| col.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| Error::Schema(format!("Column '{TOTAL_SALES}' is not Float64")))?;

    for (row, value) in totals.iter().enumerate() {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Schema(format!(
                    "Invalid amount in '{TOTAL_SALES}' at row {row}: {value}"
                )));
            }
        }
    }
    Ok(())
}

/// Check that every field of `required` is present and cast it to the
/// required type. `convert` gets the first look at each required column.
fn conform<F>(batch: &RecordBatch, required: &Schema, convert: F) -> Result<RecordBatch>
where
    F: Fn(&str, ArrayRef) -> Result<ArrayRef>,
{
    let input = batch.schema();
    for field in required.fields() {
        if input.index_of(field.name()).is_err() {
            return Err(Error::Schema(format!(
                "Missing required column '{}' (found: {})",
                field.name(),
                input
                    .fields()
                    .iter()
                    .map(|f| f.name().as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }

    let mut fields = Vec::with_capacity(input.fields().len());
    let mut columns = Vec::with_capacity(input.fields().len());
    for (field, col) in input.fields().iter().zip(batch.columns()) {
        match required.field_with_name(field.name()) {
            Ok(target) => {
                let col = convert(field.name(), Arc::clone(col))?;
                let col = cast_strict(&col, target.data_type()).map_err(|e| {
                    Error::Schema(format!(
                        "Column '{}' cannot be read as {:?}: {}",
                        field.name(),
                        target.data_type(),
                        e
                    ))
                })?;
                fields.push(Field::new(field.name(), target.data_type().clone(), true));
                columns.push(col);
            }
            Err(_) => {
                fields.push(field.as_ref().clone());
                columns.push(Arc::clone(col));
            }
        }
    }

    debug!(rows = batch.num_rows(), columns = columns.len(), "Validated schema");
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn cast_strict(col: &ArrayRef, to: &DataType) -> Result<ArrayRef> {
    if col.data_type() == to {
        return Ok(Arc::clone(col));
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(col, to, &options)?)
}

/// Parse a text column of dates into Date32. Columns that already hold dates
/// are returned as they are.
fn parse_dates(col: &ArrayRef, format: &str) -> Result<ArrayRef> {
    let text = match col.data_type() {
        DataType::Date32 => return Ok(Arc::clone(col)),
        DataType::Utf8 => Arc::clone(col),
        DataType::LargeUtf8 | DataType::Utf8View | DataType::Null => cast(col, &DataType::Utf8)?,
        // DATE/TIMESTAMP columns from the store; the cast below turns them into days.
        _ => return Ok(Arc::clone(col)),
    };
    let text = text
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Arrow("Failed to downcast invoice_date to StringArray".to_string()))?;

    let mut days = Vec::with_capacity(text.len());
    for row in 0..text.len() {
        if text.is_null(row) {
            days.push(None);
            continue;
        }
        let value = text.value(row);
        let date = NaiveDate::parse_from_str(value, format).map_err(|_| Error::DateParse {
            row,
            value: value.to_string(),
            format: format.to_string(),
        })?;
        days.push(Some(Date32Type::from_naive_date(date)));
    }

    Ok(Arc::new(Date32Array::from(days)))
}
