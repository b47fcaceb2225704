use crate::error::{Error, Result};
use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value as JsonValue};

/// Convert an Arrow RecordBatch to a JSON array of objects
///
/// Dates are rendered as `YYYY-MM-DD`, nulls and non-finite floats as `null`.
/// Other column types fall back to their Arrow string rendering.
pub fn record_batch_to_json(batch: &RecordBatch) -> Result<Vec<JsonValue>> {
    let schema = batch.schema();
    let columns = batch
        .columns()
        .iter()
        .map(json_column)
        .collect::<Result<Vec<_>>>()?;

    let mut json_rows = Vec::with_capacity(batch.num_rows());
    for row_idx in 0..batch.num_rows() {
        let mut row = Map::new();
        for (field, col) in schema.fields().iter().zip(&columns) {
            row.insert(field.name().to_string(), col.value(row_idx));
        }
        json_rows.push(JsonValue::Object(row));
    }
    Ok(json_rows)
}

enum JsonColumn {
    Int(Int64Array),
    Float(Float64Array),
    Date(Date32Array),
    Text(StringArray),
}

fn json_column(col: &ArrayRef) -> Result<JsonColumn> {
    let column = match col.data_type() {
        DataType::Int64 => JsonColumn::Int(downcast::<Int64Array>(col)?.clone()),
        DataType::Float64 => JsonColumn::Float(downcast::<Float64Array>(col)?.clone()),
        DataType::Date32 => JsonColumn::Date(downcast::<Date32Array>(col)?.clone()),
        DataType::Utf8 => JsonColumn::Text(downcast::<StringArray>(col)?.clone()),
        _ => JsonColumn::Text(downcast::<StringArray>(&cast(col, &DataType::Utf8)?)?.clone()),
    };
    Ok(column)
}

fn downcast<T: 'static>(col: &ArrayRef) -> Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Arrow(format!("Unexpected array for {:?}", col.data_type())))
}

impl JsonColumn {
    fn value(&self, row: usize) -> JsonValue {
        match self {
            JsonColumn::Int(array) if array.is_valid(row) => array.value(row).into(),
            JsonColumn::Float(array) if array.is_valid(row) => {
                serde_json::Number::from_f64(array.value(row))
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
            JsonColumn::Date(array) if array.is_valid(row) => array
                .value_as_date(row)
                .map(|date| JsonValue::String(date.format("%Y-%m-%d").to_string()))
                .unwrap_or(JsonValue::Null),
            JsonColumn::Text(array) if array.is_valid(row) => {
                JsonValue::String(array.value(row).to_string())
            }
            _ => JsonValue::Null,
        }
    }
}
