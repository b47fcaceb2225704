//! Group-by/sum aggregation for report sections.
//!
//! `aggregate` groups a table by one column and sums a measure per group,
//! optionally keeping only the `top_k` groups with the largest sums.

use crate::error::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray, UInt32Array};
use arrow::compute::{cast_with_options, sort_to_indices, take, CastOptions};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One report section: `SELECT group_by, SUM(measure) ... GROUP BY group_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    pub group_by: String,
    pub measure: String,
    pub top_k: Option<usize>,
}

impl AggregateRequest {
    pub fn sum(group_by: impl Into<String>, measure: impl Into<String>) -> Self {
        Self {
            group_by: group_by.into(),
            measure: measure.into(),
            top_k: None,
        }
    }

    /// Keep only the `k` groups with the largest sums.
    pub fn top(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }
}

/// Group `batch` by `request.group_by` and sum `request.measure`.
///
/// The result has two columns, the group column (input type preserved) and
/// the Float64 sum under the measure's name. Without `top_k` the rows are
/// ordered by group value ascending. With `top_k` they are ordered by sum
/// descending, groups with equal sums keep their order of first appearance,
/// and at most `top_k` rows are returned. Null measures count as nothing;
/// rows with a null group value belong to no group.
#[instrument(skip(batch), fields(rows = batch.num_rows()))]
pub fn aggregate(batch: &RecordBatch, request: &AggregateRequest) -> Result<RecordBatch> {
    let group_col = column(batch, &request.group_by)?;
    let measure = measure_values(column(batch, &request.measure)?, &request.measure)?;
    let measure = measure
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::Arrow("Failed to downcast measure to Float64Array".to_string()))?;

    let keys = arrow::compute::cast(group_col, &DataType::Utf8)?;
    let keys = keys
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Arrow("Failed to downcast group keys to StringArray".to_string()))?;

    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut first_rows: Vec<u32> = Vec::new();
    let mut sums: Vec<f64> = Vec::new();

    for row in 0..keys.len() {
        if keys.is_null(row) {
            continue;
        }
        let slot = *slots.entry(keys.value(row)).or_insert_with(|| {
            first_rows.push(row as u32);
            sums.push(0.0);
            sums.len() - 1
        });
        if !measure.is_null(row) {
            sums[slot] += measure.value(row);
        }
    }

    let groups = take(group_col.as_ref(), &UInt32Array::from(first_rows), None)?;
    let sums: ArrayRef = Arc::new(Float64Array::from(sums));

    let order = match request.top_k {
        Some(k) => top_k_order(&sums, k)?,
        None => sort_to_indices(groups.as_ref(), None, None)?,
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new(&request.group_by, group_col.data_type().clone(), true),
        Field::new(&request.measure, DataType::Float64, false),
    ]));
    let result = RecordBatch::try_new(
        schema,
        vec![
            take(groups.as_ref(), &order, None)?,
            take(sums.as_ref(), &order, None)?,
        ],
    )?;

    debug!(
        group_by = %request.group_by,
        groups = result.num_rows(),
        "Aggregated"
    );
    Ok(result)
}

/// Indices of the `k` largest sums, stable with respect to first appearance.
/// NaN sums rank above every number.
fn top_k_order(sums: &ArrayRef, k: usize) -> Result<UInt32Array> {
    let sums = sums
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::Arrow("Failed to downcast sums to Float64Array".to_string()))?;

    let mut order: Vec<u32> = (0..sums.len() as u32).collect();
    order.sort_by(|a, b| sums.value(*b as usize).total_cmp(&sums.value(*a as usize)));
    order.truncate(k);
    Ok(UInt32Array::from(order))
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::Schema(format!("Cannot aggregate unknown column '{name}'")))
}

fn measure_values(col: &ArrayRef, name: &str) -> Result<ArrayRef> {
    if col.data_type() == &DataType::Float64 {
        return Ok(Arc::clone(col));
    }
    if !col.data_type().is_numeric() && col.data_type() != &DataType::Null {
        return Err(Error::Schema(format!(
            "Measure column '{name}' is not numeric ({:?})",
            col.data_type()
        )));
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(col, &DataType::Float64, &options)?)
}
