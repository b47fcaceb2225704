//! Row filtering over in-memory tables.
//!
//! A [`FilterSpec`] maps column names to a [`Selection`] of accepted values.
//! Predicates are AND-ed, so the order they are added in does not matter.
//! Values are compared on their text rendering, which lets the same spec
//! address string, numeric and date columns (dates render as `YYYY-MM-DD`).

use crate::error::{Error, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, StringArray};
use arrow::compute::{and, cast, filter_record_batch};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Widget sentinel meaning "every value is accepted".
pub const ALL: &str = "All";

/// Accepted values for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// No restriction; the predicate is skipped entirely
    #[default]
    All,
    /// Exactly this value
    One(String),
    /// Any value in the set; an empty set accepts nothing
    AnyOf(BTreeSet<String>),
}

impl Selection {
    /// Interpret a single-select widget value, where [`ALL`] accepts everything.
    pub fn from_choice(choice: &str) -> Self {
        if choice == ALL {
            Selection::All
        } else {
            Selection::One(choice.to_string())
        }
    }

    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::AnyOf(values.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::One(accepted) => accepted == value,
            Selection::AnyOf(accepted) => accepted.contains(value),
        }
    }
}

/// Column name to accepted values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    predicates: BTreeMap<String, Selection>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the selection for `column`.
    pub fn with(mut self, column: impl Into<String>, selection: Selection) -> Self {
        self.insert(column, selection);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, selection: Selection) {
        self.predicates.insert(column.into(), selection);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.predicates.iter().map(|(c, s)| (c.as_str(), s))
    }
}

/// Keep the rows of `batch` accepted by every predicate in `spec`.
///
/// With no effective predicate the input is returned as is. The input batch is
/// never modified.
pub fn apply(batch: &RecordBatch, spec: &FilterSpec) -> Result<RecordBatch> {
    let mut mask: Option<BooleanArray> = None;

    for (column, selection) in spec.iter() {
        if selection.is_all() {
            continue;
        }
        let col = batch
            .column_by_name(column)
            .ok_or_else(|| Error::Schema(format!("Cannot filter on unknown column '{column}'")))?;
        let predicate = selection_mask(col, selection)?;
        mask = Some(match mask {
            Some(current) => and(&current, &predicate)?,
            None => predicate,
        });
    }

    match mask {
        None => Ok(batch.clone()),
        Some(mask) => {
            let filtered = filter_record_batch(batch, &mask)?;
            debug!(
                input_rows = batch.num_rows(),
                output_rows = filtered.num_rows(),
                "Applied filter"
            );
            Ok(filtered)
        }
    }
}

/// Distinct non-null values of `column`, in order of first appearance.
pub fn distinct_values(batch: &RecordBatch, column: &str) -> Result<Vec<String>> {
    let col = batch
        .column_by_name(column)
        .ok_or_else(|| Error::Schema(format!("Unknown column '{column}'")))?;
    let text = as_text(col)?;
    let text = downcast_text(&text)?;

    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for value in text.iter().flatten() {
        if seen.insert(value) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

fn selection_mask(col: &ArrayRef, selection: &Selection) -> Result<BooleanArray> {
    let text = as_text(col)?;
    let text = downcast_text(&text)?;
    Ok(text
        .iter()
        .map(|value| Some(value.is_some_and(|v| selection.accepts(v))))
        .collect())
}

fn as_text(col: &ArrayRef) -> Result<ArrayRef> {
    if col.data_type() == &DataType::Utf8 {
        Ok(Arc::clone(col))
    } else {
        Ok(cast(col, &DataType::Utf8)?)
    }
}

fn downcast_text(col: &ArrayRef) -> Result<&StringArray> {
    col.as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Arrow("Failed to downcast to StringArray".to_string()))
}
