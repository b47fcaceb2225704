//! Summary metrics shown above the report sections.

use crate::error::{Error, Result};
use arrow::array::{Array, Float64Array};
use arrow::compute::{cast, sum};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

/// Key performance indicators of a sales table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Sum of the measure over every row
    pub total_sales: f64,
    /// Number of rows
    pub total_transactions: usize,
    /// `total_sales / total_transactions`, or 0 when there are no rows
    pub avg_sale: f64,
}

/// Compute the KPIs of `batch` over the `measure` column.
pub fn summarize(batch: &RecordBatch, measure: &str) -> Result<Kpis> {
    let col = batch
        .column_by_name(measure)
        .ok_or_else(|| Error::Schema(format!("Unknown measure column '{measure}'")))?;
    let values = cast(col, &DataType::Float64)?;
    let values = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::Arrow("Failed to downcast measure to Float64Array".to_string()))?;

    let total_sales = sum(values).unwrap_or(0.0);
    let total_transactions = batch.num_rows();

    Ok(Kpis {
        total_sales,
        total_transactions,
        avg_sale: average(total_sales, total_transactions),
    })
}

/// `total / count`, with an empty denominator defined as 0.
pub fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Render an amount as `$1,234.56`.
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = format!("{:.2}", amount.abs());
    let (whole, fraction) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TOTAL_SALES;
    use crate::test_utils::sample_sales;

    #[test]
    fn test_summarize() {
        let kpis = summarize(&sample_sales(), TOTAL_SALES).unwrap();
        assert_eq!(kpis.total_sales, 400.0);
        assert_eq!(kpis.total_transactions, 3);
        assert!((kpis.avg_sale - 400.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty_average_is_zero() {
        let empty = sample_sales().slice(0, 0);
        let kpis = summarize(&empty, TOTAL_SALES).unwrap();
        assert_eq!(
            kpis,
            Kpis {
                total_sales: 0.0,
                total_transactions: 0,
                avg_sale: 0.0
            }
        );
        assert!(!kpis.avg_sale.is_nan());
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(-42.5), "-$42.50");
    }
}
