//! CSV encoding of tables for download.
//!
//! Output is UTF-8, comma separated, with a header row and no index column.
//! An empty table encodes as the header line alone. Null cells are written as
//! [`NULL_TOKEN`] so that they stay distinct from empty strings.

use crate::error::{Error, Result};
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use regex::Regex;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the customer table download.
pub const CUSTOMER_EXPORT: &str = "customer_data.csv";
/// File name of the filtered sales download.
pub const SALES_EXPORT: &str = "filtered_sales_data.csv";
/// MIME type of every download.
pub const CSV_MIME: &str = "text/csv";
/// Cell text of a null value. A string cell holding exactly this text reads
/// back as null.
pub const NULL_TOKEN: &str = "\\N";

/// Encode `batch` as CSV.
///
/// The returned buffer holds the whole document and can be read from the
/// start by any consumer.
pub fn to_csv(batch: &RecordBatch) -> Result<Bytes> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_null(NULL_TOKEN.to_string())
            .build(&mut buffer);
        writer.write(batch)?;
    }
    Ok(Bytes::from(buffer))
}

/// Decode a CSV document produced by [`to_csv`] back into a table of `schema`.
pub fn from_csv(data: &[u8], schema: SchemaRef) -> Result<RecordBatch> {
    let null_regex = Regex::new(&format!("^{}$", regex::escape(NULL_TOKEN)))
        .map_err(|e| Error::Arrow(format!("Invalid null pattern: {e}")))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_null_regex(null_regex)
        .build(Cursor::new(data))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// A ready-to-download file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: &'static str,
    pub data: Bytes,
}

impl ExportFile {
    /// Encode `batch` as a CSV download named `file_name`.
    pub fn csv(file_name: impl Into<String>, batch: &RecordBatch) -> Result<Self> {
        Ok(Self {
            file_name: file_name.into(),
            mime: CSV_MIME,
            data: to_csv(batch)?,
        })
    }

    /// Write the file into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.data)?;
        info!(path = %path.display(), bytes = self.data.len(), "Wrote export");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_sales;
    use arrow::array::{Array, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_to_csv_layout() {
        let csv = to_csv(&sample_sales()).unwrap();
        let text = std::str::from_utf8(&csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "invoice_date,category,shopping_mall,Total Sales");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2024-01-01,Clothing,MallA,100"));
    }

    #[test]
    fn test_to_csv_empty_is_header_only() {
        let empty = sample_sales().slice(0, 0);
        let csv = to_csv(&empty).unwrap();
        assert_eq!(
            std::str::from_utf8(&csv).unwrap(),
            "invoice_date,category,shopping_mall,Total Sales\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let sales = sample_sales();
        let csv = to_csv(&sales).unwrap();
        assert_eq!(from_csv(&csv, sales.schema()).unwrap(), sales);

        let empty = sales.slice(0, 0);
        let decoded = from_csv(&to_csv(&empty).unwrap(), empty.schema()).unwrap();
        assert_eq!(decoded.num_rows(), 0);
        assert_eq!(decoded.schema(), empty.schema());
    }

    #[test]
    fn test_empty_string_and_null_stay_distinct() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("category", DataType::Utf8, true),
            Field::new("Total Sales", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![
                    Some(""),
                    None,
                    Some("a,\"b\"\nc"),
                    Some("Bücher"),
                ])),
                Arc::new(Float64Array::from(vec![Some(1.0), None, Some(2.5), Some(0.0)])),
            ],
        )
        .unwrap();

        let csv = to_csv(&batch).unwrap();
        let text = std::str::from_utf8(&csv).unwrap();
        assert!(text.starts_with("category,Total Sales\n,1.0\n\\N,\\N\n"));

        let decoded = from_csv(&csv, schema).unwrap();
        let categories = decoded
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(categories.is_valid(0));
        assert_eq!(categories.value(0), "");
        assert!(categories.is_null(1));
        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_export_file_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let file = ExportFile::csv(SALES_EXPORT, &sample_sales()).unwrap();
        assert_eq!(file.mime, "text/csv");

        let path = file.write_to(&dir.path().join("downloads")).unwrap();
        assert_eq!(path.file_name().unwrap(), SALES_EXPORT);
        assert_eq!(std::fs::read(&path).unwrap(), file.data.to_vec());
    }
}
