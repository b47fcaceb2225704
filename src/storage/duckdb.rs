use crate::config::StorageSettings;
use crate::error::{Error, Result};
use crate::storage::{DataSource, Query, QueryParam, StorageUtils};
use arrow::array::{Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::compute::{cast, concat_batches};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use duckdb::types::Value;
use duckdb::{params_from_iter, AccessMode, Config, Connection};
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Rows sampled when inferring the schema of an imported CSV file.
const INFER_SCHEMA_ROWS: usize = 1000;

/// DuckDB-backed data source.
///
/// Every call opens its own connection and drops it before returning; no
/// connection is shared between calls.
#[derive(Debug, Clone)]
pub struct DuckDbSource {
    path: PathBuf,
    read_only: bool,
}

impl DuckDbSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: true,
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(&settings.database).with_read_only(settings.read_only)
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self, read_only: bool) -> Result<Connection> {
        let config = if read_only {
            Config::default().access_mode(AccessMode::ReadOnly)?
        } else {
            Config::default()
        };
        Connection::open_with_flags(&self.path, config).map_err(|e| {
            Error::DataAccess(format!(
                "Failed to open database {}: {e}",
                self.path.display()
            ))
        })
    }

    /// List the relations in the database, sorted by name.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.connect(self.read_only)?;
        let mut stmt = conn
            .prepare("SELECT table_name FROM information_schema.tables ORDER BY table_name")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tables = Vec::new();
        for row in rows {
            tables.push(row?);
        }
        Ok(tables)
    }

    /// Create (or replace) `table_name` from a CSV file with a header row.
    ///
    /// Column types are inferred from the file; anything DuckDB cannot take
    /// directly is stored as VARCHAR. Returns the number of rows inserted.
    #[instrument(skip(self), fields(db = %self.path.display()))]
    pub fn import_csv(&self, table_name: &str, csv_path: &Path) -> Result<usize> {
        let mut file = std::fs::File::open(csv_path)?;
        let (inferred, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut file, Some(INFER_SCHEMA_ROWS))?;
        file.rewind()?;

        let reader = ReaderBuilder::new(Arc::new(inferred))
            .with_header(true)
            .build(file)?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(normalize_for_insert(&batch?)?);
        }

        let schema = match batches.first() {
            Some(batch) => batch.schema(),
            None => {
                // Header-only file: nothing was read, so take the column names from the header.
                let mut file = std::fs::File::open(csv_path)?;
                let (schema, _) = Format::default().with_header(true).infer_schema(&mut file, Some(1))?;
                normalize_schema(&schema)
            }
        };

        let mut conn = self.connect(false)?;
        let tx = conn.transaction()?;
        tx.execute_batch(&StorageUtils::generate_create_table_sql(table_name, &schema)?)?;

        let mut inserted = 0;
        {
            let sql = StorageUtils::generate_insert_sql(table_name, schema.fields().len());
            let mut stmt = tx.prepare(&sql)?;
            for batch in &batches {
                for row_idx in 0..batch.num_rows() {
                    let values = row_values(batch, row_idx)?;
                    stmt.execute(params_from_iter(values))?;
                    inserted += 1;
                }
            }
        }
        tx.commit()?;

        info!(table = table_name, rows = inserted, "Imported CSV file");
        Ok(inserted)
    }
}

impl DataSource for DuckDbSource {
    #[instrument(skip(self, query), fields(sql = %query.sql))]
    fn fetch(&self, query: &Query) -> Result<RecordBatch> {
        let batch = {
            let conn = self.connect(self.read_only)?;
            let mut stmt = conn
                .prepare(&query.sql)
                .map_err(|e| Error::DataAccess(format!("Invalid query: {e}")))?;

            let params: Vec<Value> = query.params.iter().map(to_value).collect();
            let arrow = stmt
                .query_arrow(params_from_iter(params))
                .map_err(|e| Error::DataAccess(format!("Failed to execute query: {e}")))?;

            let schema = arrow.get_schema();
            let batches: Vec<RecordBatch> = arrow.collect();
            concat_batches(&schema, &batches)?
        };

        debug!(rows = batch.num_rows(), columns = batch.num_columns(), "Fetched result");
        Ok(batch)
    }
}

fn to_value(param: &QueryParam) -> Value {
    match param {
        QueryParam::Text(s) => Value::Text(s.clone()),
        QueryParam::Float(v) => Value::Double(*v),
        QueryParam::Int(v) => Value::BigInt(*v),
    }
}

fn is_insertable(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int64 | DataType::Float64 | DataType::Utf8 | DataType::Boolean | DataType::Date32
    )
}

fn normalize_schema(schema: &Schema) -> Arc<Schema> {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            if is_insertable(f.data_type()) {
                f.as_ref().clone()
            } else {
                Field::new(f.name(), DataType::Utf8, true)
            }
        })
        .collect();
    Arc::new(Schema::new(fields))
}

/// Cast every column DuckDB cannot bind directly to Utf8.
fn normalize_for_insert(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = normalize_schema(batch.schema().as_ref());
    let columns = batch
        .columns()
        .iter()
        .zip(schema.fields())
        .map(|(col, field)| {
            if col.data_type() == field.data_type() {
                Ok(Arc::clone(col))
            } else {
                cast(col, field.data_type())
            }
        })
        .collect::<std::result::Result<Vec<ArrayRef>, _>>()?;
    Ok(RecordBatch::try_new(schema, columns)?)
}

fn row_values(batch: &RecordBatch, row_idx: usize) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(batch.num_columns());
    for col in batch.columns() {
        if col.is_null(row_idx) {
            values.push(Value::Null);
            continue;
        }
        let value = match col.data_type() {
            DataType::Int64 => Value::BigInt(downcast::<Int64Array>(col)?.value(row_idx)),
            DataType::Float64 => Value::Double(downcast::<Float64Array>(col)?.value(row_idx)),
            DataType::Utf8 => Value::Text(downcast::<StringArray>(col)?.value(row_idx).to_owned()),
            DataType::Boolean => Value::Boolean(downcast::<BooleanArray>(col)?.value(row_idx)),
            DataType::Date32 => Value::Date32(downcast::<Date32Array>(col)?.value(row_idx)),
            other => {
                return Err(Error::Schema(format!("Unsupported data type: {other:?}")));
            }
        };
        values.push(value);
    }
    Ok(values)
}

fn downcast<T: 'static>(col: &ArrayRef) -> Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Arrow(format!("Failed to downcast {:?} column", col.data_type())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn seeded_source(dir: &TempDir) -> DuckDbSource {
        let source = DuckDbSource::new(dir.path().join("test.db"));
        let csv = write_csv(
            dir,
            "customers.csv",
            "customer_id,gender,age,payment_method\n\
             C1,Female,28,Credit Card\n\
             C2,Male,21,Debit Card\n\
             C3,Male,20,Cash\n",
        );
        assert_eq!(source.import_csv("Customers", &csv).unwrap(), 3);
        source
    }

    #[test]
    fn test_fetch_all_rows() {
        let dir = TempDir::new().unwrap();
        let source = seeded_source(&dir);

        let batch = source.fetch(&Query::new("SELECT * FROM Customers")).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 4);
        assert!(batch.column_by_name("payment_method").is_some());
    }

    #[test]
    fn test_fetch_binds_parameters() {
        let dir = TempDir::new().unwrap();
        let source = seeded_source(&dir);

        let query = Query::new("SELECT * FROM Customers WHERE payment_method LIKE ?")
            .bind("%Card%");
        let batch = source.fetch(&query).unwrap();
        assert_eq!(batch.num_rows(), 2);

        // A hostile value is just a value.
        let query = Query::new("SELECT * FROM Customers WHERE payment_method LIKE ?")
            .bind("%' OR '1'='1%");
        assert_eq!(source.fetch(&query).unwrap().num_rows(), 0);
    }

    #[test]
    fn test_fetch_empty_result_keeps_schema() {
        let dir = TempDir::new().unwrap();
        let source = seeded_source(&dir);

        let query = Query::new("SELECT * FROM Customers WHERE age > ?").bind(100i64);
        let batch = source.fetch(&query).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 4);
    }

    #[test]
    fn test_fetch_invalid_query_is_data_access_error() {
        let dir = TempDir::new().unwrap();
        let source = seeded_source(&dir);

        let err = source.fetch(&Query::new("SELECT * FROM Missing")).unwrap_err();
        assert!(err.is_data_access());

        let err = source
            .fetch(&Query::new("SELECT * FROM Customers WHERE age > ?"))
            .unwrap_err();
        assert!(err.is_data_access());
    }

    #[test]
    fn test_fetch_question_mark_in_literal_is_not_a_placeholder() {
        let dir = TempDir::new().unwrap();
        let source = seeded_source(&dir);

        let batch = source
            .fetch(&Query::new("SELECT * FROM Customers WHERE payment_method <> '?'"))
            .unwrap();
        assert_eq!(batch.num_rows(), 3);

        let query = Query::new(
            "SELECT * FROM Customers WHERE payment_method <> '?' AND payment_method LIKE ?",
        )
        .bind("%Cash%");
        assert_eq!(source.fetch(&query).unwrap().num_rows(), 1);

        let query = Query::new("SELECT * FROM Customers").bind("extra");
        assert!(source.fetch(&query).unwrap_err().is_data_access());
    }

    #[test]
    fn test_fetch_missing_database_is_data_access_error() {
        let dir = TempDir::new().unwrap();
        let source = DuckDbSource::new(dir.path().join("nope.db"));
        let err = source.fetch(&Query::new("SELECT 1")).unwrap_err();
        assert!(err.is_data_access());
    }

    #[test]
    fn test_list_tables() {
        let dir = TempDir::new().unwrap();
        let source = seeded_source(&dir);
        assert_eq!(source.list_tables().unwrap(), vec!["Customers".to_string()]);
    }

    #[test]
    fn test_import_header_only_csv() {
        let dir = TempDir::new().unwrap();
        let source = DuckDbSource::new(dir.path().join("test.db"));
        let csv = write_csv(&dir, "empty.csv", "invoice_date,category\n");
        assert_eq!(source.import_csv("Sales", &csv).unwrap(), 0);

        let batch = source.fetch(&Query::new("SELECT * FROM Sales")).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 2);
    }
}
