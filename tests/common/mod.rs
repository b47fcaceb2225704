//! Common test utilities: a DuckDB file seeded with the two dashboard relations.

#![allow(dead_code)]

use salesdash_core::config::DashboardSettings;
use salesdash_core::storage::DuckDbSource;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CUSTOMERS_CSV: &str = "customer_id,gender,age,payment_method\n\
C241288,Female,28,Credit Card\n\
C111565,Male,21,Debit Card\n\
C266599,Male,20,Cash\n\
C988172,Female,66,Credit Card\n";

pub const SALES_CSV: &str = "invoice_no,invoice_date,category,shopping_mall,Total Sales\n\
I138884,01-01-2024,Clothing,MallA,100.0\n\
I317333,02-01-2024,Electronics,MallB,250.0\n\
I127801,03-01-2024,Clothing,MallA,50.0\n";

pub struct TestStore {
    pub dir: TempDir,
    pub source: DuckDbSource,
}

impl TestStore {
    pub fn database(&self) -> &Path {
        self.source.path()
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture file");
    file.write_all(contents.as_bytes()).expect("write fixture file");
    path
}

/// A fresh database seeded from `customers` and `sales` CSV text.
pub fn seeded_store_with(customers: &str, sales: &str) -> TestStore {
    let dir = tempfile::tempdir().expect("create temp dir");
    let writer = DuckDbSource::new(dir.path().join("sales_dashboard.db")).with_read_only(false);

    let customers = write_file(dir.path(), "customers.csv", customers);
    let sales = write_file(dir.path(), "sales.csv", sales);
    writer.import_csv("Customers", &customers).expect("import customers");
    writer.import_csv("Sales", &sales).expect("import sales");

    let source = DuckDbSource::new(writer.path());
    TestStore { dir, source }
}

pub fn seeded_store() -> TestStore {
    seeded_store_with(CUSTOMERS_CSV, SALES_CSV)
}

pub fn settings() -> DashboardSettings {
    DashboardSettings::default()
}
