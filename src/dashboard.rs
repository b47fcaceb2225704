//! The per-refresh dashboard pipeline.
//!
//! Every refresh re-runs the same flow for the current widget selections:
//!
//! 1. customers, narrowed by payment method, plus their download
//! 2. sales, validated into typed columns
//! 3. the category and mall option lists
//! 4. filtering, KPIs and the report sections
//! 5. the filtered sales download
//!
//! Reads go through a [`QueryCache`], so a refresh with unchanged selections
//! does not touch the store again. Any failing step aborts the refresh.

use crate::aggregation::{aggregate, AggregateRequest};
use crate::config::DashboardSettings;
use crate::error::Result;
use crate::export::{ExportFile, CUSTOMER_EXPORT, SALES_EXPORT};
use crate::filter::{self, distinct_values, FilterSpec, Selection, ALL};
use crate::metrics::{summarize, Kpis};
use crate::query::{customers_query, sales_query};
use crate::schema::{self, CATEGORY, INVOICE_DATE, SHOPPING_MALL, TOTAL_SALES};
use crate::storage::{DataSource, QueryCache};
use crate::utils::record_batch_to_json;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// Current widget state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    /// Customer filter; a single method matches as a substring
    pub payment_method: Selection,
    /// Sales category filter
    pub category: Selection,
    /// Selected malls; `None` means every mall, which is the initial state
    pub malls: Option<BTreeSet<String>>,
}

impl Selections {
    fn sales_filter(&self) -> FilterSpec {
        let malls = match &self.malls {
            Some(malls) => Selection::AnyOf(malls.clone()),
            None => Selection::All,
        };
        FilterSpec::new()
            .with(CATEGORY, self.category.clone())
            .with(SHOPPING_MALL, malls)
    }
}

/// Everything one refresh produces.
///
/// Tables serialize as arrays of row objects. The downloads carry raw bytes
/// and are left out of the serialized form.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub payment_method_options: Vec<String>,
    pub category_options: Vec<String>,
    pub mall_options: Vec<String>,
    #[serde(serialize_with = "serialize_table")]
    pub customers: RecordBatch,
    pub kpis: Kpis,
    /// Best-selling categories over all sales, ignoring the filters
    #[serde(serialize_with = "serialize_table")]
    pub top_categories: RecordBatch,
    #[serde(serialize_with = "serialize_table")]
    pub sales_by_category: RecordBatch,
    #[serde(serialize_with = "serialize_table")]
    pub sales_by_mall: RecordBatch,
    #[serde(serialize_with = "serialize_table")]
    pub sales_trend: RecordBatch,
    #[serde(serialize_with = "serialize_table")]
    pub filtered_sales: RecordBatch,
    /// Offered only when there is at least one customer row
    #[serde(skip)]
    pub customer_export: Option<ExportFile>,
    #[serde(skip)]
    pub sales_export: ExportFile,
}

impl Report {
    /// Downloads available in this report.
    pub fn exports(&self) -> impl Iterator<Item = &ExportFile> {
        self.customer_export.iter().chain(std::iter::once(&self.sales_export))
    }

    /// The report as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn serialize_table<S: Serializer>(batch: &RecordBatch, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let rows = record_batch_to_json(batch).map_err(serde::ser::Error::custom)?;
    rows.serialize(serializer)
}

/// Dashboard over a data source.
pub struct Dashboard<S> {
    cache: QueryCache<S>,
    settings: DashboardSettings,
}

impl<S: DataSource> Dashboard<S> {
    pub fn new(source: S, settings: DashboardSettings) -> Self {
        Self::with_cache(QueryCache::new(source), settings)
    }

    pub fn with_cache(cache: QueryCache<S>, settings: DashboardSettings) -> Self {
        Self { cache, settings }
    }

    pub fn cache(&self) -> &QueryCache<S> {
        &self.cache
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// Run the whole pipeline for `selections`.
    #[instrument(skip(self))]
    pub fn refresh(&self, selections: &Selections) -> Result<Report> {
        let customers = self.cache.fetch(&customers_query(&selections.payment_method))?;
        let customers = schema::validate_customers(&customers)?;
        let customer_export = if customers.num_rows() > 0 {
            Some(ExportFile::csv(CUSTOMER_EXPORT, &customers)?)
        } else {
            debug!("No customers match, customer download withheld");
            None
        };

        let sales = self.cache.fetch(&sales_query())?;
        let sales = schema::validate_sales(&sales, &self.settings.date_format)?;

        let category_options = with_all(distinct_values(&sales, CATEGORY)?);
        let mall_options = distinct_values(&sales, SHOPPING_MALL)?;

        let filtered = filter::apply(&sales, &selections.sales_filter())?;
        let kpis = summarize(&filtered, TOTAL_SALES)?;

        let top = AggregateRequest::sum(CATEGORY, TOTAL_SALES).top(self.settings.top_categories);
        let top_categories = aggregate(&sales, &top)?;
        let sales_by_category = aggregate(&filtered, &AggregateRequest::sum(CATEGORY, TOTAL_SALES))?;
        let sales_by_mall = aggregate(&filtered, &AggregateRequest::sum(SHOPPING_MALL, TOTAL_SALES))?;
        let sales_trend = aggregate(&filtered, &AggregateRequest::sum(INVOICE_DATE, TOTAL_SALES))?;

        let sales_export = ExportFile::csv(SALES_EXPORT, &filtered)?;

        info!(
            customers = customers.num_rows(),
            sales = sales.num_rows(),
            filtered = filtered.num_rows(),
            "Dashboard updated"
        );

        Ok(Report {
            payment_method_options: with_all(self.settings.payment_methods.clone()),
            category_options,
            mall_options,
            customers,
            kpis,
            top_categories,
            sales_by_category,
            sales_by_mall,
            sales_trend,
            filtered_sales: filtered,
            customer_export,
            sales_export,
        })
    }
}

fn with_all(options: Vec<String>) -> Vec<String> {
    std::iter::once(ALL.to_string()).chain(options).collect()
}
