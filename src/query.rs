//! Read queries issued by the dashboard.
//!
//! Filter values are always bound as parameters, never spliced into the SQL
//! text, so the cache key of a query is its fixed SQL plus the bound values.

use crate::filter::Selection;
use crate::schema::{CUSTOMERS_TABLE, PAYMENT_METHOD, SALES_TABLE};
use crate::storage::{quote_ident, Query, StorageUtils};

/// `SELECT * FROM Customers`, narrowed by a payment method selection.
///
/// A single payment method matches as a substring (`LIKE '%value%'`); a set
/// matches any of its members the same way, and an empty set matches nothing.
pub fn customers_query(payment_method: &Selection) -> Query {
    let base = StorageUtils::generate_select_sql(CUSTOMERS_TABLE, None);
    let column = quote_ident(PAYMENT_METHOD);

    match payment_method {
        Selection::All => Query::new(base),
        Selection::One(value) => {
            Query::new(format!("{base} WHERE {column} LIKE ?")).bind(like_pattern(value))
        }
        Selection::AnyOf(values) if values.is_empty() => Query::new(format!("{base} WHERE FALSE")),
        Selection::AnyOf(values) => {
            let predicates = vec![format!("{column} LIKE ?"); values.len()].join(" OR ");
            values.iter().fold(
                Query::new(format!("{base} WHERE ({predicates})")),
                |query, value| query.bind(like_pattern(value)),
            )
        }
    }
}

/// `SELECT * FROM Sales`.
pub fn sales_query() -> Query {
    Query::new(StorageUtils::generate_select_sql(SALES_TABLE, None))
}

fn like_pattern(value: &str) -> String {
    format!("%{value}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::QueryParam;
    use std::collections::BTreeSet;

    #[test]
    fn test_customers_query_all() {
        let query = customers_query(&Selection::All);
        assert_eq!(query.sql, "SELECT * FROM \"Customers\"");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_customers_query_binds_value() {
        let query = customers_query(&Selection::One("Credit Card".to_string()));
        assert_eq!(
            query.sql,
            "SELECT * FROM \"Customers\" WHERE \"payment_method\" LIKE ?"
        );
        assert_eq!(query.params, vec![QueryParam::Text("%Credit Card%".to_string())]);
    }

    #[test]
    fn test_customers_query_same_sql_for_every_value() {
        let cash = customers_query(&Selection::One("Cash".to_string()));
        let debit = customers_query(&Selection::One("Debit Card".to_string()));
        assert_eq!(cash.sql, debit.sql);
        assert_ne!(cash.params, debit.params);
    }

    #[test]
    fn test_customers_query_set() {
        let values: BTreeSet<String> = ["Cash", "Debit Card"].iter().map(|s| s.to_string()).collect();
        let query = customers_query(&Selection::AnyOf(values));
        assert!(query.sql.ends_with("WHERE (\"payment_method\" LIKE ? OR \"payment_method\" LIKE ?)"));
        assert_eq!(query.params.len(), 2);

        let empty = customers_query(&Selection::AnyOf(BTreeSet::new()));
        assert!(empty.sql.ends_with("WHERE FALSE"));
    }

    #[test]
    fn test_sales_query() {
        assert_eq!(sales_query().sql, "SELECT * FROM \"Sales\"");
    }
}
