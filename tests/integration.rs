//! Integration tests for limpiar: full prepare-then-load scenarios over
//! real CSV files and a real SQLite warehouse.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::path::Path;

use limpiar::{load_prepared, prepare_all, Config, DomainPipeline, RecordSet};

/// Writes the three raw domain CSVs used by the end-to-end scenarios.
///
/// The customers file carries one exact duplicate row, one fully-blank
/// row, one missing region, and one extreme loyalty outlier; the products
/// file has messy header and text casing; the sales file has one extreme
/// sale amount.
fn write_raw_inputs(raw_dir: &Path) {
    std::fs::create_dir_all(raw_dir).unwrap();

    std::fs::write(
        raw_dir.join("customers_data.csv"),
        "CustomerID,CustomerName,Region,JoinDate,LoyaltyPoints\n\
         1, Alice ,East,2024-01-01,100\n\
         1,Alicia,West,2024-01-02,100\n\
         2,Bob,,2024-01-03,110\n\
         3,Cara,North,2024-01-04,120\n\
         4,Dan,South,2024-01-05,130\n\
         5,Eve,East,2024-01-06,140\n\
         6,Fay,West,2024-01-07,150\n\
         7,Gus,North,2024-01-08,160\n\
         8,Ivy,South,2024-01-09,170\n\
         8,Jon,East,2024-01-10,99999\n\
         2,Bob,,2024-01-03,110\n\
         ,,,,\n",
    )
    .unwrap();

    std::fs::write(
        raw_dir.join("products_data.csv"),
        "ProductID,Product Name,Category,Unit Price\n\
         201, Laptop ,ELECTRONICS,5.0\n\
         202,Mouse,Electronics,5.5\n\
         203,Keyboard,electronics,6.0\n\
         204,Monitor,Electronics,6.5\n\
         205,Desk,FURNITURE,7.0\n\
         206,Chair,Furniture,7.5\n",
    )
    .unwrap();

    std::fs::write(
        raw_dir.join("sales_data.csv"),
        "TransactionID,CustomerID,ProductID,SaleAmount,SaleDate\n\
         1,1,203,10.5,2024-03-01\n\
         2,2,204,12.0,2024-03-02\n\
         3,1,203,11.0,2024-03-03\n\
         4,2,204,13.0,2024-03-04\n\
         5,1,203,12.5,2024-03-05\n\
         6,2,204,9999.0,2024-03-06\n",
    )
    .unwrap();
}

#[test]
fn test_customers_end_to_end_scenario() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_data_root(temp_dir.path());
    write_raw_inputs(&temp_dir.path().join("raw"));

    let outcome = DomainPipeline::customers().run(&config).unwrap();

    // 12 raw rows: the exact duplicate, the fully-blank row, and the
    // loyalty outlier are gone, in that logical order.
    assert_eq!(outcome.rows_in, 12);
    assert_eq!(outcome.rows_out, 9);

    let prepared =
        std::fs::read_to_string(config.prepared_dir().join("customers_data_prepared.csv"))
            .unwrap();
    assert!(!prepared.contains("99999"));
    // Missing region was filled; named text column was lowercased.
    assert!(prepared.contains("Unknown"));
    assert!(prepared.contains("alice"));
    assert!(!prepared.contains(" Alice "));
    // Exactly one surviving Bob row.
    assert_eq!(prepared.matches("bob").count(), 1);
}

#[test]
fn test_products_pipeline_normalizes_headers_and_text() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_data_root(temp_dir.path());
    write_raw_inputs(&temp_dir.path().join("raw"));

    let outcome = DomainPipeline::products().run(&config).unwrap();

    // Percentile trim runs per numeric column in schema order: the id pass
    // removes the min/max id rows, the price pass then trims again.
    assert_eq!(outcome.rows_in, 6);
    assert_eq!(outcome.rows_out, 2);

    let prepared =
        RecordSet::from_csv(config.prepared_dir().join("products_data_prepared.csv")).unwrap();
    assert!(prepared.has_column("product_id"));
    assert!(prepared.has_column("product_name"));
    assert!(prepared.has_column("unit_price"));

    let text =
        std::fs::read_to_string(config.prepared_dir().join("products_data_prepared.csv")).unwrap();
    assert!(text.contains("keyboard"));
    assert!(text.contains("monitor"));
    assert!(!text.contains("ELECTRONICS"));
}

#[test]
fn test_sales_pipeline_iqr_trims_extreme_amount() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_data_root(temp_dir.path());
    write_raw_inputs(&temp_dir.path().join("raw"));

    let outcome = DomainPipeline::sales().run(&config).unwrap();

    assert_eq!(outcome.rows_in, 6);
    assert_eq!(outcome.rows_out, 5);

    let text =
        std::fs::read_to_string(config.prepared_dir().join("sales_data_prepared.csv")).unwrap();
    assert!(!text.contains("9999"));
}

#[test]
fn test_full_run_loads_star_schema() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_data_root(temp_dir.path());
    write_raw_inputs(&temp_dir.path().join("raw"));

    for run in prepare_all(&config) {
        assert!(run.result.is_ok(), "{} failed", run.domain);
    }

    let summary = load_prepared(&config).unwrap();

    // Customer ids 1 and 8 each survive preparation twice / once; the key
    // dedup keeps the first occurrence and reports the collision.
    assert_eq!(summary.customers.inserted, 8);
    assert_eq!(summary.customers.duplicate_keys_dropped, 1);
    assert_eq!(summary.products.inserted, 2);
    assert_eq!(summary.products.duplicate_keys_dropped, 0);
    assert_eq!(summary.facts, 5);

    let conn = rusqlite::Connection::open(config.warehouse_path()).unwrap();

    let customer_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM dim_customer", [], |r| r.get(0))
        .unwrap();
    assert_eq!(customer_count, 8);

    // Keep-first: the first-seen row for the colliding key is retained.
    let name: String = conn
        .query_row(
            "SELECT name FROM dim_customer WHERE customer_id = 1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(name, "alice");
}

#[test]
fn test_olap_consumer_contract() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_data_root(temp_dir.path());
    write_raw_inputs(&temp_dir.path().join("raw"));

    for run in prepare_all(&config) {
        assert!(run.result.is_ok(), "{} failed", run.domain);
    }
    load_prepared(&config).unwrap();

    let conn = rusqlite::Connection::open(config.warehouse_path()).unwrap();

    // The OLAP consumer joins fact_sales to dim_customer on customer_id
    // and expects sale_date parseable as a date and sale_amount as a
    // number for every persisted row.
    let joined: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM fact_sales f \
             JOIN dim_customer c ON f.customer_id = c.customer_id",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(joined, 5);

    let total: f64 = conn
        .query_row("SELECT SUM(sale_amount) FROM fact_sales", [], |r| r.get(0))
        .unwrap();
    assert_eq!(total, 10.5 + 12.0 + 11.0 + 13.0 + 12.5);

    let bad_dates: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM fact_sales WHERE date(sale_date) IS NULL",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(bad_dates, 0);
}

#[test]
fn test_reload_replaces_prior_warehouse_state() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_data_root(temp_dir.path());
    write_raw_inputs(&temp_dir.path().join("raw"));

    for run in prepare_all(&config) {
        assert!(run.result.is_ok());
    }

    load_prepared(&config).unwrap();
    let second = load_prepared(&config).unwrap();

    // Full reload, not incremental append.
    assert_eq!(second.facts, 5);
    let conn = rusqlite::Connection::open(config.warehouse_path()).unwrap();
    let facts: i64 = conn
        .query_row("SELECT COUNT(*) FROM fact_sales", [], |r| r.get(0))
        .unwrap();
    assert_eq!(facts, 5);
}

#[test]
fn test_load_aborts_when_prepared_input_missing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_data_root(temp_dir.path());

    // No prepared files at all: the load shares one connection and one
    // destructive creation, so it fails as a whole.
    let result = load_prepared(&config);
    assert!(matches!(
        result,
        Err(limpiar::Error::SourceUnavailable { .. })
    ));
}
