//! Star-schema warehouse loader.
//!
//! Materializes cleaned per-domain record sets into a SQLite star schema:
//! two dimension tables and one fact table. Every load run is a full
//! reload: an existing database file is deleted before the schema is
//! recreated. The connection is owned by the [`Warehouse`] value and
//! released on every exit path when it drops.

use std::{collections::HashSet, path::Path};

use arrow::{
    array::{Array, ArrayRef, BooleanArray, RecordBatch},
    compute::filter_record_batch,
    datatypes::{DataType, Field, Schema},
    util::display::array_value_to_string,
};
use rusqlite::{types::Value, Connection};

use crate::{
    config::Config,
    error::{Error, Result},
    record::{cell_key, RecordSet},
    scrub::{RenameColumns, SelectColumns, Transform},
};

/// How one domain's prepared columns map onto a warehouse table.
///
/// Header names are normalized (trim, lowercase) and then routed through
/// `renames`; only the canonical `columns` are retained. All model
/// knowledge lives here: a new raw header style needs one new rename
/// entry, nothing else.
#[derive(Debug, Clone, Copy)]
pub struct TableMapping {
    /// Warehouse table name.
    pub table: &'static str,
    /// Primary-key column (canonical name); dimension loads dedupe on it.
    pub key: &'static str,
    /// Raw-name to canonical-name dictionary, applied where present.
    pub renames: &'static [(&'static str, &'static str)],
    /// Canonical columns retained for the table, in schema order.
    pub columns: &'static [&'static str],
}

/// Mapping for the customer dimension.
pub const DIM_CUSTOMER: TableMapping = TableMapping {
    table: "dim_customer",
    key: "customer_id",
    renames: &[
        ("customerid", "customer_id"),
        ("customername", "name"),
        ("joindate", "join_date"),
    ],
    columns: &["customer_id", "name", "region", "join_date"],
};

/// Mapping for the product dimension.
pub const DIM_PRODUCT: TableMapping = TableMapping {
    table: "dim_product",
    key: "product_id",
    renames: &[
        ("productid", "product_id"),
        ("productname", "product_name"),
        ("unitprice", "unit_price"),
    ],
    columns: &["product_id", "product_name", "category", "unit_price"],
};

/// Mapping for the sales fact table.
pub const FACT_SALES: TableMapping = TableMapping {
    table: "fact_sales",
    key: "sale_id",
    renames: &[
        ("transactionid", "sale_id"),
        ("customerid", "customer_id"),
        ("productid", "product_id"),
        ("saleamount", "sale_amount"),
        ("saledate", "sale_date"),
    ],
    columns: &[
        "sale_id",
        "customer_id",
        "product_id",
        "sale_amount",
        "sale_date",
    ],
};

/// Report for one dimension load.
#[derive(Debug, Clone, Copy)]
pub struct DimensionLoad {
    /// Rows inserted after key deduplication.
    pub inserted: usize,
    /// Rows dropped because their key duplicated an earlier row.
    pub duplicate_keys_dropped: usize,
}

/// Summary of a full warehouse load run.
#[derive(Debug, Clone, Copy)]
pub struct LoadSummary {
    /// Customer dimension load report.
    pub customers: DimensionLoad,
    /// Product dimension load report.
    pub products: DimensionLoad,
    /// Fact rows inserted.
    pub facts: usize,
}

/// An exclusively-owned connection to the warehouse database.
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Creates the warehouse database at the given path.
    ///
    /// Destructive and idempotent: an existing file at the path is removed
    /// first, so every run starts from an empty schema. The schema is
    /// committed before any table is populated; a crash mid-load can
    /// therefore leave a created schema partially populated, and recovery
    /// is a full re-run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be replaced or the schema DDL
    /// fails.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent))?;
        }
        if path.exists() {
            tracing::info!(path = %path.display(), "deleting existing warehouse database");
            std::fs::remove_file(path).map_err(|e| Error::io(e, path))?;
        }

        let conn = Connection::open(path)?;
        // FK constraints are declared in the schema but not enforced at load
        // (orphan facts are accepted by design; see `load_fact`). The bundled
        // SQLite build defaults `foreign_keys` ON, so disable it explicitly to
        // preserve the documented load contract.
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS dim_customer (
                customer_id INTEGER PRIMARY KEY,
                name        TEXT,
                region      TEXT,
                join_date   TEXT
            );
            CREATE TABLE IF NOT EXISTS dim_product (
                product_id   INTEGER PRIMARY KEY,
                product_name TEXT,
                category     TEXT,
                unit_price   REAL
            );
            CREATE TABLE IF NOT EXISTS fact_sales (
                sale_id     INTEGER PRIMARY KEY,
                customer_id INTEGER,
                product_id  INTEGER,
                sale_amount REAL,
                sale_date   TEXT,
                FOREIGN KEY (customer_id) REFERENCES dim_customer(customer_id),
                FOREIGN KEY (product_id)  REFERENCES dim_product(product_id)
            );
            "#,
        )?;
        tracing::info!(path = %path.display(), "warehouse schema created");

        Ok(Self { conn })
    }

    /// Opens an existing warehouse database without recreating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        // Match `create`: FKs are declared but not enforced at load time.
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        Ok(Self { conn })
    }

    /// Loads a dimension table: maps columns, dedupes by primary key
    /// keeping the first occurrence, and appends the rows.
    ///
    /// Duplicate keys are a data-quality signal, not a failure: they are
    /// counted and reported so upstream regressions stay visible without
    /// blocking the load.
    ///
    /// # Errors
    ///
    /// Returns an error when a required canonical column is missing or an
    /// insert fails.
    pub fn load_dimension(
        &mut self,
        mapping: &TableMapping,
        records: &RecordSet,
    ) -> Result<DimensionLoad> {
        let mapped = map_columns(mapping, records)?;
        let (deduped, duplicate_keys_dropped) = dedupe_by_key(mapped.batch(), mapping.key)?;

        if duplicate_keys_dropped > 0 {
            tracing::warn!(
                table = mapping.table,
                key = mapping.key,
                dropped = duplicate_keys_dropped,
                "dropped duplicate dimension keys before load (keeping first occurrence)"
            );
        }

        let inserted = self.append_rows(mapping, &deduped)?;
        tracing::info!(table = mapping.table, rows = inserted, "loaded dimension");

        Ok(DimensionLoad {
            inserted,
            duplicate_keys_dropped,
        })
    }

    /// Loads the fact table append-only.
    ///
    /// Foreign keys are not checked against the dimension tables: a fact
    /// referencing an absent dimension key is accepted (orphan fact), a
    /// known limitation of the load contract.
    ///
    /// # Errors
    ///
    /// Returns an error when a required canonical column is missing or an
    /// insert fails.
    pub fn load_fact(&mut self, mapping: &TableMapping, records: &RecordSet) -> Result<usize> {
        let mapped = map_columns(mapping, records)?;
        let inserted = self.append_rows(mapping, mapped.batch())?;
        tracing::info!(table = mapping.table, rows = inserted, "loaded fact table");
        Ok(inserted)
    }

    /// Returns the row count of a warehouse table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count as usize)
    }

    /// Appends all rows of a batch to a table inside one transaction.
    fn append_rows(&mut self, mapping: &TableMapping, batch: &RecordBatch) -> Result<usize> {
        let placeholders: Vec<String> = (1..=mapping.columns.len())
            .map(|i| format!("?{i}"))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            mapping.table,
            mapping.columns.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in 0..batch.num_rows() {
                let values: Vec<Value> = (0..batch.num_columns())
                    .map(|col| sql_value(batch.column(col), row))
                    .collect::<Result<Vec<_>>>()?;
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()?;

        Ok(batch.num_rows())
    }
}

/// Loads all three prepared record sets into a freshly created warehouse.
///
/// Unlike preparation, the load is not isolated per table: the three loads
/// share one connection and one destructive schema creation, so any
/// failure aborts the whole run.
///
/// # Errors
///
/// Returns an error when any prepared input is unavailable or any table
/// load fails.
pub fn load_prepared(config: &Config) -> Result<LoadSummary> {
    tracing::info!("starting warehouse load");

    let customers =
        RecordSet::from_csv(config.prepared_dir().join("customers_data_prepared.csv"))?;
    let products = RecordSet::from_csv(config.prepared_dir().join("products_data_prepared.csv"))?;
    let sales = RecordSet::from_csv(config.prepared_dir().join("sales_data_prepared.csv"))?;

    let mut warehouse = Warehouse::create(config.warehouse_path())?;
    let summary = LoadSummary {
        customers: warehouse.load_dimension(&DIM_CUSTOMER, &customers)?,
        products: warehouse.load_dimension(&DIM_PRODUCT, &products)?,
        facts: warehouse.load_fact(&FACT_SALES, &sales)?,
    };

    tracing::info!("warehouse load completed");
    Ok(summary)
}

/// Normalizes headers (trim, lowercase), applies the mapping's rename
/// dictionary where entries are present, and retains exactly the canonical
/// columns.
fn map_columns(mapping: &TableMapping, records: &RecordSet) -> Result<RecordSet> {
    let batch = records.batch();
    let schema = batch.schema();

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            Field::new(
                f.name().trim().to_lowercase(),
                f.data_type().clone(),
                f.is_nullable(),
            )
        })
        .collect();
    let normalized = RecordBatch::try_new(
        std::sync::Arc::new(Schema::new(fields)),
        batch.columns().to_vec(),
    )
    .map_err(Error::Arrow)?;

    // The dictionary is tolerant: only entries whose raw name is present
    // apply. Missing canonical columns are caught by the strict selection.
    let present: Vec<(&str, &str)> = mapping
        .renames
        .iter()
        .copied()
        .filter(|(raw, _)| normalized.schema().column_with_name(raw).is_some())
        .collect();
    let renamed = RenameColumns::from_pairs(present).apply(normalized)?;

    let selected = SelectColumns::new(mapping.columns.iter().copied()).apply(renamed)?;
    Ok(RecordSet::from_batch(selected))
}

/// Removes rows whose key duplicates an earlier row, keeping the first
/// occurrence. Returns the surviving batch and the dropped-row count.
fn dedupe_by_key(batch: &RecordBatch, key: &str) -> Result<(RecordBatch, usize)> {
    let (key_idx, _) = batch
        .schema()
        .column_with_name(key)
        .ok_or_else(|| Error::column_not_found(key))?;

    let key_col = batch.column(key_idx);
    let mut seen: HashSet<String> = HashSet::new();
    let mask: Vec<bool> = (0..batch.num_rows())
        .map(|row| seen.insert(cell_key(key_col, row)))
        .collect();

    let dropped = mask.iter().filter(|&&keep| !keep).count();
    if dropped == 0 {
        return Ok((batch.clone(), 0));
    }

    let deduped =
        filter_record_batch(batch, &BooleanArray::from(mask)).map_err(Error::Arrow)?;
    Ok((deduped, dropped))
}

/// Converts one cell to a SQLite value. Nulls map to NULL; temporal and
/// other exotic types fall back to their text rendering.
fn sql_value(col: &ArrayRef, row: usize) -> Result<Value> {
    use arrow::array::{
        BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
    };

    if col.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match col.data_type() {
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| Value::Integer(a.value(row))),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| Value::Real(a.value(row))),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| Value::Real(f64::from(a.value(row)))),
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| Value::Text(a.value(row).to_string())),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        _ => Some(Value::Text(
            array_value_to_string(col.as_ref(), row).map_err(Error::Arrow)?,
        )),
    };

    value.ok_or_else(|| Error::transform("array type does not match its declared data type"))
}
