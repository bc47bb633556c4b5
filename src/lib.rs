//! limpiar - Record Cleaning and Warehouse Loading in Pure Rust
//!
//! A batch ETL toolkit for tabular business records: raw CSVs for three
//! domains (customers, products, sales) are cleaned through a shared,
//! composable transform toolkit and loaded into a SQLite star schema for
//! downstream OLAP aggregation.
//!
//! # Design Principles
//!
//! 1. **Immutable transforms** - every cleaning operation takes a table
//!    value and produces a new one; a failed operation leaves its input
//!    untouched
//! 2. **Coerce, don't crash** - malformed numeric and date values become
//!    nulls and flow into the missing-data policies; only structural
//!    mistakes (a missing column) are errors
//! 3. **Ecosystem aligned** - Arrow 53 `RecordBatch` throughout
//!
//! # Quick Start
//!
//! ```no_run
//! use limpiar::{prepare_all, load_prepared, Config};
//!
//! let config = Config::from_data_root("data");
//!
//! // Clean each domain's raw CSV into a prepared CSV.
//! for run in prepare_all(&config) {
//!     println!("{}: {:?}", run.domain, run.result.is_ok());
//! }
//!
//! // Rebuild the warehouse from the prepared files.
//! let summary = load_prepared(&config).unwrap();
//! println!("{} fact rows", summary.facts);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::map_unwrap_or)]

pub mod config;
pub mod error;
pub mod outlier;
pub mod pipeline;
pub mod record;
pub mod scrub;
pub mod warehouse;

// Re-exports for convenience
// Re-export arrow types commonly needed
pub use arrow::{
    array::RecordBatch,
    datatypes::{Schema, SchemaRef},
};
pub use config::Config;
pub use error::{Error, Result};
pub use outlier::OutlierPolicy;
pub use pipeline::{
    prepare_all, DomainPipeline, DomainRun, HeaderStyle, PrepareOutcome, TextNormalization,
};
pub use record::{ColumnSummary, NumericSummary, RecordSet, SemanticType};
pub use scrub::{
    CastColumn, ConsistencyReport, Dedupe, DropColumns, FillValue, FilterOutliers, HandleMissing,
    MissingPolicy, NormalizeStrings, ParseDates, RenameColumns, Scrubber, SelectColumns, TextCase,
    Transform, STANDARD_DATETIME_COLUMN,
};
pub use warehouse::{
    load_prepared, DimensionLoad, LoadSummary, TableMapping, Warehouse, DIM_CUSTOMER, DIM_PRODUCT,
    FACT_SALES,
};
