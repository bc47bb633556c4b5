//! Record cleaning transforms and the [`Scrubber`] pipeline wrapper.
//!
//! Each cleaning operation is a [`Transform`] that takes a `RecordBatch`
//! and produces a new one, so operations compose without hidden aliasing:
//! the input is never mutated, and a failed operation leaves the caller's
//! table exactly as it was.

use arrow::array::{Array, RecordBatch};

use crate::{
    error::{Error, Result},
    outlier::OutlierPolicy,
    record::{row_key, RecordSet, SemanticType},
};

mod columns;
mod rows;
mod text;

pub use columns::{CastColumn, DropColumns, RenameColumns, SelectColumns};
pub use rows::{Dedupe, FillValue, FilterOutliers, HandleMissing, MissingPolicy};
pub use text::{NormalizeStrings, ParseDates, TextCase, STANDARD_DATETIME_COLUMN};

/// A cleaning operation applied to a RecordBatch.
///
/// Transforms are the building blocks of the domain pipelines. They take a
/// RecordBatch and produce a new RecordBatch with the operation applied.
pub trait Transform: Send + Sync {
    /// Applies the transform to a RecordBatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform cannot be applied to the batch.
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch>;
}

/// Null and duplicate counts for a record set.
///
/// Produced before cleaning to make data-quality problems visible, and
/// after cleaning by [`Scrubber::verify_clean`] to assert the pipeline's
/// guarantees were met.
#[derive(Debug, Clone)]
pub struct ConsistencyReport {
    /// Null count per column, in schema order.
    pub null_counts: Vec<(String, usize)>,
    /// Number of rows that exactly duplicate an earlier row.
    pub duplicate_rows: usize,
}

impl ConsistencyReport {
    /// Total null values across all columns.
    pub fn total_nulls(&self) -> usize {
        self.null_counts.iter().map(|(_, n)| n).sum()
    }

    /// True when the record set has no nulls and no duplicate rows.
    pub fn is_clean(&self) -> bool {
        self.total_nulls() == 0 && self.duplicate_rows == 0
    }
}

/// Computes the consistency report for a batch.
fn consistency_report(batch: &RecordBatch) -> ConsistencyReport {
    use std::collections::HashSet;

    let schema = batch.schema();
    let null_counts = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| (field.name().clone(), batch.column(idx).null_count()))
        .collect();

    let all_columns: Vec<usize> = (0..batch.num_columns()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicate_rows = 0;
    for row in 0..batch.num_rows() {
        if !seen.insert(row_key(batch, row, &all_columns)) {
            duplicate_rows += 1;
        }
    }

    ConsistencyReport {
        null_counts,
        duplicate_rows,
    }
}

/// A cleaning pipeline over one owned [`RecordSet`].
///
/// The scrubber holds the working table for a single pipeline run and
/// exposes the cleaning operations as chainable fallible methods; each call
/// replaces the working table with the operation's output. On failure the
/// working table is left unmodified, so a pipeline can surface an error
/// without corrupting its input.
///
/// # Example
///
/// ```no_run
/// use limpiar::{MissingPolicy, FillValue, RecordSet, Scrubber};
///
/// let records = RecordSet::from_csv("data/raw/products_data.csv").unwrap();
/// let mut scrubber = Scrubber::new(records);
/// scrubber
///     .dedupe()
///     .and_then(|s| s.handle_missing(MissingPolicy::Fill(FillValue::text("Unknown"))))
///     .unwrap();
/// let cleaned = scrubber.finish();
/// ```
#[derive(Debug)]
pub struct Scrubber {
    records: RecordSet,
}

impl Scrubber {
    /// Creates a scrubber owning the given record set.
    pub fn new(records: RecordSet) -> Self {
        Self { records }
    }

    /// Returns the current working table.
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// Consumes the scrubber and returns the cleaned record set.
    pub fn finish(self) -> RecordSet {
        self.records
    }

    /// Applies a transform to the working table.
    ///
    /// # Errors
    ///
    /// Propagates the transform's error; the working table is unchanged on
    /// failure.
    pub fn apply<T: Transform>(&mut self, transform: &T) -> Result<&mut Self> {
        self.records = self.records.apply(transform)?;
        Ok(self)
    }

    /// Removes rows that exactly duplicate an earlier row across all
    /// columns, keeping the first occurrence. Idempotent.
    ///
    /// # Errors
    ///
    /// Never fails for a well-formed record set; the `Result` mirrors the
    /// other operations for chaining.
    pub fn dedupe(&mut self) -> Result<&mut Self> {
        self.apply(&Dedupe::new())
    }

    /// Resolves missing values with the given policy.
    ///
    /// # Errors
    ///
    /// Returns a transform error when a fill value cannot be applied to a
    /// column of an unsupported type.
    pub fn handle_missing(&mut self, policy: MissingPolicy) -> Result<&mut Self> {
        self.apply(&HandleMissing::new(policy))
    }

    /// Retains rows whose value in `column` lies within `[lower, upper]`
    /// inclusive; rows with null in that column are excluded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if the column is absent and a
    /// schema mismatch if it is not numeric.
    pub fn filter_outliers(&mut self, column: &str, lower: f64, upper: f64) -> Result<&mut Self> {
        self.apply(&FilterOutliers::new(column, lower, upper))
    }

    /// Trims outliers on every column currently numeric, in schema order.
    ///
    /// Bounds are recomputed per column from the rows that survived the
    /// previous columns' passes, so processing order affects the result;
    /// the fixed schema order keeps the outcome deterministic. Columns for
    /// which the policy produces no bounds (constant column under IQR) are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Propagates failures from the per-column filters.
    pub fn trim_outliers(&mut self, policy: &OutlierPolicy) -> Result<&mut Self> {
        let numeric = self.records.columns_of(SemanticType::Number);
        for column in numeric {
            let values = self.records.numeric_values(&column)?;
            match policy.bounds(&values) {
                Some((lower, upper)) => {
                    let before = self.records.num_rows();
                    self.filter_outliers(&column, lower, upper)?;
                    tracing::debug!(
                        column = %column,
                        lower,
                        upper,
                        rows_before = before,
                        rows_after = self.records.num_rows(),
                        "trimmed outliers"
                    );
                }
                None => {
                    tracing::debug!(column = %column, "no outlier bounds, column skipped");
                }
            }
        }
        Ok(self)
    }

    /// Trims whitespace and normalizes case on every value in a text
    /// column; nulls pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if the column is absent and a
    /// schema mismatch if it is not a text column.
    pub fn normalize_strings(&mut self, column: &str, case: TextCase) -> Result<&mut Self> {
        self.apply(&NormalizeStrings::new(column, case))
    }

    /// Parses a column's text values into the additive fixed-name
    /// timestamp column; unparseable values become null, never errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] only if the source column itself
    /// is absent.
    pub fn parse_dates(&mut self, column: &str) -> Result<&mut Self> {
        self.apply(&ParseDates::new(column))
    }

    /// Renames columns per an old-to-new mapping, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if any old name is absent; no
    /// rename is applied in that case.
    pub fn rename<S: Into<String>>(
        &mut self,
        mapping: impl IntoIterator<Item = (S, S)>,
    ) -> Result<&mut Self> {
        self.apply(&RenameColumns::from_pairs(mapping))
    }

    /// Restricts and reorders the record set to exactly the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if any requested column is absent.
    pub fn reorder<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<&mut Self> {
        self.apply(&SelectColumns::new(columns))
    }

    /// Drops the named columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if any named column is absent.
    pub fn drop_columns<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<&mut Self> {
        self.apply(&DropColumns::new(columns))
    }

    /// Coerces a column to a new semantic type, surfacing coercion
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if the column is absent; any
    /// value that cannot be coerced surfaces as a transform error.
    pub fn cast(&mut self, column: &str, to: SemanticType) -> Result<&mut Self> {
        self.apply(&CastColumn::new(column, to))
    }

    /// Reports null counts per column and the duplicate-row count for the
    /// working table.
    pub fn consistency_report(&self) -> ConsistencyReport {
        consistency_report(self.records.batch())
    }

    /// Asserts the post-cleaning contract: zero nulls and zero duplicate
    /// rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConsistencyCheck`] when the contract is violated.
    /// This is a programming-contract failure, not user-facing validation;
    /// callers treat it as fatal for the run.
    pub fn verify_clean(&self) -> Result<ConsistencyReport> {
        let report = self.consistency_report();
        if report.is_clean() {
            Ok(report)
        } else {
            Err(Error::ConsistencyCheck {
                nulls: report.total_nulls(),
                duplicates: report.duplicate_rows,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Float64Array, Int64Array, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;

    fn create_test_records() -> RecordSet {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("amount", DataType::Float64, true),
        ]));

        let ids = Int64Array::from(vec![Some(1), Some(2), Some(2), Some(3)]);
        let names = StringArray::from(vec![Some(" Alice "), Some("BOB"), Some("BOB"), None]);
        let amounts = Float64Array::from(vec![Some(10.0), Some(20.0), Some(20.0), Some(30.0)]);

        let batch = arrow::array::RecordBatch::try_new(
            schema,
            vec![Arc::new(ids), Arc::new(names), Arc::new(amounts)],
        )
        .ok()
        .unwrap_or_else(|| panic!("Should create batch"));

        RecordSet::from_batch(batch)
    }

    #[test]
    fn test_chained_pipeline() {
        let mut scrubber = Scrubber::new(create_test_records());
        scrubber
            .dedupe()
            .and_then(|s| s.normalize_strings("name", TextCase::Lower))
            .ok()
            .unwrap_or_else(|| panic!("Should clean"));

        let cleaned = scrubber.finish();
        assert_eq!(cleaned.num_rows(), 3); // duplicate row dropped
    }

    #[test]
    fn test_failed_operation_leaves_records_unmodified() {
        let mut scrubber = Scrubber::new(create_test_records());
        let result = scrubber.normalize_strings("nonexistent", TextCase::Lower);
        assert!(matches!(result, Err(Error::ColumnNotFound { .. })));

        // Working table untouched by the failure.
        assert_eq!(scrubber.records().num_rows(), 4);
        assert_eq!(scrubber.records().num_columns(), 3);
    }

    #[test]
    fn test_consistency_report_before_cleaning() {
        let scrubber = Scrubber::new(create_test_records());
        let report = scrubber.consistency_report();
        assert_eq!(report.total_nulls(), 1);
        assert_eq!(report.duplicate_rows, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_verify_clean_rejects_dirty_records() {
        let scrubber = Scrubber::new(create_test_records());
        let result = scrubber.verify_clean();
        assert!(matches!(
            result,
            Err(Error::ConsistencyCheck {
                nulls: 1,
                duplicates: 1
            })
        ));
    }

    #[test]
    fn test_verify_clean_after_cleaning() {
        let mut scrubber = Scrubber::new(create_test_records());
        scrubber
            .dedupe()
            .and_then(|s| s.handle_missing(MissingPolicy::Fill(FillValue::text("Unknown"))))
            .ok()
            .unwrap_or_else(|| panic!("Should clean"));

        let report = scrubber.verify_clean().ok().unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_trim_outliers_iqr_sweep() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("qty", DataType::Int64, true),
            Field::new("label", DataType::Utf8, true),
        ]));
        let qty = Int64Array::from(vec![
            Some(10),
            Some(11),
            Some(12),
            Some(13),
            Some(14),
            Some(999),
        ]);
        let labels = StringArray::from(vec!["a", "b", "c", "d", "e", "f"]);
        let batch = arrow::array::RecordBatch::try_new(schema, vec![Arc::new(qty), Arc::new(labels)])
            .ok()
            .unwrap_or_else(|| panic!("Should create batch"));

        let mut scrubber = Scrubber::new(RecordSet::from_batch(batch));
        scrubber
            .trim_outliers(&OutlierPolicy::Iqr)
            .ok()
            .unwrap_or_else(|| panic!("Should trim"));

        // Only the extreme row is dropped; text column is not swept.
        assert_eq!(scrubber.records().num_rows(), 5);
    }

    #[test]
    fn test_trim_outliers_constant_column_untouched() {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Float64, true)]));
        let values = Float64Array::from(vec![5.0, 5.0, 5.0, 5.0]);
        let batch = arrow::array::RecordBatch::try_new(schema, vec![Arc::new(values)])
            .ok()
            .unwrap_or_else(|| panic!("Should create batch"));

        let mut scrubber = Scrubber::new(RecordSet::from_batch(batch));
        scrubber.trim_outliers(&OutlierPolicy::Iqr).ok().unwrap();
        assert_eq!(scrubber.records().num_rows(), 4);
    }
}
