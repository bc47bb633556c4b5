//! Row-level cleaning operations: deduplication, missing-value policy, and
//! outlier filtering.

use std::sync::Arc;

use arrow::{
    array::{
        Array, ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray,
    },
    compute::{cast, filter_record_batch},
    datatypes::{DataType, Field, Schema},
};

use super::Transform;
use crate::{
    error::{Error, Result},
    record::{row_key, SemanticType},
};

/// Removes rows that exactly duplicate an earlier row across all columns,
/// keeping the first occurrence. Row order is otherwise preserved.
///
/// # Example
///
/// ```ignore
/// use limpiar::Dedupe;
///
/// let dedupe = Dedupe::new();
/// let cleaned = dedupe.apply(batch)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Dedupe;

impl Dedupe {
    /// Creates a Dedupe transform.
    pub fn new() -> Self {
        Self
    }
}

impl Transform for Dedupe {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        use std::collections::HashSet;

        if batch.num_rows() <= 1 {
            return Ok(batch);
        }

        let all_columns: Vec<usize> = (0..batch.num_columns()).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mask: Vec<bool> = (0..batch.num_rows())
            .map(|row| seen.insert(row_key(&batch, row, &all_columns)))
            .collect();

        if mask.iter().all(|&keep| keep) {
            return Ok(batch);
        }

        filter_record_batch(&batch, &BooleanArray::from(mask)).map_err(Error::Arrow)
    }
}

/// Value substituted for nulls by [`MissingPolicy::Fill`].
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    /// Constant integer fill.
    Int(i64),
    /// Constant float fill.
    Float(f64),
    /// Constant text fill.
    Text(String),
}

impl FillValue {
    /// Creates a text fill value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Renders the fill value for insertion into a text column.
    fn render(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(v) => v.clone(),
        }
    }
}

/// Missing-data policy for [`HandleMissing`].
///
/// Exactly one policy applies per call; the enum makes the drop-versus-fill
/// precedence unrepresentable rather than documented.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingPolicy {
    /// Remove any row containing at least one null in any column.
    DropNullRows,
    /// Remove rows whose every cell is null, then fill remaining nulls
    /// when a fill value is given.
    DropBlankRows {
        /// Fill applied after the blank rows are removed, if any.
        fill: Option<FillValue>,
    },
    /// Replace every null with the fill value.
    Fill(FillValue),
}

/// Resolves missing values in a batch according to a [`MissingPolicy`].
///
/// When used as intended the postcondition is that zero nulls remain.
/// A text fill applied to a non-text column casts the column to text
/// first, so the fill always lands; the numeric tag on such a column is
/// gone afterwards and later numeric sweeps skip it.
#[derive(Debug, Clone)]
pub struct HandleMissing {
    policy: MissingPolicy,
}

impl HandleMissing {
    /// Creates a HandleMissing transform with the given policy.
    pub fn new(policy: MissingPolicy) -> Self {
        Self { policy }
    }

    /// Returns the configured policy.
    pub fn policy(&self) -> &MissingPolicy {
        &self.policy
    }

    fn drop_rows_with_null(batch: RecordBatch) -> Result<RecordBatch> {
        let mask: Vec<bool> = (0..batch.num_rows())
            .map(|row| (0..batch.num_columns()).all(|col| !batch.column(col).is_null(row)))
            .collect();
        filter_record_batch(&batch, &BooleanArray::from(mask)).map_err(Error::Arrow)
    }

    fn drop_blank_rows(batch: RecordBatch) -> Result<RecordBatch> {
        if batch.num_columns() == 0 {
            return Ok(batch);
        }
        let mask: Vec<bool> = (0..batch.num_rows())
            .map(|row| (0..batch.num_columns()).any(|col| !batch.column(col).is_null(row)))
            .collect();
        filter_record_batch(&batch, &BooleanArray::from(mask)).map_err(Error::Arrow)
    }

    fn fill_i64(arr: &Int64Array, value: i64) -> Int64Array {
        let values: Vec<i64> = (0..arr.len())
            .map(|i| if arr.is_null(i) { value } else { arr.value(i) })
            .collect();
        Int64Array::from(values)
    }

    fn fill_f64(arr: &Float64Array, value: f64) -> Float64Array {
        let values: Vec<f64> = (0..arr.len())
            .map(|i| if arr.is_null(i) { value } else { arr.value(i) })
            .collect();
        Float64Array::from(values)
    }

    fn fill_string(arr: &StringArray, value: &str) -> StringArray {
        let values: Vec<&str> = (0..arr.len())
            .map(|i| if arr.is_null(i) { value } else { arr.value(i) })
            .collect();
        StringArray::from(values)
    }

    /// Fills one column, possibly changing its type (numeric fill widening
    /// to Float64, or a text fill forcing a cast to Utf8).
    fn fill_column(col: &ArrayRef, field: &Field, value: &FillValue) -> Result<(Field, ArrayRef)> {
        let semantic = SemanticType::of(field.data_type());

        let (data_type, array): (DataType, ArrayRef) = match (semantic, value) {
            (SemanticType::Text, v) => {
                let arr = col
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| Error::transform("expected StringArray for text column"))?;
                (
                    DataType::Utf8,
                    Arc::new(Self::fill_string(arr, &v.render())),
                )
            }
            (SemanticType::Number, FillValue::Text(s)) | (SemanticType::Temporal, FillValue::Text(s)) => {
                let as_text = cast(col.as_ref(), &DataType::Utf8).map_err(Error::Arrow)?;
                let arr = as_text
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| Error::transform("expected StringArray after cast"))?;
                (DataType::Utf8, Arc::new(Self::fill_string(arr, s)))
            }
            (SemanticType::Number, FillValue::Int(v)) => match field.data_type() {
                DataType::Int64 => {
                    let arr = col
                        .as_any()
                        .downcast_ref::<Int64Array>()
                        .ok_or_else(|| Error::transform("expected Int64Array"))?;
                    (DataType::Int64, Arc::new(Self::fill_i64(arr, *v)))
                }
                _ => {
                    let as_float = cast(col.as_ref(), &DataType::Float64).map_err(Error::Arrow)?;
                    let arr = as_float
                        .as_any()
                        .downcast_ref::<Float64Array>()
                        .ok_or_else(|| Error::transform("expected Float64Array after cast"))?;
                    #[allow(clippy::cast_precision_loss)]
                    let filled = Self::fill_f64(arr, *v as f64);
                    (DataType::Float64, Arc::new(filled))
                }
            },
            (SemanticType::Number, FillValue::Float(v)) => {
                let as_float = cast(col.as_ref(), &DataType::Float64).map_err(Error::Arrow)?;
                let arr = as_float
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| Error::transform("expected Float64Array after cast"))?;
                (DataType::Float64, Arc::new(Self::fill_f64(arr, *v)))
            }
            (semantic, value) => {
                return Err(Error::transform(format!(
                    "cannot fill {:?} column '{}' with {:?}",
                    semantic,
                    field.name(),
                    value
                )));
            }
        };

        Ok((Field::new(field.name(), data_type, true), array))
    }

    fn fill_all(batch: RecordBatch, value: &FillValue) -> Result<RecordBatch> {
        let schema = batch.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        for (idx, field) in schema.fields().iter().enumerate() {
            let col = batch.column(idx);
            if col.null_count() == 0 {
                fields.push(field.as_ref().clone());
                arrays.push(Arc::clone(col));
            } else {
                let (new_field, new_array) = Self::fill_column(col, field, value)?;
                fields.push(new_field);
                arrays.push(new_array);
            }
        }

        let new_schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(new_schema, arrays).map_err(Error::Arrow)
    }
}

impl Transform for HandleMissing {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        match &self.policy {
            MissingPolicy::DropNullRows => Self::drop_rows_with_null(batch),
            MissingPolicy::DropBlankRows { fill } => {
                let kept = Self::drop_blank_rows(batch)?;
                match fill {
                    Some(value) => Self::fill_all(kept, value),
                    None => Ok(kept),
                }
            }
            MissingPolicy::Fill(value) => Self::fill_all(batch, value),
        }
    }
}

/// Retains rows whose value in one numeric column falls within
/// `[lower, upper]` inclusive.
///
/// Rows with null in the column are excluded: null is not ordered against
/// either bound.
#[derive(Debug, Clone)]
pub struct FilterOutliers {
    column: String,
    lower: f64,
    upper: f64,
}

impl FilterOutliers {
    /// Creates a FilterOutliers transform for the given column and bounds.
    pub fn new(column: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            column: column.into(),
            lower,
            upper,
        }
    }

    /// Returns the column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the inclusion bounds.
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}

impl Transform for FilterOutliers {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let (idx, field) = schema
            .column_with_name(&self.column)
            .ok_or_else(|| Error::column_not_found(&self.column))?;

        if SemanticType::of(field.data_type()) != SemanticType::Number {
            return Err(Error::schema_mismatch(format!(
                "cannot filter outliers on non-numeric column '{}' (type: {:?})",
                self.column,
                field.data_type()
            )));
        }

        let col = batch.column(idx);
        let as_float = cast(col.as_ref(), &DataType::Float64).map_err(Error::Arrow)?;
        let arr = as_float
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| Error::transform("expected Float64Array after cast"))?;

        let mask: Vec<bool> = (0..arr.len())
            .map(|i| {
                if arr.is_null(i) {
                    false
                } else {
                    let v = arr.value(i);
                    v >= self.lower && v <= self.upper
                }
            })
            .collect();

        filter_record_batch(&batch, &BooleanArray::from(mask)).map_err(Error::Arrow)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn create_test_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("amount", DataType::Float64, true),
        ]));

        let ids = Int64Array::from(vec![Some(1), Some(2), Some(1), None]);
        let names = StringArray::from(vec![Some("a"), Some("b"), Some("a"), None]);
        let amounts = Float64Array::from(vec![Some(10.0), Some(20.0), Some(10.0), None]);

        RecordBatch::try_new(
            schema,
            vec![Arc::new(ids), Arc::new(names), Arc::new(amounts)],
        )
        .ok()
        .unwrap_or_else(|| panic!("Should create batch"))
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let batch = create_test_batch();
        let result = Dedupe::new().apply(batch).ok().unwrap();
        // Row 2 duplicates row 0; blank row is not a duplicate of anything.
        assert_eq!(result.num_rows(), 3);

        let ids = result
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap_or_else(|| panic!("Should be Int64Array"));
        assert_eq!(ids.value(0), 1);
        assert_eq!(ids.value(1), 2);
        assert!(ids.is_null(2));
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let batch = create_test_batch();
        let once = Dedupe::new().apply(batch).ok().unwrap();
        let twice = Dedupe::new().apply(once.clone()).ok().unwrap();
        assert_eq!(once.num_rows(), twice.num_rows());
    }

    #[test]
    fn test_dedupe_single_row_noop() {
        let batch = create_test_batch().slice(0, 1);
        let result = Dedupe::new().apply(batch).ok().unwrap();
        assert_eq!(result.num_rows(), 1);
    }

    #[test]
    fn test_drop_null_rows() {
        let batch = create_test_batch();
        let transform = HandleMissing::new(MissingPolicy::DropNullRows);
        let result = transform.apply(batch).ok().unwrap();

        assert_eq!(result.num_rows(), 3);
        for col in result.columns() {
            assert_eq!(col.null_count(), 0);
        }
    }

    #[test]
    fn test_drop_blank_rows_keeps_partial() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("b", DataType::Utf8, true),
        ]));
        let a = Int64Array::from(vec![Some(1), None, None]);
        let b = StringArray::from(vec![None, Some("x"), None]);
        let batch = RecordBatch::try_new(schema, vec![Arc::new(a), Arc::new(b)])
            .ok()
            .unwrap();

        let transform = HandleMissing::new(MissingPolicy::DropBlankRows { fill: None });
        let result = transform.apply(batch).ok().unwrap();

        // Rows 0 and 1 are partially filled and stay; row 2 is fully blank.
        assert_eq!(result.num_rows(), 2);
    }

    #[test]
    fn test_drop_blank_rows_then_fill() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Utf8, true),
            Field::new("b", DataType::Utf8, true),
        ]));
        let a = StringArray::from(vec![Some("x"), None]);
        let b = StringArray::from(vec![None::<&str>, None]);
        let batch = RecordBatch::try_new(schema, vec![Arc::new(a), Arc::new(b)])
            .ok()
            .unwrap();

        let transform = HandleMissing::new(MissingPolicy::DropBlankRows {
            fill: Some(FillValue::text("Unknown")),
        });
        let result = transform.apply(batch).ok().unwrap();

        assert_eq!(result.num_rows(), 1);
        let b = result
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap_or_else(|| panic!("Should be StringArray"));
        assert_eq!(b.value(0), "Unknown");
    }

    #[test]
    fn test_fill_text_column() {
        let batch = create_test_batch();
        let transform = HandleMissing::new(MissingPolicy::Fill(FillValue::text("Unknown")));
        let result = transform.apply(batch).ok().unwrap();

        assert_eq!(result.num_rows(), 4);
        for col in result.columns() {
            assert_eq!(col.null_count(), 0);
        }

        let names = result
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap_or_else(|| panic!("Should be StringArray"));
        assert_eq!(names.value(3), "Unknown");
    }

    #[test]
    fn test_fill_text_upcasts_numeric_column() {
        let batch = create_test_batch();
        let transform = HandleMissing::new(MissingPolicy::Fill(FillValue::text("Unknown")));
        let result = transform.apply(batch).ok().unwrap();

        // The id column had a null, so the text fill forced it to Utf8.
        assert_eq!(result.schema().field(0).data_type(), &DataType::Utf8);
        let ids = result
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap_or_else(|| panic!("Should be StringArray"));
        assert_eq!(ids.value(0), "1");
        assert_eq!(ids.value(3), "Unknown");
    }

    #[test]
    fn test_fill_int_preserves_int_column() {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, true)]));
        let v = Int64Array::from(vec![Some(1), None, Some(3)]);
        let batch = RecordBatch::try_new(schema, vec![Arc::new(v)]).ok().unwrap();

        let transform = HandleMissing::new(MissingPolicy::Fill(FillValue::Int(0)));
        let result = transform.apply(batch).ok().unwrap();

        assert_eq!(result.schema().field(0).data_type(), &DataType::Int64);
        let v = result
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap_or_else(|| panic!("Should be Int64Array"));
        assert_eq!(v.value(1), 0);
    }

    #[test]
    fn test_fill_float_widens_int_column() {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, true)]));
        let v = Int64Array::from(vec![Some(1), None]);
        let batch = RecordBatch::try_new(schema, vec![Arc::new(v)]).ok().unwrap();

        let transform = HandleMissing::new(MissingPolicy::Fill(FillValue::Float(0.5)));
        let result = transform.apply(batch).ok().unwrap();

        assert_eq!(result.schema().field(0).data_type(), &DataType::Float64);
        let v = result
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap_or_else(|| panic!("Should be Float64Array"));
        assert_eq!(v.value(0), 1.0);
        assert_eq!(v.value(1), 0.5);
    }

    #[test]
    fn test_fill_untouched_columns_keep_type() {
        let batch = create_test_batch();
        let transform = HandleMissing::new(MissingPolicy::Fill(FillValue::text("Unknown")));
        let result = transform.apply(batch.slice(0, 3)).ok().unwrap();

        // First three rows have no nulls; nothing changes.
        assert_eq!(result.schema().field(0).data_type(), &DataType::Int64);
        assert_eq!(result.schema().field(2).data_type(), &DataType::Float64);
    }

    #[test]
    fn test_filter_outliers_inclusive_bounds() {
        let batch = create_test_batch();
        let transform = FilterOutliers::new("amount", 10.0, 20.0);
        let result = transform.apply(batch).ok().unwrap();

        // 10, 20, 10 are within bounds; null row excluded.
        assert_eq!(result.num_rows(), 3);
    }

    #[test]
    fn test_filter_outliers_excludes_nulls() {
        let batch = create_test_batch();
        let transform = FilterOutliers::new("amount", f64::MIN, f64::MAX);
        let result = transform.apply(batch).ok().unwrap();
        assert_eq!(result.num_rows(), 3);
        assert_eq!(result.column(2).null_count(), 0);
    }

    #[test]
    fn test_filter_outliers_column_not_found() {
        let batch = create_test_batch();
        let transform = FilterOutliers::new("nonexistent", 0.0, 1.0);
        let result = transform.apply(batch);
        assert!(matches!(result, Err(Error::ColumnNotFound { .. })));
    }

    #[test]
    fn test_filter_outliers_non_numeric_column() {
        let batch = create_test_batch();
        let transform = FilterOutliers::new("name", 0.0, 1.0);
        let result = transform.apply(batch);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }
}
