//! Text cleaning: case/whitespace normalization and date parsing with
//! coercion.

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, RecordBatch, StringArray, TimestampSecondArray},
    compute::cast,
    datatypes::{DataType, Field, Schema, TimeUnit},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::Transform;
use crate::{
    error::{Error, Result},
    record::SemanticType,
};

/// Fixed name of the column added by [`ParseDates`].
pub const STANDARD_DATETIME_COLUMN: &str = "standard_datetime";

/// Case applied by [`NormalizeStrings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    /// Lowercase.
    Lower,
    /// Uppercase.
    Upper,
}

/// Trims leading/trailing whitespace and normalizes case on every value in
/// one text column. Null values pass through unchanged.
#[derive(Debug, Clone)]
pub struct NormalizeStrings {
    column: String,
    case: TextCase,
}

impl NormalizeStrings {
    /// Creates a NormalizeStrings transform for the given column.
    pub fn new(column: impl Into<String>, case: TextCase) -> Self {
        Self {
            column: column.into(),
            case,
        }
    }

    /// Returns the column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the configured case.
    pub fn case(&self) -> TextCase {
        self.case
    }
}

impl Transform for NormalizeStrings {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let (col_idx, field) = schema
            .column_with_name(&self.column)
            .ok_or_else(|| Error::column_not_found(&self.column))?;

        if field.data_type() != &DataType::Utf8 {
            return Err(Error::schema_mismatch(format!(
                "cannot normalize strings on non-text column '{}' (type: {:?})",
                self.column,
                field.data_type()
            )));
        }

        let arr = batch
            .column(col_idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::transform("expected StringArray for text column"))?;

        let values: Vec<Option<String>> = (0..arr.len())
            .map(|i| {
                if arr.is_null(i) {
                    None
                } else {
                    let trimmed = arr.value(i).trim();
                    Some(match self.case {
                        TextCase::Lower => trimmed.to_lowercase(),
                        TextCase::Upper => trimmed.to_uppercase(),
                    })
                }
            })
            .collect();

        let mut arrays = batch.columns().to_vec();
        arrays[col_idx] = Arc::new(StringArray::from(values));

        RecordBatch::try_new(schema, arrays).map_err(Error::Arrow)
    }
}

/// Parses a column's text values into a timestamp column with flexible
/// format detection, coercing unparseable values to null.
///
/// The result is written to the fixed-name [`STANDARD_DATETIME_COLUMN`],
/// additive to the record set; the source column is untouched. Malformed
/// dates must not abort the pipeline, so this transform never fails on
/// values — only a missing source column is an error. A source column that
/// is already temporal is converted instead of re-parsed; any other source
/// type coerces entirely to null.
#[derive(Debug, Clone)]
pub struct ParseDates {
    column: String,
}

impl ParseDates {
    /// Creates a ParseDates transform reading from the given source column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    /// Returns the source column name.
    pub fn column(&self) -> &str {
        &self.column
    }
}

/// Attempts to parse a timestamp out of free-form text.
///
/// Tries RFC 3339 first, then common datetime layouts, then date-only
/// layouts at midnight.
fn parse_flexible(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d-%m-%Y %H:%M:%S",
    ];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d %b %Y"];

    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

impl Transform for ParseDates {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let (col_idx, field) = schema
            .column_with_name(&self.column)
            .ok_or_else(|| Error::column_not_found(&self.column))?;

        let col = batch.column(col_idx);
        let timestamp_type = DataType::Timestamp(TimeUnit::Second, None);

        let parsed: ArrayRef = match SemanticType::of(field.data_type()) {
            SemanticType::Text => {
                let arr = col
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| Error::transform("expected StringArray for text column"))?;
                let seconds: Vec<Option<i64>> = (0..arr.len())
                    .map(|i| {
                        if arr.is_null(i) {
                            None
                        } else {
                            parse_flexible(arr.value(i)).map(|dt| dt.and_utc().timestamp())
                        }
                    })
                    .collect();
                Arc::new(TimestampSecondArray::from(seconds))
            }
            SemanticType::Temporal => cast(col.as_ref(), &timestamp_type).map_err(Error::Arrow)?,
            _ => Arc::new(TimestampSecondArray::from(vec![
                None::<i64>;
                batch.num_rows()
            ])),
        };

        let new_field = Field::new(STANDARD_DATETIME_COLUMN, timestamp_type, true);

        // Overwrite a previous pass's output instead of duplicating it.
        let existing = schema.column_with_name(STANDARD_DATETIME_COLUMN).map(|(i, _)| i);
        let mut fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        let mut arrays = batch.columns().to_vec();

        match existing {
            Some(idx) => {
                fields[idx] = new_field;
                arrays[idx] = parsed;
            }
            None => {
                fields.push(new_field);
                arrays.push(parsed);
            }
        }

        let new_schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(new_schema, arrays).map_err(Error::Arrow)
    }
}
