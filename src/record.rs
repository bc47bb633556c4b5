//! The in-memory record container for limpiar.
//!
//! Provides [`RecordSet`], a table of named, typed columns with aligned
//! rows, backed by an Arrow [`RecordBatch`]. Cleaning operations consume a
//! `RecordSet` and produce a new one; nothing mutates a table in place.

use std::{
    io::{BufReader, Seek, SeekFrom},
    path::Path,
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, Float64Array, RecordBatch, StringArray},
    compute::{cast, concat_batches},
    datatypes::{DataType, Field, Schema, SchemaRef},
    util::display::array_value_to_string,
};

use crate::{
    error::{Error, Result},
    scrub::Transform,
};

/// Semantic type tag for a column.
///
/// Derived from the column's Arrow type; used to iterate "all columns
/// currently numeric" and to fail fast when an operation is applied to a
/// column of the wrong kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    /// Integer or floating-point column; supports ordering and quantiles.
    Number,
    /// UTF-8 text column; supports case/whitespace normalization.
    Text,
    /// Date or timestamp column.
    Temporal,
    /// Anything else (booleans, nested types).
    Other,
}

impl SemanticType {
    /// Classifies an Arrow data type.
    pub fn of(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64 => Self::Number,
            DataType::Utf8 | DataType::LargeUtf8 => Self::Text,
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => Self::Temporal,
            _ => Self::Other,
        }
    }

    /// The canonical Arrow type a column is coerced to for this semantic
    /// type.
    pub fn arrow_type(&self) -> DataType {
        match self {
            Self::Number => DataType::Float64,
            Self::Text => DataType::Utf8,
            Self::Temporal => {
                DataType::Timestamp(arrow::datatypes::TimeUnit::Second, None)
            }
            Self::Other => DataType::Utf8,
        }
    }
}

/// Per-column inspection summary, see [`RecordSet::describe`].
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// Semantic type of the column.
    pub semantic: SemanticType,
    /// Total row count.
    pub rows: usize,
    /// Null count.
    pub nulls: usize,
    /// Number of distinct non-null values.
    pub distinct: usize,
    /// Min/max/mean for numeric columns.
    pub numeric: Option<NumericSummary>,
}

/// Basic statistics for a numeric column.
#[derive(Debug, Clone)]
pub struct NumericSummary {
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// Mean value.
    pub mean: f64,
}

/// An in-memory table of named, typed columns with aligned rows.
///
/// All columns share one row count; row `i` across columns forms one
/// logical record. A `RecordSet` with zero rows is a valid, distinguishable
/// state meaning "nothing to process".
///
/// # Example
///
/// ```no_run
/// use limpiar::RecordSet;
///
/// let records = RecordSet::from_csv("data/raw/customers_data.csv").unwrap();
/// println!("{} rows, {} columns", records.num_rows(), records.num_columns());
/// ```
#[derive(Debug, Clone)]
pub struct RecordSet {
    batch: RecordBatch,
}

impl RecordSet {
    /// Creates a RecordSet from a single RecordBatch.
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Creates an empty RecordSet (zero rows) with the given schema.
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            batch: RecordBatch::new_empty(schema),
        }
    }

    /// Loads a RecordSet from a CSV file.
    ///
    /// The header row is required; column types are inferred from the data
    /// (no fixed schema is enforced on read). Empty text cells are read as
    /// null, and every column is nullable so later cleaning steps can
    /// introduce nulls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] if the file cannot be opened,
    /// and an Arrow error if it is not valid CSV.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        use arrow_csv::{reader::Format, ReaderBuilder};

        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::source_unavailable(e, path))?;
        let mut buf_reader = BufReader::new(file);

        let format = Format::default().with_header(true);
        let (inferred, _) = format
            .infer_schema(&mut buf_reader, None)
            .map_err(Error::Arrow)?;

        buf_reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::io(e, path))?;

        let schema = Arc::new(inferred);
        let reader = ReaderBuilder::new(Arc::clone(&schema))
            .with_batch_size(8192)
            .with_header(true)
            .build(buf_reader)
            .map_err(Error::Arrow)?;

        let batches: Vec<RecordBatch> = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        let nullable_schema = Arc::new(nullable_schema(&schema));
        let batch = if batches.is_empty() {
            RecordBatch::new_empty(nullable_schema)
        } else {
            let merged = concat_batches(&schema, batches.iter()).map_err(Error::Arrow)?;
            // A column with no values in the whole file infers as Null;
            // carry it as an all-null text column instead.
            let arrays: Vec<ArrayRef> = merged
                .columns()
                .iter()
                .map(|col| {
                    if col.data_type() == &DataType::Null {
                        cast(col.as_ref(), &DataType::Utf8).map_err(Error::Arrow)
                    } else {
                        Ok(Arc::clone(col))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            RecordBatch::try_new(nullable_schema, arrays).map_err(Error::Arrow)?
        };

        Ok(Self::from_batch(blank_text_to_null(batch)?))
    }

    /// Saves the RecordSet to a CSV file with a header row and no index
    /// column.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        use arrow_csv::WriterBuilder;

        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| Error::io(e, path))?;

        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer.write(&self.batch).map_err(Error::Arrow)?;

        Ok(())
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Returns true if the RecordSet contains no rows.
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Returns the schema.
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Returns the underlying batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Consumes the RecordSet and returns the underlying batch.
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Returns true if a column with the given name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().column_with_name(name).is_some()
    }

    /// Returns the index of the named column, failing fast if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if the column does not exist.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.batch
            .schema()
            .column_with_name(name)
            .map(|(idx, _)| idx)
            .ok_or_else(|| Error::column_not_found(name))
    }

    /// Returns the semantic type of the named column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if the column does not exist.
    pub fn semantic_type(&self, name: &str) -> Result<SemanticType> {
        let idx = self.column_index(name)?;
        Ok(SemanticType::of(self.batch.schema().field(idx).data_type()))
    }

    /// Returns the names of all columns currently of the given semantic
    /// type, in schema order.
    pub fn columns_of(&self, semantic: SemanticType) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .filter(|f| SemanticType::of(f.data_type()) == semantic)
            .map(|f| f.name().clone())
            .collect()
    }

    /// Returns the non-null values of a numeric column as `f64`, in row
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if the column does not exist and
    /// [`Error::SchemaMismatch`] if it is not numeric.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        let field = self.batch.schema().field(idx).clone();
        if SemanticType::of(field.data_type()) != SemanticType::Number {
            return Err(Error::schema_mismatch(format!(
                "column '{}' is not numeric (type: {:?})",
                name,
                field.data_type()
            )));
        }

        let col = self.batch.column(idx);
        let floats = cast(col.as_ref(), &DataType::Float64).map_err(Error::Arrow)?;
        let arr = floats
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| Error::schema_mismatch("expected Float64Array after cast"))?;

        Ok((0..arr.len())
            .filter(|&i| !arr.is_null(i))
            .map(|i| arr.value(i))
            .filter(|v| v.is_finite())
            .collect())
    }

    /// Applies a transform, producing a new RecordSet.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform fails; the original RecordSet is
    /// untouched in that case.
    pub fn apply<T: Transform + ?Sized>(&self, transform: &T) -> Result<Self> {
        transform.apply(self.batch.clone()).map(Self::from_batch)
    }

    /// Produces a per-column inspection summary: row count, null count,
    /// distinct count, and min/max/mean for numeric columns.
    pub fn describe(&self) -> Vec<ColumnSummary> {
        use std::collections::HashSet;

        let schema = self.batch.schema();
        let rows = self.batch.num_rows();
        let mut summaries = Vec::with_capacity(schema.fields().len());

        for (idx, field) in schema.fields().iter().enumerate() {
            let col = self.batch.column(idx);
            let semantic = SemanticType::of(field.data_type());
            let nulls = col.null_count();

            let mut distinct: HashSet<String> = HashSet::new();
            for row in 0..rows {
                if !col.is_null(row) {
                    distinct.insert(cell_key(col, row));
                }
            }

            let numeric = if semantic == SemanticType::Number {
                self.numeric_values(field.name()).ok().and_then(|values| {
                    if values.is_empty() {
                        None
                    } else {
                        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        #[allow(clippy::cast_precision_loss)]
                        let mean = values.iter().sum::<f64>() / values.len() as f64;
                        Some(NumericSummary { min, max, mean })
                    }
                })
            } else {
                None
            };

            summaries.push(ColumnSummary {
                name: field.name().clone(),
                semantic,
                rows,
                nulls,
                distinct: distinct.len(),
                numeric,
            });
        }

        summaries
    }
}

/// Formats one cell into a key string for duplicate detection.
///
/// Nulls map to a marker that cannot collide with real text; floats are
/// keyed by bit pattern for exact comparison.
pub(crate) fn cell_key(col: &ArrayRef, row: usize) -> String {
    use arrow::array::{BooleanArray, Float32Array, Int32Array, Int64Array};

    if col.is_null(row) {
        return "\u{0}".to_string();
    }
    if let Some(arr) = col.as_any().downcast_ref::<Int32Array>() {
        arr.value(row).to_string()
    } else if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        arr.value(row).to_string()
    } else if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        arr.value(row).to_bits().to_string()
    } else if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        arr.value(row).to_bits().to_string()
    } else if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        arr.value(row).to_string()
    } else if let Some(arr) = col.as_any().downcast_ref::<BooleanArray>() {
        arr.value(row).to_string()
    } else {
        array_value_to_string(col.as_ref(), row).unwrap_or_else(|_| "?".to_string())
    }
}

/// Builds a row key across the given column indices.
pub(crate) fn row_key(batch: &RecordBatch, row: usize, column_indices: &[usize]) -> String {
    let parts: Vec<String> = column_indices
        .iter()
        .map(|&idx| cell_key(batch.column(idx), row))
        .collect();
    parts.join("\u{1f}")
}

/// Rebuilds a schema with every field nullable, remapping inferred `Null`
/// columns (header-only files) to text.
fn nullable_schema(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let data_type = if f.data_type() == &DataType::Null {
                DataType::Utf8
            } else {
                f.data_type().clone()
            };
            Field::new(f.name(), data_type, true)
        })
        .collect();
    Schema::new(fields)
}

/// Replaces empty strings in text columns with null.
///
/// CSV has no null marker for text cells; an empty cell in a text column
/// must behave like a missing value for the missing-data policies.
fn blank_text_to_null(batch: RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
    let mut changed = false;

    for (idx, field) in schema.fields().iter().enumerate() {
        let col = batch.column(idx);
        if field.data_type() == &DataType::Utf8 {
            if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
                let has_blank =
                    (0..arr.len()).any(|i| !arr.is_null(i) && arr.value(i).is_empty());
                if has_blank {
                    let values: Vec<Option<&str>> = (0..arr.len())
                        .map(|i| {
                            if arr.is_null(i) || arr.value(i).is_empty() {
                                None
                            } else {
                                Some(arr.value(i))
                            }
                        })
                        .collect();
                    arrays.push(Arc::new(StringArray::from(values)));
                    changed = true;
                    continue;
                }
            }
        }
        arrays.push(Arc::clone(col));
    }

    if changed {
        RecordBatch::try_new(schema, arrays).map_err(Error::Arrow)
    } else {
        Ok(batch)
    }
}
