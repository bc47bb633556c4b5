//! Structural column edits: selection/reorder, rename, drop, and type
//! coercion.

use std::sync::Arc;

use arrow::{
    array::RecordBatch,
    compute::{cast_with_options, CastOptions},
    datatypes::{Field, Schema},
    util::display::FormatOptions,
};

use super::Transform;
use crate::{
    error::{Error, Result},
    record::SemanticType,
};

/// Restricts and reorders a batch to exactly the given column list.
///
/// # Example
///
/// ```ignore
/// use limpiar::SelectColumns;
///
/// let select = SelectColumns::new(vec!["customer_id", "name", "region"]);
/// ```
#[derive(Debug, Clone)]
pub struct SelectColumns {
    columns: Vec<String>,
}

impl SelectColumns {
    /// Creates a new SelectColumns transform for the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the columns to be selected, in output order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Transform for SelectColumns {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays = Vec::with_capacity(self.columns.len());

        for col_name in &self.columns {
            let (idx, field) = schema
                .column_with_name(col_name)
                .ok_or_else(|| Error::column_not_found(col_name))?;

            fields.push(field.clone());
            arrays.push(Arc::clone(batch.column(idx)));
        }

        let new_schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(new_schema, arrays).map_err(Error::Arrow)
    }
}

/// Renames columns per an old-to-new mapping.
///
/// Every old name must exist; the mapping is validated before any rename is
/// applied, so the operation is atomic: either all renames succeed or the
/// batch is returned untouched via the error path.
#[derive(Debug, Clone)]
pub struct RenameColumns {
    mapping: std::collections::HashMap<String, String>,
}

impl RenameColumns {
    /// Creates a new RenameColumns transform with the given mapping.
    pub fn new(mapping: std::collections::HashMap<String, String>) -> Self {
        Self { mapping }
    }

    /// Creates a RenameColumns transform from pairs of (old, new).
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, S)>) -> Self {
        let mapping = pairs
            .into_iter()
            .map(|(old, new)| (old.into(), new.into()))
            .collect();
        Self { mapping }
    }
}

impl Transform for RenameColumns {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();

        for old_name in self.mapping.keys() {
            if schema.column_with_name(old_name).is_none() {
                return Err(Error::column_not_found(old_name));
            }
        }

        let new_fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|field| match self.mapping.get(field.name()) {
                Some(new_name) => {
                    Field::new(new_name, field.data_type().clone(), field.is_nullable())
                }
                None => field.as_ref().clone(),
            })
            .collect();

        let new_schema = Arc::new(Schema::new(new_fields));
        RecordBatch::try_new(new_schema, batch.columns().to_vec()).map_err(Error::Arrow)
    }
}

/// Drops the named columns from a batch.
#[derive(Debug, Clone)]
pub struct DropColumns {
    columns: Vec<String>,
}

impl DropColumns {
    /// Creates a new DropColumns transform for the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the columns to be dropped.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Transform for DropColumns {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();

        for name in &self.columns {
            if schema.column_with_name(name).is_none() {
                return Err(Error::column_not_found(name));
            }
        }

        let drop_set: std::collections::HashSet<&str> =
            self.columns.iter().map(String::as_str).collect();

        let mut fields = Vec::new();
        let mut arrays = Vec::new();

        for (idx, field) in schema.fields().iter().enumerate() {
            if !drop_set.contains(field.name().as_str()) {
                fields.push(field.as_ref().clone());
                arrays.push(Arc::clone(batch.column(idx)));
            }
        }

        if fields.is_empty() {
            return Err(Error::transform("Cannot drop all columns from record set"));
        }

        let new_schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(new_schema, arrays).map_err(Error::Arrow)
    }
}

/// Coerces one column to a new semantic type.
///
/// Unlike parse-with-coercion, a value that cannot be converted surfaces as
/// an error rather than becoming null: a failed explicit cast signals a
/// pipeline/schema mismatch.
#[derive(Debug, Clone)]
pub struct CastColumn {
    column: String,
    to: SemanticType,
}

impl CastColumn {
    /// Creates a new CastColumn transform.
    pub fn new(column: impl Into<String>, to: SemanticType) -> Self {
        Self {
            column: column.into(),
            to,
        }
    }

    /// Returns the column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the target semantic type.
    pub fn target(&self) -> SemanticType {
        self.to
    }
}

impl Transform for CastColumn {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let (col_idx, field) = schema
            .column_with_name(&self.column)
            .ok_or_else(|| Error::column_not_found(&self.column))?;

        let target_type = self.to.arrow_type();
        // safe=false: invalid values must error, not silently become null.
        let options = CastOptions {
            safe: false,
            format_options: FormatOptions::default(),
        };
        let casted = cast_with_options(batch.column(col_idx).as_ref(), &target_type, &options)
            .map_err(|e| {
                Error::transform(format!(
                    "Failed to cast column '{}' to {:?}: {}",
                    self.column, self.to, e
                ))
            })?;

        let mut fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields[col_idx] = Field::new(field.name(), target_type, true);

        let mut arrays = batch.columns().to_vec();
        arrays[col_idx] = casted;

        let new_schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(new_schema, arrays).map_err(Error::Arrow)
    }
}
