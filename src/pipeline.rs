//! Domain pipelines: the fixed cleaning sequence for each entity type.
//!
//! All three domains share the same shape: normalize headers, remove
//! duplicate rows, resolve missing values, normalize text, trim numeric
//! outliers. They differ only in configuration: which missing-data policy,
//! whether text normalization targets one named column or every text
//! column, and which outlier convention. These differences are deliberate
//! per-domain choices, not drift to be unified.

use std::{path::PathBuf, sync::Arc};

use arrow::{
    array::RecordBatch,
    datatypes::{Field, Schema},
};

use crate::{
    config::Config,
    error::{Error, Result},
    outlier::OutlierPolicy,
    record::{RecordSet, SemanticType},
    scrub::{FillValue, MissingPolicy, Scrubber, TextCase},
};

/// Header normalization applied before any cleaning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Trim surrounding whitespace only.
    TrimOnly,
    /// Trim, lowercase, and replace spaces with underscores.
    SnakeCase,
}

impl HeaderStyle {
    fn normalize(self, name: &str) -> String {
        match self {
            Self::TrimOnly => name.trim().to_string(),
            Self::SnakeCase => name.trim().to_lowercase().replace(' ', "_"),
        }
    }
}

/// Scope of string normalization within a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextNormalization {
    /// No string normalization.
    None,
    /// Lowercase and trim one named column, tolerated if absent or not
    /// text-typed.
    Column(String),
    /// Lowercase and trim every text column.
    AllText,
}

/// The fixed, named cleaning sequence for one entity type.
#[derive(Debug, Clone)]
pub struct DomainPipeline {
    name: String,
    raw_file: String,
    prepared_file: String,
    headers: HeaderStyle,
    missing: MissingPolicy,
    text: TextNormalization,
    outliers: OutlierPolicy,
}

/// Result of preparing one domain.
#[derive(Debug, Clone)]
pub struct PrepareOutcome {
    /// Domain name.
    pub domain: String,
    /// Rows read from the raw input.
    pub rows_in: usize,
    /// Rows written to the prepared output.
    pub rows_out: usize,
    /// Prepared output path, or `None` when the raw input held no rows and
    /// nothing was written.
    pub output: Option<PathBuf>,
}

impl DomainPipeline {
    /// The customer dimension pipeline.
    ///
    /// Headers are trimmed as-is; blank rows are dropped and remaining
    /// nulls filled with `Unknown`; only the `CustomerName` column (when
    /// present) is lowercased; numeric columns are trimmed at the 1st/99th
    /// percentiles.
    pub fn customers() -> Self {
        Self {
            name: "customers".to_string(),
            raw_file: "customers_data.csv".to_string(),
            prepared_file: "customers_data_prepared.csv".to_string(),
            headers: HeaderStyle::TrimOnly,
            missing: MissingPolicy::DropBlankRows {
                fill: Some(FillValue::text("Unknown")),
            },
            text: TextNormalization::Column("CustomerName".to_string()),
            outliers: OutlierPolicy::percentile_trim(),
        }
    }

    /// The product dimension pipeline.
    ///
    /// Headers are snake_cased; blank rows are dropped and remaining nulls
    /// filled with `Unknown`; every text column is lowercased; numeric
    /// columns are trimmed at the 1st/99th percentiles.
    pub fn products() -> Self {
        Self {
            name: "products".to_string(),
            raw_file: "products_data.csv".to_string(),
            prepared_file: "products_data_prepared.csv".to_string(),
            headers: HeaderStyle::SnakeCase,
            missing: MissingPolicy::DropBlankRows {
                fill: Some(FillValue::text("Unknown")),
            },
            text: TextNormalization::AllText,
            outliers: OutlierPolicy::percentile_trim(),
        }
    }

    /// The sales fact pipeline.
    ///
    /// Headers are trimmed as-is; fully-blank rows are dropped (partial
    /// nulls survive to the fill-free policy); no string normalization;
    /// numeric columns are trimmed with IQR bounds.
    pub fn sales() -> Self {
        Self {
            name: "sales".to_string(),
            raw_file: "sales_data.csv".to_string(),
            prepared_file: "sales_data_prepared.csv".to_string(),
            headers: HeaderStyle::TrimOnly,
            missing: MissingPolicy::DropBlankRows { fill: None },
            text: TextNormalization::None,
            outliers: OutlierPolicy::Iqr,
        }
    }

    /// All three shipped pipelines in run order.
    pub fn all() -> Vec<Self> {
        vec![Self::customers(), Self::products(), Self::sales()]
    }

    /// Looks a pipeline up by domain name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "customers" => Some(Self::customers()),
            "products" => Some(Self::products()),
            "sales" => Some(Self::sales()),
            _ => None,
        }
    }

    /// Domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw input file name.
    pub fn raw_file(&self) -> &str {
        &self.raw_file
    }

    /// Prepared output file name.
    pub fn prepared_file(&self) -> &str {
        &self.prepared_file
    }

    /// Applies the full cleaning sequence to an in-memory record set.
    ///
    /// # Errors
    ///
    /// Propagates failures from the cleaning operations; a failure leaves
    /// the caller's input untouched.
    pub fn clean(&self, records: RecordSet) -> Result<RecordSet> {
        let records = normalize_headers(records, self.headers)?;

        let mut scrubber = Scrubber::new(records);
        scrubber.dedupe()?;
        scrubber.handle_missing(self.missing.clone())?;

        match &self.text {
            TextNormalization::None => {}
            TextNormalization::Column(name) => {
                let is_text = scrubber.records().semantic_type(name).ok()
                    == Some(SemanticType::Text);
                if is_text {
                    scrubber.normalize_strings(name, TextCase::Lower)?;
                } else {
                    tracing::debug!(domain = %self.name, column = %name, "named text column absent, skipped");
                }
            }
            TextNormalization::AllText => {
                for name in scrubber.records().columns_of(SemanticType::Text) {
                    scrubber.normalize_strings(&name, TextCase::Lower)?;
                }
            }
        }

        scrubber.trim_outliers(&self.outliers)?;
        Ok(scrubber.finish())
    }

    /// Reads the domain's raw CSV, cleans it, and writes the prepared CSV.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnavailable`] when the raw input cannot be
    /// read; the failure is scoped to this domain only. An empty raw input
    /// is not an error: nothing is written and the outcome records zero
    /// rows.
    pub fn run(&self, config: &Config) -> Result<PrepareOutcome> {
        let raw_path = config.raw_dir().join(&self.raw_file);
        tracing::info!(domain = %self.name, path = %raw_path.display(), "reading raw records");

        let records = RecordSet::from_csv(&raw_path)?;
        let rows_in = records.num_rows();

        if records.is_empty() {
            tracing::warn!(domain = %self.name, "no records to process");
            return Ok(PrepareOutcome {
                domain: self.name.clone(),
                rows_in,
                rows_out: 0,
                output: None,
            });
        }

        let cleaned = self.clean(records)?;
        let rows_out = cleaned.num_rows();

        std::fs::create_dir_all(config.prepared_dir())
            .map_err(|e| Error::io(e, config.prepared_dir()))?;
        let out_path = config.prepared_dir().join(&self.prepared_file);
        cleaned.to_csv(&out_path)?;

        tracing::info!(
            domain = %self.name,
            rows_in,
            rows_out,
            path = %out_path.display(),
            "wrote prepared records"
        );

        Ok(PrepareOutcome {
            domain: self.name.clone(),
            rows_in,
            rows_out,
            output: Some(out_path),
        })
    }
}

/// Outcome of one domain within [`prepare_all`].
#[derive(Debug)]
pub struct DomainRun {
    /// Domain name.
    pub domain: String,
    /// The domain's outcome or its isolated failure.
    pub result: Result<PrepareOutcome>,
}

/// Runs every domain pipeline, isolating failures per domain: a domain
/// whose raw input is unavailable (or whose cleaning fails) is reported and
/// skipped without stopping the others.
pub fn prepare_all(config: &Config) -> Vec<DomainRun> {
    DomainPipeline::all()
        .into_iter()
        .map(|pipeline| {
            let domain = pipeline.name().to_string();
            let result = pipeline.run(config);
            if let Err(error) = &result {
                tracing::error!(domain = %domain, %error, "domain preparation failed");
            }
            DomainRun { domain, result }
        })
        .collect()
}

/// Rebuilds the schema with normalized header names.
fn normalize_headers(records: RecordSet, style: HeaderStyle) -> Result<RecordSet> {
    let batch = records.into_batch();
    let schema = batch.schema();

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            Field::new(
                style.normalize(f.name()),
                f.data_type().clone(),
                f.is_nullable(),
            )
        })
        .collect();

    let new_schema = Arc::new(Schema::new(fields));
    let batch =
        RecordBatch::try_new(new_schema, batch.columns().to_vec()).map_err(Error::Arrow)?;
    Ok(RecordSet::from_batch(batch))
}
