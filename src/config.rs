//! Run configuration for the pipelines and the warehouse loader.
//!
//! Paths are passed in explicitly rather than derived from the process
//! location; defaults are supplied by the CLI layer.

use std::path::{Path, PathBuf};

/// File-system locations for one run: raw inputs, prepared outputs, and the
/// warehouse database file.
#[derive(Debug, Clone)]
pub struct Config {
    raw_dir: PathBuf,
    prepared_dir: PathBuf,
    warehouse_path: PathBuf,
}

impl Config {
    /// Creates a configuration with the conventional layout under a data
    /// root: `<root>/raw`, `<root>/prepared`, `<root>/warehouse/sales_dw.db`.
    pub fn from_data_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            raw_dir: root.join("raw"),
            prepared_dir: root.join("prepared"),
            warehouse_path: root.join("warehouse").join("sales_dw.db"),
        }
    }

    /// Sets the raw input directory.
    #[must_use]
    pub fn with_raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = dir.into();
        self
    }

    /// Sets the prepared output directory.
    #[must_use]
    pub fn with_prepared_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prepared_dir = dir.into();
        self
    }

    /// Sets the warehouse database file path.
    #[must_use]
    pub fn with_warehouse_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.warehouse_path = path.into();
        self
    }

    /// Raw input directory.
    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// Prepared output directory.
    pub fn prepared_dir(&self) -> &Path {
        &self.prepared_dir
    }

    /// Warehouse database file path.
    pub fn warehouse_path(&self) -> &Path {
        &self.warehouse_path
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_data_root("data")
    }
}
