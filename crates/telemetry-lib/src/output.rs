//! Delimited-file persistence for bundle tables
//!
//! Each non-empty table is written as `<name>.csv` in the output directory;
//! the file of an empty table is removed so no stale rows survive a rerun.
//! Mapping-valued resource columns are written as JSON objects.

use crate::bundle::CollectionBundle;
use crate::error::OutputError;
use crate::models::{minute_precision, ResourceRecord, SyntheticRecord, TableName};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A table that was written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenTable {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Flat CSV shape of a [`ResourceRecord`]
#[derive(Debug, Serialize)]
struct ResourceRow<'a> {
    resource_id: &'a str,
    resource_type: &'a str,
    region: &'a str,
    state: &'a str,
    creation_date: String,
    tags: String,
    name: &'a str,
    details: String,
}

impl<'a> ResourceRow<'a> {
    fn from_record(record: &'a ResourceRecord) -> Result<Self, OutputError> {
        Ok(Self {
            resource_id: &record.resource_id,
            resource_type: record.resource_type.as_str(),
            region: &record.region,
            state: &record.state,
            creation_date: minute_precision::format(&record.creation_date),
            tags: serde_json::to_string(&record.tags)
                .map_err(|source| OutputError::Encode { column: "tags", source })?,
            name: &record.name,
            details: serde_json::to_string(&record.details)
                .map_err(|source| OutputError::Encode { column: "details", source })?,
        })
    }
}

/// Writes tables into one output directory
pub struct TableWriter {
    dir: PathBuf,
}

impl TableWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every non-empty table of the bundle. Empty tables produce no
    /// file, and a file left from an earlier run is removed.
    pub fn write_bundle(&self, bundle: &CollectionBundle) -> Result<Vec<WrittenTable>, OutputError> {
        self.ensure_dir()?;
        let mut written = Vec::new();

        if bundle.costs.is_empty() {
            self.remove_stale(TableName::Costs)?;
        } else {
            written.push(self.write_table(TableName::Costs, &bundle.costs.rows)?);
        }
        if bundle.resources.is_empty() {
            self.remove_stale(TableName::Resources)?;
        } else {
            let rows = bundle
                .resources
                .rows
                .iter()
                .map(ResourceRow::from_record)
                .collect::<Result<Vec<_>, _>>()?;
            written.push(self.write_table(TableName::Resources, &rows)?);
        }
        if bundle.utilization.is_empty() {
            self.remove_stale(TableName::Utilization)?;
        } else {
            written.push(self.write_table(TableName::Utilization, &bundle.utilization.rows)?);
        }
        if bundle.metadata.is_empty() {
            self.remove_stale(TableName::Metadata)?;
        } else {
            written.push(self.write_table(TableName::Metadata, &bundle.metadata.rows)?);
        }

        Ok(written)
    }

    fn remove_stale(&self, table: TableName) -> Result<(), OutputError> {
        let path = self.dir.join(table.file_name());
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed table file from a previous run");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(OutputError::Remove { path, source }),
        }
    }

    fn write_table<T: Serialize>(&self, table: TableName, rows: &[T]) -> Result<WrittenTable, OutputError> {
        let path = self.dir.join(table.file_name());
        write_rows(&path, rows)?;
        Ok(WrittenTable {
            name: table.as_str().to_string(),
            path,
            rows: rows.len(),
        })
    }

    fn ensure_dir(&self) -> Result<(), OutputError> {
        fs::create_dir_all(&self.dir).map_err(|source| OutputError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }
}

/// Write rows with a header line to `path`
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    let csv_error = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer
        .flush()
        .map_err(|e| csv_error(csv::Error::from(e)))?;
    Ok(())
}

/// Write one named table to `path`, creating parent directories
pub fn write_file<T: Serialize>(path: &Path, name: &str, rows: &[T]) -> Result<WrittenTable, OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    write_rows(path, rows)?;
    Ok(WrittenTable {
        name: name.to_string(),
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}

/// Write a generated dataset to a single file
pub fn write_synthetic(path: &Path, records: &[SyntheticRecord]) -> Result<WrittenTable, OutputError> {
    write_file(path, "synthetic", records)
}
