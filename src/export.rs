use std::borrow::Cow;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::aggregate::group::GroupedTable;
use crate::data::loader::required_columns;
use crate::data::model::{Dataset, Dimension, Measure};

// ---------------------------------------------------------------------------
// Table export
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize csv output: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render a grouped table as delimited text: one header row, then one line
/// per group.  Missing cells are written as empty fields.
pub fn to_csv_string(table: &GroupedTable) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header: Vec<&str> = table
        .key_columns
        .iter()
        .chain(&table.value_columns)
        .map(String::as_str)
        .collect();
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut fields: Vec<String> = row.keys.clone();
        for value in &row.values {
            fields.push(value.map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&fields)?;
    }

    finish(writer)
}

/// Write a grouped table to a file in the same format as
/// [`to_csv_string`].
pub fn write_csv(table: &GroupedTable, path: &Path) -> Result<(), ExportError> {
    let text = to_csv_string(table)?;
    std::fs::write(path, text).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Dataset export
// ---------------------------------------------------------------------------

/// Serialize a whole dataset back out with the source schema, so the
/// output loads again through the loader.
pub fn dataset_to_csv(dataset: &Dataset) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(required_columns())?;

    for record in dataset.iter() {
        let mut fields: Vec<String> = Vec::with_capacity(30);
        for d in Dimension::ALL {
            fields.push(record.dimension(d).map(Cow::into_owned).unwrap_or_default());
        }
        for m in Measure::ALL {
            fields.push(record.measure(m).map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&fields)?;
    }

    finish(writer)
}

/// File counterpart of [`dataset_to_csv`].
pub fn write_dataset_csv(dataset: &Dataset, path: &Path) -> Result<(), ExportError> {
    let text = dataset_to_csv(dataset)?;
    std::fs::write(path, text).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
