//! Registry export loading
//!
//! Reads the CSV export into [`LoadedDataset`]. Header names are normalized
//! with [`normalize_column_name`]; only the columns the pipeline knows about
//! are kept on each record. Empty cells and the usual NA spellings
//! ([`MISSING_MARKERS`]) load as `None`.

use std::path::Path;

use tracing::{debug, error, info};

use crate::errors::{ImpactError, Result};
use crate::record::{normalize_column_name, LoadedDataset, ProjectRecord};

/// Load every project row from the export at `path`.
///
/// Any read failure, and an export with no data rows, reports
/// `Failed to load data from {path}.`
pub fn load_projects(path: &Path) -> Result<LoadedDataset> {
    info!("Loading registry export from: {}", path.display());
    match read_export(path) {
        Ok(dataset) if !dataset.is_empty() => {
            info!("Successfully loaded raw data: {} rows", dataset.len());
            Ok(dataset)
        }
        Ok(_) => {
            error!("Export {} has no data rows", path.display());
            Err(load_failure(path))
        }
        Err(err) => {
            error!("Reading {} failed: {err}", path.display());
            Err(load_failure(path))
        }
    }
}

/// Cell values read as missing, in addition to the empty cell
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(value: &str) -> bool {
    value.is_empty() || MISSING_MARKERS.contains(&value)
}

fn load_failure(path: &Path) -> ImpactError {
    ImpactError::Load(format!("Failed to load data from {}.", path.display()))
}

fn read_export(path: &Path) -> std::result::Result<LoadedDataset, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_column_name)
        .collect();
    debug!("Export columns: {:?}", columns);

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let mut record = ProjectRecord::default();
        for (column, value) in columns.iter().zip(row.iter()) {
            let cell = if is_missing(value) {
                None
            } else {
                Some(value.to_string())
            };
            record.set_field(column, cell);
        }
        records.push(record);
    }

    Ok(LoadedDataset { columns, records })
}
