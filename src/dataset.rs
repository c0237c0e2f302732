//! Three-table dataset stored as matched CSV files.
//!
//! A dataset directory holds `data-matrix.csv` (samples x features, numeric),
//! `sample-metadata.csv` (one row per sample) and `feature-metadata.csv` (one
//! row per feature). Each file starts with a header row whose first cell is the
//! index name, and every data row starts with its index label.

use std::borrow::Cow;
use std::str::FromStr;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, Writer};
use serde::Serialize;
use tracing::debug;

use crate::error::MirrorError;
use crate::mirror::ensure_directory;

pub const DATA_MATRIX_FILE: &str = "data-matrix.csv";
pub const SAMPLE_METADATA_FILE: &str = "sample-metadata.csv";
pub const FEATURE_METADATA_FILE: &str = "feature-metadata.csv";

/// A labelled table: row index, column names and a row-major cell grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table<T> {
    pub index_name: String,
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<T>>,
}

pub type DataMatrix = Table<f64>;
pub type MetadataTable = Table<String>;

impl<T> Table<T> {
    pub fn shape(&self) -> (usize, usize) {
        (self.index.len(), self.columns.len())
    }
}

/// Data matrix plus its sample and feature metadata. The matrix row index is
/// expected to match the sample metadata index and its columns the feature
/// metadata index; neither is checked here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub data_matrix: DataMatrix,
    pub sample_metadata: MetadataTable,
    pub feature_metadata: MetadataTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetShape {
    pub samples: usize,
    pub features: usize,
    pub sample_metadata_columns: usize,
    pub feature_metadata_columns: usize,
}

impl Dataset {
    pub fn shape(&self) -> DatasetShape {
        let (samples, features) = self.data_matrix.shape();
        DatasetShape {
            samples,
            features,
            sample_metadata_columns: self.sample_metadata.columns.len(),
            feature_metadata_columns: self.feature_metadata.columns.len(),
        }
    }
}

/// Reads the three CSV files under `path`.
pub fn load(path: &Utf8Path) -> Result<Dataset, MirrorError> {
    let matrix_path = path.join(DATA_MATRIX_FILE);
    let raw = read_table(&matrix_path)?;
    let data_matrix = parse_matrix(&matrix_path, raw)?;
    let sample_metadata = read_table(&path.join(SAMPLE_METADATA_FILE))?;
    let feature_metadata = read_table(&path.join(FEATURE_METADATA_FILE))?;
    debug!(%path, shape = ?data_matrix.shape(), "loaded dataset");
    Ok(Dataset {
        data_matrix,
        sample_metadata,
        feature_metadata,
    })
}

/// Writes the three CSV files under `path`, creating it if needed. Existing
/// files are overwritten. A table whose rows disagree with its own index or
/// columns is refused before anything is written.
pub fn save(dataset: &Dataset, path: &Utf8Path) -> Result<(), MirrorError> {
    check_shape(&path.join(DATA_MATRIX_FILE), &dataset.data_matrix)?;
    check_shape(&path.join(SAMPLE_METADATA_FILE), &dataset.sample_metadata)?;
    check_shape(&path.join(FEATURE_METADATA_FILE), &dataset.feature_metadata)?;
    ensure_directory(path)?;
    write_table(&path.join(DATA_MATRIX_FILE), &dataset.data_matrix, format_number)?;
    write_table(
        &path.join(SAMPLE_METADATA_FILE),
        &dataset.sample_metadata,
        format_text,
    )?;
    write_table(
        &path.join(FEATURE_METADATA_FILE),
        &dataset.feature_metadata,
        format_text,
    )?;
    debug!(%path, "saved dataset");
    Ok(())
}

fn check_shape<T>(path: &Utf8Path, table: &Table<T>) -> Result<(), MirrorError> {
    let shape_error = |message: String| MirrorError::Csv {
        path: path.as_std_path().to_path_buf(),
        message,
    };
    if table.index.len() != table.rows.len() {
        return Err(shape_error(format!(
            "{} index labels but {} rows",
            table.index.len(),
            table.rows.len()
        )));
    }
    if let Some((row, cells)) = table
        .rows
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != table.columns.len())
    {
        return Err(shape_error(format!(
            "row {row} has {} cells for {} columns",
            cells.len(),
            table.columns.len()
        )));
    }
    Ok(())
}

fn read_table(path: &Utf8Path) -> Result<MetadataTable, MirrorError> {
    if !path.as_std_path().is_file() {
        return Err(MirrorError::DatasetFileMissing(path.as_std_path().to_path_buf()));
    }
    let csv_error = |err: csv::Error| MirrorError::Csv {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path.as_std_path())
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();
    let mut header_cells = headers.iter().map(str::to_string);
    let Some(index_name) = header_cells.next() else {
        return Err(MirrorError::Csv {
            path: path.as_std_path().to_path_buf(),
            message: "missing header row".to_string(),
        });
    };

    let mut table = Table {
        index_name,
        index: Vec::new(),
        columns: header_cells.collect(),
        rows: Vec::new(),
    };
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let mut cells = record.iter().map(str::to_string);
        table.index.push(cells.next().unwrap_or_default());
        table.rows.push(cells.collect());
    }
    Ok(table)
}

fn parse_matrix(path: &Utf8Path, raw: MetadataTable) -> Result<DataMatrix, MirrorError> {
    let mut rows = Vec::with_capacity(raw.rows.len());
    for (row, cells) in raw.rows.iter().enumerate() {
        let values = cells
            .iter()
            .zip(&raw.columns)
            .map(|(cell, column)| {
                parse_number(cell).ok_or_else(|| MirrorError::InvalidNumber {
                    path: path.as_std_path().to_path_buf(),
                    row,
                    column: column.clone(),
                    value: cell.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(values);
    }
    Ok(Table {
        index_name: raw.index_name,
        index: raw.index,
        columns: raw.columns,
        rows,
    })
}

fn write_table<T, F>(path: &Utf8Path, table: &Table<T>, format: F) -> Result<(), MirrorError>
where
    F: Fn(&T) -> Cow<'_, str>,
{
    let csv_error = |err: csv::Error| MirrorError::Csv {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    };

    let mut writer = Writer::from_path(path.as_std_path()).map_err(csv_error)?;
    let mut header = StringRecord::new();
    header.push_field(&table.index_name);
    for column in &table.columns {
        header.push_field(column);
    }
    writer.write_record(&header).map_err(csv_error)?;

    for (label, cells) in table.index.iter().zip(&table.rows) {
        let mut record = StringRecord::new();
        record.push_field(label);
        for cell in cells {
            record.push_field(&format(cell));
        }
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer.flush().map_err(|err| MirrorError::Csv {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    })
}

fn format_number(value: &f64) -> Cow<'_, str> {
    if value.is_nan() {
        Cow::Borrowed("")
    } else {
        Cow::Owned(value.to_string())
    }
}

fn format_text(value: &String) -> Cow<'_, str> {
    Cow::Borrowed(value)
}

fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Some(f64::NAN);
    }
    f64::from_str(trimmed).ok()
}
