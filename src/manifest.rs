use camino::Utf8Path;

use crate::domain::SampleId;
use crate::error::MirrorError;

/// Reads the identifiers of `id_column` in file order. Every value must be a
/// safe file stem; the first unsafe one aborts the read.
pub fn read_identifiers(path: &Utf8Path, id_column: &str) -> Result<Vec<SampleId>, MirrorError> {
    let csv_error = |err: csv::Error| MirrorError::Csv {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    };

    let mut reader = csv::Reader::from_path(path.as_std_path()).map_err(csv_error)?;
    let column = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|header| header.trim() == id_column)
        .ok_or_else(|| MirrorError::ManifestColumn {
            path: path.as_std_path().to_path_buf(),
            column: id_column.to_string(),
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let value = record.get(column).unwrap_or("");
        ids.push(value.parse()?);
    }
    Ok(ids)
}
