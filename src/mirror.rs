use std::fs;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::MirrorError;

/// Creates `path` and its parents if absent. Returns `true` when something was
/// created; an existing directory is left untouched.
pub fn ensure_directory(path: &Utf8Path) -> Result<bool, MirrorError> {
    if path.as_std_path().is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| MirrorError::Filesystem(format!("create {path}: {err}")))?;
    Ok(true)
}

/// Local directory tree holding a subset of the remote files.
#[derive(Debug, Clone)]
pub struct Mirror {
    root: Utf8PathBuf,
}

impl Mirror {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path_of(&self, file_name: &str) -> Utf8PathBuf {
        self.root.join(file_name)
    }

    /// Presence is the only synchronization signal; contents are not checked.
    pub fn contains(&self, file_name: &str) -> bool {
        self.path_of(file_name).as_std_path().exists()
    }

    /// Runs `write` against a temporary file next to the destination and
    /// renames it into place only if `write` succeeds.
    pub fn write_atomic<F>(&self, file_name: &str, write: F) -> Result<u64, MirrorError>
    where
        F: FnOnce(&mut dyn Write) -> Result<u64, MirrorError>,
    {
        let dest = self.path_of(file_name);
        let temp = Builder::new()
            .prefix(".mtbls-mirror")
            .suffix(".part")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| MirrorError::Filesystem(format!("temp file in {}: {err}", self.root)))?;

        let written = {
            let mut writer = BufWriter::new(temp.as_file());
            let written = write(&mut writer)?;
            writer
                .flush()
                .map_err(|err| MirrorError::Filesystem(format!("write {dest}: {err}")))?;
            written
        };

        temp.persist(dest.as_std_path())
            .map_err(|err| MirrorError::Filesystem(format!("persist {dest}: {}", err.error)))?;
        Ok(written)
    }
}
