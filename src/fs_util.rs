use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;

use crate::error::CollectorError;

/// Writes `content` to `path` through a temp file in the same directory, so a
/// reader never observes a half-written file. Missing parents are created.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CollectorError> {
    let parent = path
        .parent()
        .ok_or_else(|| CollectorError::Filesystem(format!("invalid destination path {path}")))?;
    let parent = if parent.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        parent
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CollectorError::Filesystem(format!("create {parent}: {err}")))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".kokkai-collector")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CollectorError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|err| CollectorError::Filesystem(format!("write {path}: {err}")))?;
    temp.persist(path.as_std_path())
        .map_err(|err| CollectorError::Filesystem(format!("persist {path}: {}", err.error)))?;
    Ok(())
}

/// Reads a file, mapping "not found" to `None`.
pub fn read_optional(path: &Utf8Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path.as_std_path()) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
