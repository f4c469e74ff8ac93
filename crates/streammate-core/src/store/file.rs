//! Backing file codec.
//!
//! The file is a JSON array of records, indented with four spaces, with
//! non-ASCII text written as-is. Every write replaces the whole file through a
//! temporary sibling and a rename, so readers only ever see a complete list.
//!
//! Writers from different processes take an exclusive lock on a `.lock`
//! sibling first. The data file itself cannot carry the lock because each
//! write replaces it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::domain::Record;
use crate::error::StoreError;

pub(super) fn read_records(path: &Path) -> Result<Vec<Record>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn write_records(path: &Path, records: &[Record]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = encode(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = temp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(source));
    }
    Ok(())
}

/// Run `f` while holding the exclusive lock for `path`.
///
/// Blocks until every other holder (in this or another process) is done.
pub(super) fn with_file_lock<T>(
    path: &Path,
    f: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let lock_path = sibling(path, ".lock");
    let io_err = |source: io::Error| StoreError::Io {
        path: lock_path.clone(),
        source,
    };

    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(io_err)?;

    let mut lock = RwLock::new(file);
    let _guard = lock.write().map_err(io_err)?;
    f()
}

fn encode(records: &[Record]) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser).map_err(StoreError::Encode)?;
    Ok(buf)
}

fn temp_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history.json".into());
    name.push(suffix);
    path.with_file_name(name)
}
