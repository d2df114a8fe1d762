use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::aggregate::AggregateReport;
use crate::keys::{key_to_path, REPORT_KEY};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("blob key {0:?} does not map to a path inside the store")]
    InvalidKey(String),
}

/// Append-only structured record sink.
pub trait RecordSink {
    fn append(&mut self, record: &serde_json::Value) -> Result<(), PersistError>;
}

/// Key/blob store.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous blob. Returns where it landed.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, PersistError>;
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// One JSON document per line, opened in append mode for every record.
pub struct JsonlRecordSink {
    path: PathBuf,
}

impl JsonlRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonlRecordSink {
    fn append(&mut self, record: &serde_json::Value) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_output_dir(parent)?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

/// Blobs as files under a root directory, written via temp file + rename.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        let relative = key_to_path(key).ok_or_else(|| PersistError::InvalidKey(key.to_string()))?;
        let target = self.root.join(relative);
        let dir = target.parent().unwrap_or(&self.root);
        ensure_output_dir(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Rename does not replace an existing file on every platform.
        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Appends the report as one record and stores its formatted form under the report key.
pub fn publish_report(
    report: &AggregateReport,
    sink: &mut dyn RecordSink,
    blobs: &dyn BlobStore,
) -> Result<PathBuf, PersistError> {
    sink.append(&serde_json::to_value(report)?)?;
    let formatted = to_pretty_json(report)?;
    blobs.put(REPORT_KEY, formatted.as_bytes())
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, PersistError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}
