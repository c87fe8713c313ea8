//! JSON document file record store.
//!
//! # Responsibility
//! - Persist one record table as a single JSON document on disk.
//! - Replace the document atomically via temp file + rename.
//!
//! # Invariants
//! - A missing or zero-length file loads as an empty table.
//! - A file that does not parse is reported, never silently reset.
//! - Revision checks assume one writing process per file.

use crate::repo::record_store::{RecordStore, RecordTable, RepoError, RepoResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredDocument {
    revision: u64,
    #[serde(flatten)]
    table: RecordTable,
}

/// File-backed record store holding one table.
pub struct JsonFileRecordStore {
    path: PathBuf,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> RepoResult<Option<StoredDocument>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RepoError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let document: StoredDocument = serde_json::from_str(&raw).map_err(|err| {
            RepoError::InvalidData(format!(
                "failed to parse record file `{}`: {err}",
                self.path.display()
            ))
        })?;
        let table = RecordTable::from_rows(
            document.table.columns().to_vec(),
            document.table.rows().to_vec(),
        )?;
        Ok(Some(StoredDocument {
            revision: document.revision,
            table,
        }))
    }

    fn write_document(&self, table: &RecordTable, expected: Option<u64>) -> RepoResult<u64> {
        let started_at = Instant::now();
        let actual = self.revision()?;
        if let Some(expected) = expected {
            if expected != actual {
                warn!(
                    "event=store_save module=repo status=error backend=file error_code=stale_revision expected={} actual={}",
                    expected, actual
                );
                return Err(RepoError::StaleRevision { expected, actual });
            }
        }

        let document = StoredDocument {
            revision: actual + 1,
            table: table.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document).map_err(|err| {
            RepoError::InvalidData(format!("failed to encode record table: {err}"))
        })?;
        write_atomic(&self.path, &bytes)?;

        info!(
            "event=store_save module=repo status=ok backend=file rows={} revision={} duration_ms={}",
            table.len(),
            document.revision,
            started_at.elapsed().as_millis()
        );
        Ok(document.revision)
    }
}

impl RecordStore for JsonFileRecordStore {
    fn load(&self, schema: &[&str]) -> RepoResult<RecordTable> {
        let table = match self.read_document()? {
            Some(document) => document.table.conform(schema),
            None => RecordTable::empty(schema),
        };
        info!(
            "event=store_load module=repo status=ok backend=file rows={}",
            table.len()
        );
        Ok(table)
    }

    fn revision(&self) -> RepoResult<u64> {
        Ok(self
            .read_document()?
            .map_or(0, |document| document.revision))
    }

    fn save(&self, table: &RecordTable) -> RepoResult<u64> {
        self.write_document(table, None)
    }

    fn save_if_revision(&self, table: &RecordTable, expected: u64) -> RepoResult<u64> {
        self.write_document(table, Some(expected))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> RepoResult<()> {
    let io_error = |source: std::io::Error| RepoError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(io_error)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            RepoError::InvalidData(format!("invalid record file path `{}`", path.display()))
        })?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{file_name}.{}.{nanos}.tmp", std::process::id()));

    let written = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();
    if let Err(source) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error(source));
    }

    if let Ok(dir) = fs::File::open(&parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}
