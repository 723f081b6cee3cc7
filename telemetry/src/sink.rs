//! Durable append-only sinks for result lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::TelemetryError;

/// Destination for newline-terminated result lines.
///
/// Implementations must be safe to call from many connection handlers at
/// once; each call writes one complete line.
pub trait ResultSink: Send + Sync {
    fn append(&self, line: &str) -> Result<(), TelemetryError>;
}

/// Prefix a payload with the current unix time and terminate it.
pub fn prepare_line(payload: &str) -> String {
    format!("{},{}\n", rapid_utils::unix_now_secs(), payload)
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unbuffered file sink: every line is written and synced before returning.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| TelemetryError::CreateSink {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for FileSink {
    fn append(&self, line: &str) -> Result<(), TelemetryError> {
        let prepared = prepare_line(line);
        let mut file = lock(&self.file);
        file.write_all(prepared.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }
}

/// In-memory sink that keeps payloads (without the time prefix).
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }
}

impl ResultSink for MemorySink {
    fn append(&self, line: &str) -> Result<(), TelemetryError> {
        lock(&self.lines).push(line.to_string());
        Ok(())
    }
}
