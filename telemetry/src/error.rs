use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to create result file {path}: {source}")]
    CreateSink {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("result writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}
