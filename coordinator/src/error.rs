use thiserror::Error;

/// Every error here is fatal to the run.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("protocol error: {0}")]
    Protocol(#[from] rapid_protocol::ProtocolError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] rapid_telemetry::TelemetryError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("committee invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{phase} did not complete within {secs}s")]
    BootstrapTimeout { phase: &'static str, secs: u64 },

    #[error("interrupted during {0}")]
    Interrupted(&'static str),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("handler task failed: {0}")]
    Task(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for CoordinatorError {
    fn from(e: tokio::task::JoinError) -> Self {
        CoordinatorError::Task(e.to_string())
    }
}
