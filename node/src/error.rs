use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("protocol error: {0}")]
    Protocol(#[from] rapid_protocol::ProtocolError),

    #[error("failed to reach coordinator at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("no entry for port {0} in the bootstrap payload")]
    NotAssigned(u16),

    #[error("config error: {0}")]
    Config(String),

    #[error("launch task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for NodeError {
    fn from(e: tokio::task::JoinError) -> Self {
        NodeError::Task(e.to_string())
    }
}
