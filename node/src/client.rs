//! Node side of the bootstrap handshake.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::debug;

use rapid_protocol::{read_frame, write_frame, BootstrapResponse, HandshakeMsg};
use rapid_types::{NodeIdentity, PublicKey};

use crate::NodeError;

pub struct BootstrapClient {
    coordinator: SocketAddr,
}

impl BootstrapClient {
    pub fn new(coordinator: SocketAddr) -> Self {
        Self { coordinator }
    }

    /// Send `{public_key, port}` and wait for the bootstrap payload.
    ///
    /// The coordinator only answers once every node has registered, so this
    /// can block for as long as the slowest node takes to connect.
    pub async fn register(
        &self,
        public_key: PublicKey,
        port: u16,
    ) -> Result<BootstrapResponse, NodeError> {
        let mut stream = TcpStream::connect(self.coordinator)
            .await
            .map_err(|source| NodeError::Connect {
                addr: self.coordinator,
                source,
            })?;
        write_frame(&mut stream, &HandshakeMsg { public_key, port }).await?;
        debug!(coordinator = %self.coordinator, port, "handshake sent");
        Ok(read_frame(&mut stream).await?)
    }
}

/// This node's entry in the payload, matched on key and advertised port.
pub fn own_identity<'a>(
    response: &'a BootstrapResponse,
    public_key: &PublicKey,
    port: u16,
) -> Option<&'a NodeIdentity> {
    response
        .nodes
        .iter()
        .find(|n| n.public_key == *public_key && n.address.port() == port)
}
