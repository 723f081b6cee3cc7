//! Bootstrap handshake messages.

use rapid_types::{GenesisState, NodeIdentity, PublicKey, ReconfigurationBlock};
use serde::{Deserialize, Serialize};

/// First message a node sends to the coordinator.
///
/// Nodes do not report their own IP; the coordinator combines the
/// connection's observed source IP with `port`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMsg {
    pub public_key: PublicKey,
    pub port: u16,
}

/// The identical payload the coordinator returns to every registered node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub nodes: Vec<NodeIdentity>,
    pub genesis: GenesisState,
    pub reconfiguration: ReconfigurationBlock,
}
