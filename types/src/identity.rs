//! Per-node identity as distributed in the bootstrap payload.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{Digest, PublicKey};

/// Everything the testbed knows about one node.
///
/// Created when the node registers, tagged once by committee assignment,
/// then frozen and broadcast to every node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub public_key: PublicKey,
    /// Observed source IP of the handshake combined with the advertised port.
    pub address: SocketAddr,
    pub committee_id: Digest,
    /// `false` marks the node as Byzantine for this experiment.
    pub honest: bool,
}

impl NodeIdentity {
    /// An identity that has registered but not yet been assigned.
    pub fn unassigned(public_key: PublicKey, address: SocketAddr) -> Self {
        Self {
            public_key,
            address,
            committee_id: Digest::ZERO,
            honest: true,
        }
    }
}
