//! Node public keys as carried on the wire.

use serde::{Deserialize, Serialize};

/// A 32-byte Ed25519 public key identifying a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
