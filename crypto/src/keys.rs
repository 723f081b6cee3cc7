//! Ed25519 node identity keys.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rapid_types::{Digest, PublicKey};

use crate::hash::digest_of;

/// A node's long-lived identity key.
pub struct NodeKey {
    signing: SigningKey,
}

impl NodeKey {
    /// Public half, as sent in the bootstrap handshake.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    /// Digest of the public key, used to name the node in telemetry.
    pub fn key_id(&self) -> Digest {
        digest_of(self.signing.verifying_key().as_bytes())
    }
}

/// Generate a new node key from a secure random source.
pub fn generate_node_key() -> NodeKey {
    NodeKey {
        signing: SigningKey::generate(&mut OsRng),
    }
}

/// Derive a node key from a 32-byte seed (deterministic).
pub fn node_key_from_seed(seed: &[u8; 32]) -> NodeKey {
    NodeKey {
        signing: SigningKey::from_bytes(seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_distinct_keys() {
        let a = generate_node_key();
        let b = generate_node_key();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn seeded_key_is_deterministic() {
        let a = node_key_from_seed(&[42u8; 32]);
        let b = node_key_from_seed(&[42u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.key_id(), b.key_id());
    }

    #[test]
    fn key_id_is_digest_of_public_key() {
        let key = node_key_from_seed(&[7u8; 32]);
        assert_eq!(key.key_id(), digest_of(key.public_key().as_bytes()));
    }
}
