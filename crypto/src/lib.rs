//! Cryptographic helpers for the testbed.
//!
//! - **Blake2b-256** content digests for ids used as map keys
//! - **Ed25519** node identity keys sent in the bootstrap handshake

pub mod hash;
pub mod keys;

pub use hash::{blake2b_256, blake2b_256_multi, digest_of, hash_serialized};
pub use keys::{generate_node_key, node_key_from_seed, NodeKey};
