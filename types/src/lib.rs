//! Fundamental types for the sharded ledger testbed.
//!
//! Digests, node identities, committees and the genesis/reconfiguration
//! state that the coordinator hands to every node at bootstrap.

pub mod block;
pub mod committee;
pub mod genesis;
pub mod hash;
pub mod identity;
pub mod keys;
pub mod time;

pub use block::FinalBlock;
pub use committee::{Committee, CommitteeMember, ReconfigurationBlock};
pub use genesis::{GenesisAccount, GenesisBlock, GenesisState};
pub use hash::Digest;
pub use identity::NodeIdentity;
pub use keys::PublicKey;
pub use time::Timestamp;
