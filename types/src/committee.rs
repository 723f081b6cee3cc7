//! Committees and the reconfiguration (genesis membership) block.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::{Digest, PublicKey};

/// A committee member as listed in the reconfiguration block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMember {
    pub public_key: PublicKey,
    pub address: SocketAddr,
}

/// A fixed-membership shard of nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    pub id: Digest,
    /// Members in intra-committee order.
    pub members: Vec<CommitteeMember>,
    /// Number of adversarial members this committee was built to tolerate.
    pub adversary_bound: usize,
}

impl Committee {
    pub fn new(id: Digest, adversary_bound: usize) -> Self {
        Self {
            id,
            members: Vec::new(),
            adversary_bound,
        }
    }

    pub fn add_member(&mut self, member: CommitteeMember) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Genesis descriptor of committee membership and shared randomness.
///
/// `committees` is ordered by id so the content digest is reproducible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconfigurationBlock {
    pub committees: BTreeMap<Digest, Committee>,
    pub randomness: Digest,
    /// Digest over `committees` and `randomness`.
    pub hash: Digest,
}
