//! Genesis ledger state handed to every node at bootstrap.

use serde::{Deserialize, Serialize};

use crate::Digest;

/// An initial balance owned by a synthetic user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub owner: Digest,
    pub amount: u64,
}

/// The genesis block of one committee's shard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBlock {
    pub committee_id: Digest,
    pub accounts: Vec<GenesisAccount>,
}

impl GenesisBlock {
    pub fn total_coins(&self) -> u64 {
        self.accounts.iter().map(|a| a.amount).sum()
    }
}

/// Initial ledger: one genesis block per committee, in committee order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub blocks: Vec<GenesisBlock>,
}

impl GenesisState {
    pub fn total_coins(&self) -> u64 {
        self.blocks.iter().map(GenesisBlock::total_coins).sum()
    }

    pub fn block_for(&self, committee_id: &Digest) -> Option<&GenesisBlock> {
        self.blocks.iter().find(|b| b.committee_id == *committee_id)
    }
}
