//! Finalized ledger blocks reported by committees.

use serde::{Deserialize, Serialize};

use crate::Digest;

/// A block finalized by a committee's consensus.
///
/// The coordinator never inspects transactions; it only forwards the block
/// to the transaction generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBlock {
    pub committee_id: Digest,
    pub height: u64,
    /// Ids of the transactions included in the block.
    pub transactions: Vec<Digest>,
}
