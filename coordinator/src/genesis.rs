//! Genesis construction: shared randomness, the reconfiguration block and
//! the initial ledger state.

use std::collections::BTreeMap;

use rand::{Rng, RngCore};

use rapid_crypto::{blake2b_256_multi, digest_of, hash_serialized};
use rapid_types::{
    Committee, CommitteeMember, Digest, GenesisAccount, GenesisBlock, GenesisState,
    ReconfigurationBlock,
};

use crate::assigner::Assignment;
use crate::CoordinatorError;

/// Digest of 32 fresh bytes drawn from `rng`.
pub fn genesis_randomness<R: Rng + ?Sized>(rng: &mut R) -> Digest {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    digest_of(&seed)
}

/// Build the reconfiguration block from a verified assignment.
pub fn reconfiguration_block(
    assignment: &Assignment,
    randomness: Digest,
) -> Result<ReconfigurationBlock, CoordinatorError> {
    let mut committees = BTreeMap::new();
    for summary in &assignment.committees {
        let mut committee = Committee::new(summary.id, summary.target);
        for node in assignment.members_of(&summary.id) {
            committee.add_member(CommitteeMember {
                public_key: node.public_key,
                address: node.address,
            });
        }
        committees.insert(summary.id, committee);
    }
    let hash = hash_serialized(&(&committees, &randomness))
        .map_err(|e| CoordinatorError::InvariantViolation(format!("reconfiguration digest: {e}")))?;
    Ok(ReconfigurationBlock {
        committees,
        randomness,
        hash,
    })
}

/// Credit `users` synthetic accounts with an even split of `total_coins`
/// and home each one in a committee by its id.
///
/// The first user also receives the division remainder, so the state always
/// holds exactly `total_coins` when `users > 0`.
pub fn genesis_state(
    committee_ids: &[Digest],
    users: usize,
    total_coins: u64,
    randomness: &Digest,
) -> GenesisState {
    let mut blocks: Vec<GenesisBlock> = committee_ids
        .iter()
        .map(|id| GenesisBlock {
            committee_id: *id,
            accounts: Vec::new(),
        })
        .collect();
    if users == 0 || blocks.is_empty() {
        return GenesisState { blocks };
    }

    let share = total_coins / users as u64;
    let remainder = total_coins % users as u64;
    for index in 0..users {
        let owner = Digest::new(blake2b_256_multi(&[
            randomness.as_bytes(),
            &(index as u64).to_le_bytes(),
        ]));
        let amount = if index == 0 { share + remainder } else { share };
        let home = (owner.prefix_u64() % blocks.len() as u64) as usize;
        blocks[home].accounts.push(GenesisAccount { owner, amount });
    }
    GenesisState { blocks }
}
