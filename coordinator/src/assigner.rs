//! Committee assignment: partitions the registered nodes into M committees
//! and flags a bounded number of members per committee as adversarial.

use std::collections::HashMap;
use std::net::SocketAddr;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use rapid_crypto::digest_of;
use rapid_types::{Digest, NodeIdentity, PublicKey};

use crate::config::CoordinatorConfig;
use crate::CoordinatorError;

/// Adversary count for a committee of `size` members tolerating 1/`divisor`.
///
/// `floor(size / divisor)`, minus one when `divisor` divides `size` exactly so
/// the committee never sits on the tolerance boundary.
pub fn adversaries_for(size: usize, divisor: usize) -> usize {
    let f = size / divisor;
    if f > 0 && size % divisor == 0 {
        f - 1
    } else {
        f
    }
}

/// Per-committee tally recomputed from the tagged node list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitteeSummary {
    pub id: Digest,
    pub size: usize,
    pub adversaries: usize,
    /// The adversary count the committee was built for.
    pub target: usize,
    pub divisor: usize,
}

/// Output of one assignment pass.
#[derive(Clone, Debug)]
pub struct Assignment {
    /// Every node, in shuffled order, tagged with committee and honesty.
    pub nodes: Vec<NodeIdentity>,
    /// Committees in index order.
    pub committees: Vec<CommitteeSummary>,
}

impl Assignment {
    pub fn total_adversaries(&self) -> usize {
        self.committees.iter().map(|c| c.adversaries).sum()
    }

    pub fn adversary_fraction(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.total_adversaries() as f64 / self.nodes.len() as f64
    }

    /// Members of one committee in intra-committee order.
    pub fn members_of<'a>(&'a self, id: &'a Digest) -> impl Iterator<Item = &'a NodeIdentity> + 'a {
        self.nodes.iter().filter(move |n| n.committee_id == *id)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommitteeAssigner {
    committees: usize,
    total_adversary_divisor: usize,
    committee_adversary_divisor: usize,
    /// Divisor of odd-indexed committees.
    tight_divisor: usize,
}

impl CommitteeAssigner {
    pub fn new(
        committees: usize,
        total_adversary_divisor: usize,
        committee_adversary_divisor: usize,
    ) -> Result<Self, CoordinatorError> {
        if committees == 0 {
            return Err(CoordinatorError::InvalidParameters(
                "committee count must be positive".into(),
            ));
        }
        if total_adversary_divisor == 0 || committee_adversary_divisor == 0 {
            return Err(CoordinatorError::InvalidParameters(
                "adversary divisors must be positive".into(),
            ));
        }
        let tight_divisor = committee_adversary_divisor
            .checked_mul(total_adversary_divisor)
            .ok_or_else(|| {
                CoordinatorError::InvalidParameters(format!(
                    "adversary divisors {committee_adversary_divisor} x {total_adversary_divisor} overflow"
                ))
            })?;
        Ok(Self {
            committees,
            total_adversary_divisor,
            committee_adversary_divisor,
            tight_divisor,
        })
    }

    pub fn from_config(config: &CoordinatorConfig) -> Result<Self, CoordinatorError> {
        Self::new(
            config.committees,
            config.total_adversary_divisor,
            config.committee_adversary_divisor,
        )
    }

    /// Divisor for the committee at `index`: even indices tolerate
    /// 1/`committee_adversary_divisor`, odd indices a tighter fraction.
    pub fn divisor_for(&self, index: usize) -> usize {
        if index % 2 == 0 {
            self.committee_adversary_divisor
        } else {
            self.tight_divisor
        }
    }

    /// Shuffle, draw committee ids, split into contiguous blocks and tag.
    ///
    /// Registration order has no influence on the result: the input is
    /// sorted before the seeded shuffle.
    ///
    /// The result has already passed [`verify`](Self::verify).
    pub fn assign<R: Rng + ?Sized>(
        &self,
        registered: Vec<(PublicKey, SocketAddr)>,
        rng: &mut R,
    ) -> Result<Assignment, CoordinatorError> {
        let n = registered.len();
        let m = self.committees;
        if n < m {
            return Err(CoordinatorError::InvalidParameters(format!(
                "{n} nodes cannot fill {m} committees"
            )));
        }

        let mut nodes: Vec<NodeIdentity> = registered
            .into_iter()
            .map(|(pk, addr)| NodeIdentity::unassigned(pk, addr))
            .collect();
        // Canonical order first, so the seed alone decides the shuffle.
        nodes.sort_by(|a, b| {
            a.public_key
                .0
                .cmp(&b.public_key.0)
                .then_with(|| a.address.cmp(&b.address))
        });
        nodes.shuffle(rng);

        let ids = draw_committee_ids(m, rng);
        let npm = n / m;
        let rest = n % m;

        let mut targets = Vec::with_capacity(m);
        for index in 0..m {
            let size = if index == m - 1 { npm + rest } else { npm };
            let divisor = self.divisor_for(index);
            targets.push((divisor, adversaries_for(size, divisor)));
        }

        for (i, node) in nodes.iter_mut().enumerate() {
            let index = (i / npm).min(m - 1);
            let position = i - index * npm;
            node.committee_id = ids[index];
            node.honest = position >= targets[index].1;
        }

        let committees = ids
            .iter()
            .zip(&targets)
            .map(|(id, &(divisor, target))| CommitteeSummary {
                id: *id,
                size: 0,
                adversaries: 0,
                target,
                divisor,
            })
            .collect();
        let mut assignment = Assignment { nodes, committees };
        self.verify(&mut assignment)?;
        Ok(assignment)
    }

    /// Recompute sizes and adversary counts from the tagged nodes and check
    /// the partition and tolerance bounds. Overwrites the tallies in place.
    pub fn verify(&self, assignment: &mut Assignment) -> Result<(), CoordinatorError> {
        let n = assignment.nodes.len();
        let m = self.committees;
        if assignment.committees.len() != m {
            return Err(CoordinatorError::InvariantViolation(format!(
                "expected {m} committees, found {}",
                assignment.committees.len()
            )));
        }

        let mut tally: HashMap<Digest, (usize, usize)> = assignment
            .committees
            .iter()
            .map(|c| (c.id, (0, 0)))
            .collect();
        if tally.len() != m {
            return Err(CoordinatorError::InvariantViolation(
                "committee ids are not distinct".into(),
            ));
        }
        for node in &assignment.nodes {
            let entry = tally.get_mut(&node.committee_id).ok_or_else(|| {
                CoordinatorError::InvariantViolation(format!(
                    "node {} tagged with unknown committee {}",
                    node.address, node.committee_id
                ))
            })?;
            entry.0 += 1;
            if !node.honest {
                entry.1 += 1;
            }
        }

        let npm = n / m;
        let mut oversized = 0;
        for committee in assignment.committees.iter_mut() {
            let (size, adversaries) = tally[&committee.id];
            committee.size = size;
            committee.adversaries = adversaries;

            if size != npm {
                oversized += 1;
                if size != npm + n % m || oversized > 1 {
                    return Err(CoordinatorError::InvariantViolation(format!(
                        "committee {} has {size} members, expected {npm}",
                        committee.id
                    )));
                }
            }
            let ceiling = size.div_ceil(self.committee_adversary_divisor);
            if adversaries >= ceiling.max(1) {
                return Err(CoordinatorError::InvariantViolation(format!(
                    "committee {} has {adversaries} adversaries, bound is < {ceiling}",
                    committee.id
                )));
            }
            debug!(
                committee = %committee.id,
                size,
                adversaries,
                divisor = committee.divisor,
                "committee verified"
            );
        }

        let total = assignment.total_adversaries();
        if total.saturating_mul(self.total_adversary_divisor) >= n {
            if m % 2 == 0 && npm > 1 {
                return Err(CoordinatorError::InvariantViolation(format!(
                    "{total} of {n} nodes adversarial, bound is < 1/{}",
                    self.total_adversary_divisor
                )));
            }
            warn!(
                adversaries = total,
                nodes = n,
                fraction = assignment.adversary_fraction(),
                "aggregate adversary fraction above target"
            );
        }

        info!(
            nodes = n,
            committees = m,
            adversaries = total,
            fraction = assignment.adversary_fraction(),
            "committee assignment verified"
        );
        Ok(())
    }
}

/// Draw `m` distinct committee ids as digests of RNG output.
fn draw_committee_ids<R: Rng + ?Sized>(m: usize, rng: &mut R) -> Vec<Digest> {
    let mut ids: Vec<Digest> = Vec::with_capacity(m);
    while ids.len() < m {
        let id = digest_of(&rng.gen::<u64>().to_le_bytes());
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}
