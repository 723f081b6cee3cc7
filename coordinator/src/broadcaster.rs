//! Bootstrap broadcast: one identical payload to every registered node.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use rapid_protocol::{encode, BootstrapResponse};

use crate::assigner::Assignment;
use crate::genesis::{genesis_randomness, genesis_state, reconfiguration_block};
use crate::registry::RegisteredNodes;
use crate::CoordinatorError;

pub struct BootstrapBroadcaster {
    users: usize,
    total_coins: u64,
}

impl BootstrapBroadcaster {
    pub fn new(users: usize, total_coins: u64) -> Self {
        Self { users, total_coins }
    }

    /// Assemble `{nodes, genesis, reconfiguration}` from the assignment.
    pub fn build_payload<R: Rng + ?Sized>(
        &self,
        assignment: &Assignment,
        rng: &mut R,
    ) -> Result<BootstrapResponse, CoordinatorError> {
        let randomness = genesis_randomness(rng);
        let reconfiguration = reconfiguration_block(assignment, randomness)?;
        let committee_ids: Vec<_> = assignment.committees.iter().map(|c| c.id).collect();
        let genesis = genesis_state(&committee_ids, self.users, self.total_coins, &randomness);
        info!(
            randomness = %randomness,
            reconfiguration = %reconfiguration.hash,
            accounts = self.users,
            "bootstrap payload built"
        );
        Ok(BootstrapResponse {
            nodes: assignment.nodes.clone(),
            genesis,
            reconfiguration,
        })
    }

    /// Send `payload` to every registered connection and wait until each
    /// handler has flushed it.
    ///
    /// Returns the number of nodes served.
    pub async fn broadcast(
        &self,
        payload: &BootstrapResponse,
        nodes: RegisteredNodes,
        timeout: Option<Duration>,
    ) -> Result<usize, CoordinatorError> {
        let body = Arc::new(encode(payload)?);
        let RegisteredNodes {
            registrations,
            mut handlers,
        } = nodes;
        let expected = registrations.len();
        for registration in registrations {
            registration.respond(Arc::clone(&body))?;
        }

        let barrier = async {
            let mut served = 0;
            while let Some(joined) = handlers.join_next().await {
                let addr = joined??;
                served += 1;
                debug!(node = %addr, served, expected, "bootstrap delivered");
            }
            Ok::<usize, CoordinatorError>(served)
        };
        let served = match timeout {
            Some(limit) => tokio::time::timeout(limit, barrier).await.map_err(|_| {
                CoordinatorError::BootstrapTimeout {
                    phase: "broadcast",
                    secs: limit.as_secs(),
                }
            })??,
            None => barrier.await?,
        };
        info!(nodes = served, bytes = body.len(), "bootstrap broadcast complete");
        Ok(served)
    }
}
