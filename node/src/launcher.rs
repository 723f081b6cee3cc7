//! Starts K node instances on consecutive ports, registers each with the
//! coordinator, then parks until shutdown.

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

use rapid_crypto::generate_node_key;
use rapid_protocol::BootstrapResponse;
use rapid_types::{Digest, NodeIdentity, PublicKey};

use crate::client::{own_identity, BootstrapClient};
use crate::config::NodeLauncherConfig;
use crate::NodeError;

/// A registered instance and what bootstrap told it.
#[derive(Clone, Debug)]
pub struct LaunchedNode {
    pub index: usize,
    pub identity: NodeIdentity,
    pub reconfiguration_hash: Digest,
    pub committee_size: usize,
}

/// Register instance `index` and return its assignment.
pub async fn launch_node(config: &NodeLauncherConfig, index: usize) -> Result<LaunchedNode, NodeError> {
    let port = config.port_for(index)?;
    let key = generate_node_key();
    let public_key = key.public_key();
    let response = BootstrapClient::new(config.coordinator)
        .register(public_key, port)
        .await?;
    describe(index, port, &response, &public_key)
}

fn describe(
    index: usize,
    port: u16,
    response: &BootstrapResponse,
    public_key: &PublicKey,
) -> Result<LaunchedNode, NodeError> {
    let identity = own_identity(response, public_key, port)
        .cloned()
        .ok_or(NodeError::NotAssigned(port))?;
    let committee_size = response
        .reconfiguration
        .committees
        .get(&identity.committee_id)
        .map_or(0, |c| c.len());
    info!(
        index,
        node = %identity.address,
        committee = %identity.committee_id,
        honest = identity.honest,
        committee_size,
        "node bootstrapped"
    );
    Ok(LaunchedNode {
        index,
        identity,
        reconfiguration_hash: response.reconfiguration.hash,
        committee_size,
    })
}

/// Launch every configured instance, wait until all have bootstrapped, then
/// block on `shutdown`.
pub async fn launch_nodes(
    config: &NodeLauncherConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<Vec<LaunchedNode>, NodeError> {
    info!(
        instances = config.instances,
        coordinator = %config.coordinator,
        "launching nodes"
    );
    let mut tasks = JoinSet::new();
    for index in 0..config.instances {
        let config = config.clone();
        tasks.spawn(async move { launch_node(&config, index).await });
    }

    let mut launched = Vec::with_capacity(config.instances);
    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(res) => launched.push(res??),
                None => break,
            },
            _ = shutdown.recv() => {
                warn!(launched = launched.len(), "shutdown before every node bootstrapped");
                tasks.abort_all();
                launched.sort_by_key(|n| n.index);
                return Ok(launched);
            }
        }
    }
    launched.sort_by_key(|n| n.index);
    info!(instances = launched.len(), "all nodes bootstrapped, waiting for shutdown");

    let _ = shutdown.recv().await;
    Ok(launched)
}
