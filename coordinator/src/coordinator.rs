//! Run orchestration: registry, assignment and broadcast once, then the
//! telemetry listener until shutdown or the first fatal error.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use rapid_protocol::BootstrapResponse;
use rapid_telemetry::{ResultSinks, TelemetryAggregator};
use rapid_utils::{unix_now_nanos, unix_now_secs};

use crate::assigner::CommitteeAssigner;
use crate::broadcaster::BootstrapBroadcaster;
use crate::config::CoordinatorConfig;
use crate::dispatcher::DebugDispatcher;
use crate::generator::consume_final_blocks;
use crate::metrics::CoordinatorMetrics;
use crate::registry::NodeRegistry;
use crate::CoordinatorError;

/// What bootstrap distributed, for logging and tests.
#[derive(Clone, Debug)]
pub struct BootstrapOutcome {
    pub seed: u64,
    pub payload: BootstrapResponse,
}

pub struct Coordinator {
    config: CoordinatorConfig,
    metrics: Arc<CoordinatorMetrics>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoordinatorError> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: Arc::new(CoordinatorMetrics::new()?),
        })
    }

    pub fn metrics(&self) -> &Arc<CoordinatorMetrics> {
        &self.metrics
    }

    /// Bind the coordination port on all interfaces.
    pub async fn bind(&self) -> Result<TcpListener, CoordinatorError> {
        let addr = format!("0.0.0.0:{}", self.config.listen_port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| CoordinatorError::Bind { addr, source })?;
        info!(port = self.config.listen_port, "coordinator listening");
        Ok(listener)
    }

    /// Create the result files, bind, and run until shutdown.
    pub async fn run(
        &self,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<BootstrapOutcome, CoordinatorError> {
        let sinks = ResultSinks::create_files(&self.config.results_dir, unix_now_secs())?;
        let listener = self.bind().await?;
        self.run_with(listener, sinks, shutdown).await
    }

    /// Bootstrap on `listener`, then serve telemetry on it into `sinks`.
    pub async fn run_with(
        &self,
        listener: TcpListener,
        sinks: ResultSinks,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<BootstrapOutcome, CoordinatorError> {
        let outcome = tokio::select! {
            res = self.bootstrap(&listener) => res?,
            _ = shutdown.recv() => {
                warn!("shutdown requested before bootstrap completed");
                return Err(CoordinatorError::Interrupted("bootstrap"));
            }
        };
        self.serve(listener, sinks, shutdown).await?;
        Ok(outcome)
    }

    /// Registration, committee assignment and broadcast, in that order.
    pub async fn bootstrap(
        &self,
        listener: &TcpListener,
    ) -> Result<BootstrapOutcome, CoordinatorError> {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(unix_now_nanos);
        info!(
            seed,
            nodes = config.nodes,
            committees = config.committees,
            block_size = config.block_size,
            tps = config.tps,
            delta_ms = config.delta_ms,
            base_port = config.base_port,
            "bootstrap starting"
        );
        let mut rng = StdRng::seed_from_u64(seed);
        let timeout = config.bootstrap_timeout();

        let nodes = NodeRegistry::new(config.nodes)
            .register_all(listener, timeout)
            .await?;
        self.metrics.registered_nodes.set(nodes.len() as i64);
        info!(nodes = nodes.len(), "all nodes registered");

        let assignment = CommitteeAssigner::from_config(config)?.assign(nodes.identities(), &mut rng)?;
        for (index, committee) in assignment.committees.iter().enumerate() {
            info!(
                index,
                committee = %committee.id,
                size = committee.size,
                adversaries = committee.adversaries,
                "committee formed"
            );
        }

        let broadcaster = BootstrapBroadcaster::new(config.users, config.total_coins);
        let payload = broadcaster.build_payload(&assignment, &mut rng)?;
        broadcaster.broadcast(&payload, nodes, timeout).await?;
        Ok(BootstrapOutcome { seed, payload })
    }

    /// Telemetry phase: dispatcher plus the final-block consumer.
    pub async fn serve(
        &self,
        listener: TcpListener,
        sinks: ResultSinks,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), CoordinatorError> {
        let aggregator = Arc::new(TelemetryAggregator::new(
            sinks.clone(),
            self.config.settle_delay(),
        ));
        let (blocks_tx, blocks_rx) = mpsc::channel(self.config.final_block_capacity());
        let mut consumer = tokio::spawn(consume_final_blocks(
            blocks_rx,
            sinks,
            Arc::clone(&self.metrics),
        ));
        let dispatcher = Arc::new(DebugDispatcher::new(
            aggregator,
            blocks_tx,
            Arc::clone(&self.metrics),
        ));

        let result = tokio::select! {
            res = dispatcher.run(listener, shutdown) => res,
            joined = &mut consumer => {
                // The consumer only returns early on a sink error.
                return match joined? {
                    Ok(_) => Err(CoordinatorError::ChannelClosed("final blocks")),
                    Err(e) => Err(e),
                };
            }
        };
        consumer.abort();
        result
    }
}
