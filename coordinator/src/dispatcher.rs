//! Telemetry listener: one connection per event, decoded and routed to the
//! aggregator, the final-block channel or the metrics hooks.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use rapid_protocol::{read_frame, Envelope, TelemetryMessage};
use rapid_telemetry::{ResultStream, TelemetryAggregator};
use rapid_types::FinalBlock;

use crate::metrics::CoordinatorMetrics;
use crate::CoordinatorError;

/// Extra time, beyond the settle delay, that in-flight handlers get on shutdown.
pub const DRAIN_GRACE: Duration = Duration::from_secs(1);

pub struct DebugDispatcher {
    aggregator: Arc<TelemetryAggregator>,
    final_blocks: mpsc::Sender<FinalBlock>,
    metrics: Arc<CoordinatorMetrics>,
}

impl DebugDispatcher {
    pub fn new(
        aggregator: Arc<TelemetryAggregator>,
        final_blocks: mpsc::Sender<FinalBlock>,
        metrics: Arc<CoordinatorMetrics>,
    ) -> Self {
        Self {
            aggregator,
            final_blocks,
            metrics,
        }
    }

    /// Accept telemetry connections until shutdown or the first fatal error.
    ///
    /// On shutdown, handlers still waiting out the settle delay get that
    /// delay plus [`DRAIN_GRACE`] to flush before they are aborted.
    pub async fn run(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), CoordinatorError> {
        let mut handlers: JoinSet<Result<(), CoordinatorError>> = JoinSet::new();
        info!(addr = ?listener.local_addr().ok(), "telemetry listener started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!(in_flight = handlers.len(), "telemetry listener shutting down");
                    drop(listener);
                    return self.drain(handlers).await;
                }
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(err) = joined? {
                        error!(error = %err, "fatal telemetry error");
                        return Err(err);
                    }
                }
                result = listener.accept() => {
                    let (stream, peer) = result?;
                    let this = Arc::clone(&self);
                    handlers.spawn(async move {
                        let result = this.handle_connection(stream).await;
                        if let Err(e) = &result {
                            error!(%peer, error = %e, "telemetry connection failed");
                        }
                        result
                    });
                }
            }
        }
    }

    async fn drain(
        &self,
        mut handlers: JoinSet<Result<(), CoordinatorError>>,
    ) -> Result<(), CoordinatorError> {
        let grace = self.aggregator.settle() + DRAIN_GRACE;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = handlers.join_next().await {
                joined??;
            }
            Ok::<(), CoordinatorError>(())
        })
        .await;
        match drained {
            Ok(result) => result,
            Err(_) => {
                warn!(abandoned = handlers.len(), "telemetry handlers still running after drain");
                Ok(())
            }
        }
    }

    /// Read one envelope from `stream`, close it, then dispatch.
    pub async fn handle_connection(&self, mut stream: TcpStream) -> Result<(), CoordinatorError> {
        let envelope: Envelope = read_frame(&mut stream).await?;
        drop(stream);
        let message = TelemetryMessage::from_envelope(&envelope)?;
        debug!(kind = message.kind(), bytes = envelope.payload.len(), "telemetry received");
        self.dispatch(message).await
    }

    pub async fn dispatch(&self, message: TelemetryMessage) -> Result<(), CoordinatorError> {
        let kind = message.kind();
        self.metrics.record_message(kind);
        let agg = &self.aggregator;

        match message {
            TelemetryMessage::IdaSuccess(root) => {
                debug!(%root, "IDA success");
                self.metrics.ida_successes.inc();
            }
            TelemetryMessage::Consensus(tag) => {
                self.metrics.record_consensus_tag(&tag);
            }
            TelemetryMessage::FinalBlock(block) => {
                self.final_blocks
                    .send(block)
                    .await
                    .map_err(|_| CoordinatorError::ChannelClosed("final blocks"))?;
            }
            TelemetryMessage::PocVerify(elapsed) => {
                agg.poc_duration(ResultStream::PocVerify, elapsed).await?;
                self.metrics.record_flush(ResultStream::PocVerify.as_str());
            }
            TelemetryMessage::PocAdd(elapsed) => {
                agg.poc_duration(ResultStream::PocAdd, elapsed).await?;
                self.metrics.record_flush(ResultStream::PocAdd.as_str());
            }
            TelemetryMessage::RouteTx(ev) => {
                agg.route_started(ev);
            }
            TelemetryMessage::FindNode(hop) => {
                agg.route_hop(hop);
            }
            TelemetryMessage::TransactionReceived(ev) => {
                if agg.route_ended(ev).await? {
                    self.metrics.record_flush(ResultStream::Routing.as_str());
                }
            }
            TelemetryMessage::StartIdaGossip(ev) => {
                agg.ida_started(ev);
            }
            TelemetryMessage::ReconstructedIdaGossip(ev) => {
                if agg.ida_reconstructed(ev).await? {
                    self.metrics.record_flush(ResultStream::Ida.as_str());
                }
            }
            TelemetryMessage::ConsensusAcceptFail { report, timestamp } => {
                debug!(reported_at = timestamp.unix_secs(), "accept/fail report");
                agg.accept_fail(&report).await?;
                self.metrics
                    .record_flush(ResultStream::ConsensusAcceptFail.as_str());
            }
        }
        Ok(())
    }
}
