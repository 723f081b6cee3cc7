//! Consumer side of the final-block channel.
//!
//! Stands in for the transaction generator: every finalized block is logged
//! and recorded as `committee,height,txcount` in the `tx` result stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use rapid_telemetry::{ResultSinks, ResultStream};
use rapid_types::FinalBlock;

use crate::metrics::CoordinatorMetrics;
use crate::CoordinatorError;

pub fn final_block_line(block: &FinalBlock) -> String {
    format!(
        "{},{},{}",
        block.committee_id,
        block.height,
        block.transactions.len()
    )
}

/// Drain `blocks` until every sender is gone. Returns the number consumed.
pub async fn consume_final_blocks(
    mut blocks: mpsc::Receiver<FinalBlock>,
    sinks: ResultSinks,
    metrics: Arc<CoordinatorMetrics>,
) -> Result<u64, CoordinatorError> {
    let mut consumed = 0;
    while let Some(block) = blocks.recv().await {
        info!(
            committee = %block.committee_id,
            height = block.height,
            transactions = block.transactions.len(),
            "final block"
        );
        sinks
            .append(ResultStream::Tx, &final_block_line(&block))
            .await?;
        metrics.record_flush(ResultStream::Tx.as_str());
        consumed += 1;
    }
    Ok(consumed)
}
