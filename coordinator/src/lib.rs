//! Bootstrap and measurement coordinator for the sharded ledger testbed.
//!
//! A run has two phases. Bootstrap is a one-shot pipeline:
//! [`NodeRegistry`] collects N handshakes, [`CommitteeAssigner`] partitions
//! the nodes into adversary-bounded committees, and [`BootstrapBroadcaster`]
//! sends every node the same genesis payload. After that the
//! [`DebugDispatcher`] accepts one connection per telemetry event and feeds
//! the aggregator until shutdown.

pub mod assigner;
pub mod broadcaster;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod genesis;
pub mod metrics;
pub mod registry;

pub use assigner::{adversaries_for, Assignment, CommitteeAssigner, CommitteeSummary};
pub use broadcaster::BootstrapBroadcaster;
pub use config::CoordinatorConfig;
pub use coordinator::{BootstrapOutcome, Coordinator};
pub use dispatcher::DebugDispatcher;
pub use error::CoordinatorError;
pub use generator::{consume_final_blocks, final_block_line};
pub use genesis::{genesis_randomness, genesis_state, reconfiguration_block};
pub use metrics::CoordinatorMetrics;
pub use registry::{NodeRegistry, RegisteredNodes, Registration};
