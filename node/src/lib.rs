//! Node-side counterpart of the testbed coordinator.
//!
//! Nodes register through [`BootstrapClient`], receive the shared genesis
//! payload, and report telemetry through [`TelemetryReporter`]. The consensus
//! protocol itself runs elsewhere.

pub mod client;
pub mod config;
pub mod error;
pub mod launcher;
pub mod reporter;

pub use client::{own_identity, BootstrapClient};
pub use config::{NodeLauncherConfig, TopologyMode};
pub use error::NodeError;
pub use launcher::{launch_node, launch_nodes, LaunchedNode};
pub use reporter::TelemetryReporter;
