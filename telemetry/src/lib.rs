//! Telemetry aggregation for the testbed coordinator.
//!
//! Nodes report protocol events over independent connections. The stores
//! here keep the earliest report per event and write each finished record
//! to an append-only result stream exactly once.

pub mod aggregator;
pub mod error;
pub mod ida;
pub mod route;
pub mod sink;
pub mod streams;

pub use aggregator::{accept_fail_line, TelemetryAggregator};
pub use error::TelemetryError;
pub use ida::{IdaGossipTracker, IdaSnapshot};
pub use route::{RouteSnapshot, RouteTxTracker};
pub use sink::{prepare_line, FileSink, MemorySink, ResultSink};
pub use streams::{ResultSinks, ResultStream};
