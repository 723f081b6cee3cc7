//! Wire protocol between nodes and the coordinator.
//!
//! Every message is a length-prefixed bincode frame. Bootstrap uses a single
//! request/response pair per connection; telemetry uses one tagged
//! [`Envelope`] per connection.

pub mod codec;
pub mod error;
pub mod messages;
pub mod telemetry;

pub use codec::{
    decode, encode, read_frame, write_encoded_frame, write_frame, MAX_MESSAGE_SIZE,
};
pub use error::ProtocolError;
pub use messages::{BootstrapResponse, HandshakeMsg};
pub use telemetry::{
    AcceptFailReport, Envelope, RouteHop, TelemetryMessage, TimedBytes, TimedId,
    ACCEPT_FAIL_LEN, ROUTE_HOP_LEN,
};
