//! Tagged telemetry envelopes sent from nodes to the coordinator.
//!
//! On the wire each report is an [`Envelope`]: a tag string plus an opaque
//! bincode payload. [`TelemetryMessage`] is the closed set of reports the
//! coordinator understands. Decoding an envelope with any other tag fails.

use std::time::Duration;

use rapid_types::{Digest, FinalBlock, Timestamp};
use serde::{Deserialize, Serialize};

use crate::codec::{decode, encode};
use crate::ProtocolError;

/// Length of a `find_node` blob: tx id followed by committee id.
pub const ROUTE_HOP_LEN: usize = 64;

/// Length of a `consensus_accept_fail` blob.
pub const ACCEPT_FAIL_LEN: usize = 88;

pub const TAG_IDA_SUCCESS: &str = "IDASuccess";
pub const TAG_CONSENSUS: &str = "consensus";
pub const TAG_FINAL_BLOCK: &str = "finalblock";
pub const TAG_POC_VERIFY: &str = "pocverify";
pub const TAG_POC_ADD: &str = "pocadd";
pub const TAG_ROUTE_TX: &str = "routetx";
pub const TAG_FIND_NODE: &str = "find_node";
pub const TAG_TRANSACTION_RECEIVED: &str = "transaction_received";
pub const TAG_START_IDA_GOSSIP: &str = "start_ida_gossip";
pub const TAG_RECONSTRUCTED_IDA_GOSSIP: &str = "reconstructed_ida_gossip";
pub const TAG_CONSENSUS_ACCEPT_FAIL: &str = "consensus_accept_fail";

/// Tag plus opaque payload, as framed on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    pub payload: Vec<u8>,
}

/// Raw byte blob with the reporter's timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedBytes {
    pub bytes: Vec<u8>,
    pub timestamp: Timestamp,
}

/// An event about one 32-byte id, stamped by the reporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedId {
    pub id: Digest,
    pub at: Timestamp,
}

/// A transaction first reaching an intermediary committee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteHop {
    pub tx_id: Digest,
    pub committee_id: Digest,
    pub at: Timestamp,
}

/// One node's view of a consensus iteration that accepted or failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptFailReport {
    pub committee_id: Digest,
    /// Digest of the reporting node's public key.
    pub key_id: Digest,
    pub iteration: u64,
    pub total_votes: i64,
    pub received: i64,
}

impl AcceptFailReport {
    /// Parse the fixed 88-byte layout:
    /// `committee(32) ‖ key(32) ‖ iteration(u64 LE) ‖ total(i64 LE) ‖ received(i64 LE)`.
    ///
    /// Any other length is rejected without looking at the contents.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != ACCEPT_FAIL_LEN {
            return Err(ProtocolError::PayloadLength {
                kind: TAG_CONSENSUS_ACCEPT_FAIL,
                expected: ACCEPT_FAIL_LEN,
                actual: bytes.len(),
            });
        }
        let word = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[at..at + 8]);
            buf
        };
        Ok(Self {
            committee_id: digest_at(bytes, 0),
            key_id: digest_at(bytes, 32),
            iteration: u64::from_le_bytes(word(64)),
            total_votes: i64::from_le_bytes(word(72)),
            received: i64::from_le_bytes(word(80)),
        })
    }

    pub fn to_bytes(&self) -> [u8; ACCEPT_FAIL_LEN] {
        let mut out = [0u8; ACCEPT_FAIL_LEN];
        out[..32].copy_from_slice(self.committee_id.as_bytes());
        out[32..64].copy_from_slice(self.key_id.as_bytes());
        out[64..72].copy_from_slice(&self.iteration.to_le_bytes());
        out[72..80].copy_from_slice(&self.total_votes.to_le_bytes());
        out[80..88].copy_from_slice(&self.received.to_le_bytes());
        out
    }
}

fn digest_at(bytes: &[u8], at: usize) -> Digest {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[at..at + 32]);
    Digest::new(buf)
}

/// Every telemetry report the coordinator accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryMessage {
    /// A node reconstructed an IDA broadcast (counted only).
    IdaSuccess(Digest),
    /// A consensus phase tag such as `echo`, `pending` or `accept` (counted only).
    Consensus(String),
    FinalBlock(FinalBlock),
    PocVerify(Duration),
    PocAdd(Duration),
    RouteTx(TimedId),
    FindNode(RouteHop),
    TransactionReceived(TimedId),
    StartIdaGossip(TimedId),
    ReconstructedIdaGossip(TimedId),
    ConsensusAcceptFail {
        report: AcceptFailReport,
        timestamp: Timestamp,
    },
}

impl TelemetryMessage {
    /// The wire tag for this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IdaSuccess(_) => TAG_IDA_SUCCESS,
            Self::Consensus(_) => TAG_CONSENSUS,
            Self::FinalBlock(_) => TAG_FINAL_BLOCK,
            Self::PocVerify(_) => TAG_POC_VERIFY,
            Self::PocAdd(_) => TAG_POC_ADD,
            Self::RouteTx(_) => TAG_ROUTE_TX,
            Self::FindNode(_) => TAG_FIND_NODE,
            Self::TransactionReceived(_) => TAG_TRANSACTION_RECEIVED,
            Self::StartIdaGossip(_) => TAG_START_IDA_GOSSIP,
            Self::ReconstructedIdaGossip(_) => TAG_RECONSTRUCTED_IDA_GOSSIP,
            Self::ConsensusAcceptFail { .. } => TAG_CONSENSUS_ACCEPT_FAIL,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope, ProtocolError> {
        let payload = match self {
            Self::IdaSuccess(root) => encode(root)?,
            Self::Consensus(tag) => encode(tag)?,
            Self::FinalBlock(block) => encode(block)?,
            Self::PocVerify(d) | Self::PocAdd(d) => encode(d)?,
            Self::RouteTx(ev)
            | Self::TransactionReceived(ev)
            | Self::StartIdaGossip(ev)
            | Self::ReconstructedIdaGossip(ev) => encode(&TimedBytes {
                bytes: ev.id.as_bytes().to_vec(),
                timestamp: ev.at,
            })?,
            Self::FindNode(hop) => {
                let mut bytes = Vec::with_capacity(ROUTE_HOP_LEN);
                bytes.extend_from_slice(hop.tx_id.as_bytes());
                bytes.extend_from_slice(hop.committee_id.as_bytes());
                encode(&TimedBytes {
                    bytes,
                    timestamp: hop.at,
                })?
            }
            Self::ConsensusAcceptFail { report, timestamp } => encode(&TimedBytes {
                bytes: report.to_bytes().to_vec(),
                timestamp: *timestamp,
            })?,
        };
        Ok(Envelope {
            kind: self.kind().to_string(),
            payload,
        })
    }

    /// Decode an envelope into a typed message.
    ///
    /// Unknown tags and fixed-width payloads of the wrong length are errors.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        let payload = envelope.payload.as_slice();
        let msg = match envelope.kind.as_str() {
            TAG_IDA_SUCCESS => Self::IdaSuccess(decode(payload)?),
            TAG_CONSENSUS => Self::Consensus(decode(payload)?),
            TAG_FINAL_BLOCK => Self::FinalBlock(decode(payload)?),
            TAG_POC_VERIFY => Self::PocVerify(decode(payload)?),
            TAG_POC_ADD => Self::PocAdd(decode(payload)?),
            TAG_ROUTE_TX => Self::RouteTx(timed_id(TAG_ROUTE_TX, payload)?),
            TAG_FIND_NODE => {
                let blob: TimedBytes = decode(payload)?;
                if blob.bytes.len() != ROUTE_HOP_LEN {
                    return Err(ProtocolError::PayloadLength {
                        kind: TAG_FIND_NODE,
                        expected: ROUTE_HOP_LEN,
                        actual: blob.bytes.len(),
                    });
                }
                Self::FindNode(RouteHop {
                    tx_id: digest_at(&blob.bytes, 0),
                    committee_id: digest_at(&blob.bytes, 32),
                    at: blob.timestamp,
                })
            }
            TAG_TRANSACTION_RECEIVED => {
                Self::TransactionReceived(timed_id(TAG_TRANSACTION_RECEIVED, payload)?)
            }
            TAG_START_IDA_GOSSIP => Self::StartIdaGossip(timed_id(TAG_START_IDA_GOSSIP, payload)?),
            TAG_RECONSTRUCTED_IDA_GOSSIP => {
                Self::ReconstructedIdaGossip(timed_id(TAG_RECONSTRUCTED_IDA_GOSSIP, payload)?)
            }
            TAG_CONSENSUS_ACCEPT_FAIL => {
                let blob: TimedBytes = decode(payload)?;
                Self::ConsensusAcceptFail {
                    report: AcceptFailReport::from_bytes(&blob.bytes)?,
                    timestamp: blob.timestamp,
                }
            }
            other => return Err(ProtocolError::UnknownTag(other.to_string())),
        };
        Ok(msg)
    }
}

fn timed_id(kind: &'static str, payload: &[u8]) -> Result<TimedId, ProtocolError> {
    let blob: TimedBytes = decode(payload)?;
    let id = Digest::from_slice(&blob.bytes).ok_or(ProtocolError::PayloadLength {
        kind,
        expected: Digest::LEN,
        actual: blob.bytes.len(),
    })?;
    Ok(TimedId {
        id,
        at: blob.timestamp,
    })
}
