//! # swimraft-types::envelope
//!
//! `Envelope` is the fundamental wrapper for all messages exchanged between
//! nodes through the engine's transport, carrying routing/tracing metadata
//! alongside the protocol payload.

use crate::{id::NodeId, time::SimTime};
use bytes::Bytes;

/// A unique tag identifying the protocol namespace for a message, so SWIM,
/// Raft, and the limbo queue can share one transport without collision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProtoTag(pub u16);

impl ProtoTag {
    pub const SWIM: ProtoTag = ProtoTag(1);
    pub const RAFT: ProtoTag = ProtoTag(2);
    pub const LIMBO: ProtoTag = ProtoTag(3);
}

/// A wrapper for all messages sent over the transport.
///
/// Invariants:
/// - `src != dst` unless loopback is explicitly allowed.
/// - `payload.len() <= MAX_MSG_BYTES` (enforced by the network layer).
#[derive(Clone, Debug)]
pub struct Envelope {
    pub src: NodeId,
    pub dst: NodeId,
    pub proto_tag: ProtoTag,
    pub payload: Bytes,
    /// A unique, deterministically-assigned id for this message instance.
    pub msg_id: u64,
    pub create_time: SimTime,
    /// Correlates related events (e.g. a ping and its ack) for observability.
    pub trace_id: u64,
}
