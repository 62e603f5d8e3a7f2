//! # swimraft-types::id
//!
//! Core identifier types. Using distinct types for different kinds of ids
//! helps prevent bugs where, for example, a `NodeId` might be accidentally
//! used as a `LinkId`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A local, small-integer identifier for a node within a running cluster or
/// test harness. Not the same as a SWIM member's `Uuid` identity: `NodeId` is
/// how the engine and tests address a process; `MemberId` is how SWIM
/// addresses an instance across UUID changes.
/// Invariant: initially spawned nodes MUST have contiguous ids from 0 to N-1.
pub type NodeId = u32;

/// A unique identifier for a directed link between two nodes (engine/test
/// harness only; has no counterpart on the wire).
pub type LinkId = u64;

/// A unique identifier for a timer set by a protocol.
pub type TimerId = u64;

/// A unique identifier for a scheduled event in the engine's master queue.
pub type EventId = u64;

/// A SWIM member's persistent identity. Stable across incarnation bumps;
/// changes only via an explicit UUID-change operation (§4.1).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub uuid::Uuid);

impl MemberId {
    pub fn new_random() -> Self {
        MemberId(uuid::Uuid::new_v4())
    }

    pub fn nil() -> Self {
        MemberId(uuid::Uuid::nil())
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Raft term number. Monotonically non-decreasing for any given instance.
pub type Term = u64;

/// A log sequence number, used both by the limbo queue (transaction ordering)
/// and by Raft's vclock-based vote tie-break.
pub type Lsn = i64;

/// A replica identifier as used inside a `Vclock` (distinct from `NodeId`:
/// this is the cluster-wide instance id assigned at bootstrap, stable across
/// process restarts).
pub type ReplicaId = u32;
