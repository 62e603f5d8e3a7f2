//! A single synchronous-replication transaction entry (§3.3, §4.6).

use bytes::Bytes;
use swimraft_types::id::{Lsn, ReplicaId};
use swimraft_types::time::SimTime;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryState {
    /// Submitted locally but not yet assigned an LSN.
    Volatile,
    /// Assigned an LSN and replicated to the quorum's WAL, awaiting acks.
    Submitted,
    /// Acked by a quorum; durable and safe to apply.
    Commit,
    /// Abandoned, either by explicit rollback or because an entry ahead of
    /// it in the queue rolled back (cascading rollback, §4.6).
    Rollback,
}

#[derive(Clone, Debug)]
pub struct LimboEntry {
    /// Assigned exactly once, the first time the entry is submitted to the
    /// queue while its owner holds Raft leadership (§4.6 "LSN assignment").
    pub lsn: Option<Lsn>,
    pub owner_id: ReplicaId,
    pub state: EntryState,
    pub data: Bytes,
    /// Byte weight charged against the queue's `max_size` admission budget.
    /// Not necessarily `data.len()` in general (a real WAL row carries framing
    /// overhead beyond the payload) but we have no such overhead to model here.
    pub approx_len: usize,
    pub insertion_time: SimTime,
}

impl LimboEntry {
    pub fn new_volatile(owner_id: ReplicaId, data: Bytes, insertion_time: SimTime) -> Self {
        let approx_len = data.len();
        Self { lsn: None, owner_id, state: EntryState::Volatile, data, approx_len, insertion_time }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, EntryState::Commit | EntryState::Rollback)
    }
}
