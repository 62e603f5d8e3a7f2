//! Raft state: persistent, volatile, and derived (§3.2, §4.5).
//!
//! Persistent state (`term`, `vote`) is what survives a restart; volatile
//! state (`volatile_term`, `volatile_vote`) is what the instance has decided
//! to act on *before* the matching WAL write has been acknowledged. The
//! invariant `volatile >= persisted` holds at all times: a candidacy or vote
//! is adopted into volatile state immediately and only mirrored into
//! persistent state (and thus durable) once the write completes
//! (`process_async`, §4.5/§5).

use serde::{Deserialize, Serialize};
use swimraft_types::id::{ReplicaId, Term};
use swimraft_types::vclock::Vclock;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

/// What must be durable before this instance is allowed to act on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistentState {
    pub term: Term,
    pub vote: Option<ReplicaId>,
}

/// What the instance has already decided, ahead of the matching WAL write.
/// Always `>= persistent` componentwise (term at least as high, and if the
/// terms are equal then `vote` is a superset of information: either equal or
/// persistent.vote is None and volatile carries the pending choice).
#[derive(Debug, Clone, Default)]
pub struct VolatileDecision {
    pub term: Term,
    pub vote: Option<ReplicaId>,
}

/// State that is recomputed from the above on every relevant event rather
/// than stored independently.
#[derive(Debug, Clone)]
pub struct DerivedState {
    pub role: Role,
    pub leader: Option<ReplicaId>,
    /// Bitset of peers whose vote this instance's current candidacy holds.
    pub vote_mask: u64,
    pub vote_count: usize,
    /// Bitset of peers this instance has seen claim or witness a leader in
    /// the current term, used for the pre-vote check (§4.5).
    pub leader_witness_map: u64,
    pub leader_last_seen: swimraft_types::time::SimTime,
    pub cluster_size: usize,
    pub election_quorum: usize,
}

impl DerivedState {
    pub fn new(cluster_size: usize, election_quorum: usize) -> Self {
        Self {
            role: Role::Follower,
            leader: None,
            vote_mask: 0,
            vote_count: 0,
            leader_witness_map: 0,
            leader_last_seen: 0,
            cluster_size,
            election_quorum,
        }
    }

    pub fn has_vote_from(&self, replica: ReplicaId) -> bool {
        self.vote_mask & (1u64 << replica) != 0
    }

    pub fn record_vote(&mut self, replica: ReplicaId) {
        if !self.has_vote_from(replica) {
            self.vote_mask |= 1u64 << replica;
            self.vote_count += 1;
        }
    }

    pub fn reset_votes(&mut self) {
        self.vote_mask = 0;
        self.vote_count = 0;
    }

    pub fn has_quorum(&self) -> bool {
        self.vote_count >= self.election_quorum
    }

    /// Whether enough peers have declared they can never grant this instance
    /// a vote this term that quorum has become mathematically impossible
    /// (split-vote detection, §4.5).
    pub fn is_quorum_impossible(&self, declined_mask: u64) -> bool {
        let remaining = self.cluster_size - (declined_mask.count_ones() as usize);
        remaining < self.election_quorum
    }
}

/// The full state of one Raft instance.
pub struct RaftState {
    pub persistent: PersistentState,
    pub volatile: VolatileDecision,
    pub derived: DerivedState,
    pub vclock: Vclock,
    pub self_id: ReplicaId,
}

impl RaftState {
    pub fn new(self_id: ReplicaId, cluster_size: usize, election_quorum: usize) -> Self {
        Self {
            persistent: PersistentState::default(),
            volatile: VolatileDecision::default(),
            derived: DerivedState::new(cluster_size, election_quorum),
            vclock: Vclock::new(),
            self_id,
        }
    }

    pub fn assert_invariant(&self) {
        debug_assert!(self.volatile.term >= self.persistent.term);
    }
}
