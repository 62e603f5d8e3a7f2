//! Direct/indirect ping failure detector (§4.1).
//!
//! Protocol: probe the round's target directly; if no ack arrives within
//! `ack_timeout`, relay the probe through `k` indirect members (`PING_REQ`).
//! If neither the direct nor any indirect ack arrives before the next round
//! starts, the target transitions `Alive -> Suspected`. A member stays
//! `Suspected` for `SUSPECT_TO_DEAD_ROUNDS` rounds (calibrated to roughly
//! `3 * ack_timeout` of wall time) before transitioning to `Dead`, and a
//! `Dead` record is evicted after `DEAD_GC_ROUNDS` (approximating
//! `log2(cluster_size)`), unless `GcMode::Off`.

use super::member::MemberStatus;
use std::collections::HashMap;
use swimraft_types::id::MemberId;
use swimraft_types::time::SimTime;

/// Rounds a suspected member is given to refute before being marked dead.
pub const SUSPECT_TO_DEAD_ROUNDS: u64 = 3;

/// Returns the round budget before a dead record is evicted, approximating
/// `log2(cluster_size)` with a floor of 1 round.
pub fn dead_gc_rounds(cluster_size: usize) -> u64 {
    (cluster_size.max(2) as f64).log2().ceil().max(1.0) as u64
}

#[derive(Debug, Clone)]
pub struct PendingProbe {
    pub target: MemberId,
    pub round: u64,
    pub started_at: SimTime,
    pub direct_acked: bool,
    pub relays: Vec<MemberId>,
    pub indirect_acked: bool,
}

impl PendingProbe {
    pub fn is_acked(&self) -> bool {
        self.direct_acked || self.indirect_acked
    }
}

/// Tracks suspicion bookkeeping: the round at which a member entered
/// `Suspected`, so the engine can decide when to escalate to `Dead`.
#[derive(Debug, Default)]
pub struct SuspicionTracker {
    suspected_since: HashMap<MemberId, u64>,
    dead_since: HashMap<MemberId, u64>,
}

impl SuspicionTracker {
    pub fn mark_suspected(&mut self, id: MemberId, round: u64) {
        self.suspected_since.entry(id).or_insert(round);
    }

    pub fn mark_alive(&mut self, id: MemberId) {
        self.suspected_since.remove(&id);
        self.dead_since.remove(&id);
    }

    pub fn mark_dead(&mut self, id: MemberId, round: u64) {
        self.suspected_since.remove(&id);
        self.dead_since.entry(id).or_insert(round);
    }

    pub fn mark_removed(&mut self, id: &MemberId) {
        self.suspected_since.remove(id);
        self.dead_since.remove(id);
    }

    /// Returns ids whose suspicion window has elapsed, ready to be marked dead.
    pub fn expired_suspects(&self, round: u64) -> Vec<MemberId> {
        self.suspected_since
            .iter()
            .filter(|(_, &since)| round.saturating_sub(since) >= SUSPECT_TO_DEAD_ROUNDS)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Returns dead ids ready for eviction from the table.
    pub fn expired_dead(&self, round: u64, cluster_size: usize) -> Vec<MemberId> {
        let budget = dead_gc_rounds(cluster_size);
        self.dead_since
            .iter()
            .filter(|(_, &since)| round.saturating_sub(since) >= budget)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn status_for(&self, id: &MemberId) -> Option<MemberStatus> {
        if self.dead_since.contains_key(id) {
            Some(MemberStatus::Dead)
        } else if self.suspected_since.contains_key(id) {
            Some(MemberStatus::Suspected)
        } else {
            None
        }
    }
}
