//! Dissemination queue: piggybacks recent member-table changes onto every
//! outgoing packet until each update has been attached `ttd` (time-to-
//! disseminate) times, bounding gossip spread to O(log N) rounds (§4.1).

use super::member::MemberRecord;
use std::collections::VecDeque;
use swimraft_types::id::MemberId;

#[derive(Debug, Clone)]
pub struct DisseminationEntry {
    pub record: MemberRecord,
    /// Number of remaining packets this update should be attached to.
    pub ttd: u32,
}

#[derive(Debug, Default)]
pub struct DisseminationQueue {
    entries: VecDeque<DisseminationEntry>,
}

impl DisseminationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// `initial_ttd` is typically `ceil(log2(cluster_size)) * C` so that an
    /// update survives long enough to reach every member with high
    /// probability even as gossip targets are picked uniformly at random.
    pub fn push(&mut self, record: MemberRecord, initial_ttd: u32) {
        self.entries.retain(|e| e.record.id != record.id);
        self.entries.push_back(DisseminationEntry { record, ttd: initial_ttd });
    }

    pub fn remove(&mut self, id: &MemberId) {
        self.entries.retain(|e| &e.record.id != id);
    }

    /// Selects up to `budget` entries to attach to the next outgoing packet,
    /// oldest/most-in-need-of-spread first, and decrements their TTD.
    pub fn take_for_packet(&mut self, budget: usize) -> Vec<MemberRecord> {
        let mut picked = Vec::new();
        let mut exhausted = Vec::new();
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            if picked.len() >= budget {
                break;
            }
            picked.push(entry.record.clone());
            entry.ttd = entry.ttd.saturating_sub(1);
            if entry.ttd == 0 {
                exhausted.push(idx);
            }
        }
        for idx in exhausted.into_iter().rev() {
            self.entries.remove(idx);
        }
        picked
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// `ceil(log2(n)) * multiplier`, clamped to a floor of 1 (§4.1).
pub fn initial_ttd(cluster_size: usize, multiplier: u32) -> u32 {
    (((cluster_size.max(2) as f64).log2().ceil() as u32) * multiplier).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swim::member::{Incarnation, MemberStatus};
    use swimraft_types::id::MemberId;

    fn rec() -> MemberRecord {
        MemberRecord {
            id: MemberId::new_random(),
            addr: "node:3".into(),
            incarnation: Incarnation::new(0),
            status: MemberStatus::Alive,
            payload: vec![],
            status_round: 0,
        }
    }

    #[test]
    fn entry_drops_once_ttd_exhausted() {
        let mut q = DisseminationQueue::new();
        q.push(rec(), 2);
        assert_eq!(q.take_for_packet(8).len(), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(q.take_for_packet(8).len(), 1);
        assert!(q.is_empty());
    }

    #[test]
    fn pushing_same_member_again_replaces_entry() {
        let mut q = DisseminationQueue::new();
        let mut m = rec();
        q.push(m.clone(), 5);
        m.status = MemberStatus::Suspected;
        q.push(m, 5);
        assert_eq!(q.len(), 1);
    }
}
