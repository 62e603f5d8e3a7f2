//! The transaction limbo queue (§4.6): an ordered, per-owner FIFO of
//! synchronous-replication entries bound to whichever replica Raft has
//! elected leader. Only the current owner may submit new entries; an
//! ownership transfer confirms everything up to the new owner's last known
//! durable point and rolls back anything beyond it.

use super::entry::{EntryState, LimboEntry};
use swimraft_types::id::{Lsn, ReplicaId};
use swimraft_types::vclock::Vclock;

#[derive(Debug, thiserror::Error)]
pub enum LimboError {
    #[error("submission from {submitter} rejected: queue is owned by {owner}")]
    ForeignOwner { submitter: ReplicaId, owner: ReplicaId },
    #[error("queue is full ({0} bytes)")]
    Overload(usize),
}

/// Resolution of a `wait_complete` call (§4.6 "Waiters").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Committed,
    RolledBack,
    /// The wait timed out, this was the head waiter, and the entry's LSN is
    /// still ahead of `volatile_confirmed_lsn` — the caller decides whether
    /// to force a rollback.
    NeedRollback,
}

pub struct LimboQueue {
    owner_id: ReplicaId,
    entries: std::collections::VecDeque<LimboEntry>,
    next_lsn: Lsn,
    /// Highest LSN known durable to a quorum. Monotonically non-decreasing.
    confirmed_lsn: Lsn,
    /// Highest LSN this instance has locally decided to treat as durable,
    /// ahead of `confirmed_lsn` only while the corresponding WAL write is
    /// still in flight; `volatile_confirmed_lsn >= confirmed_lsn` always.
    volatile_confirmed_lsn: Lsn,
    acks: Vclock,
    quorum: usize,
    /// Index of the oldest entry not yet known Commit/Rollback.
    entry_to_confirm: usize,
    /// Sum of `approx_len` over all entries currently queued.
    size: usize,
    max_size: usize,
}

impl LimboQueue {
    pub fn new(owner_id: ReplicaId, quorum: usize, max_size: usize) -> Self {
        Self {
            owner_id,
            entries: std::collections::VecDeque::new(),
            next_lsn: 1,
            confirmed_lsn: 0,
            volatile_confirmed_lsn: 0,
            acks: Vclock::new(),
            quorum,
            entry_to_confirm: 0,
            size: 0,
            max_size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn owner_id(&self) -> ReplicaId {
        self.owner_id
    }

    pub fn confirmed_lsn(&self) -> Lsn {
        self.confirmed_lsn
    }

    pub fn volatile_confirmed_lsn(&self) -> Lsn {
        self.volatile_confirmed_lsn
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Submits a new entry, assigning it the next LSN exactly once. Only the
    /// owner may submit.
    pub fn submit(&mut self, submitter: ReplicaId, mut entry: LimboEntry) -> Result<Lsn, LimboError> {
        if submitter != self.owner_id {
            return Err(LimboError::ForeignOwner { submitter, owner: self.owner_id });
        }
        if self.size + entry.approx_len > self.max_size {
            return Err(LimboError::Overload(self.max_size));
        }
        let lsn = self.next_lsn;
        self.next_lsn += 1;
        entry.lsn = Some(lsn);
        entry.state = EntryState::Submitted;
        self.size += entry.approx_len;
        self.entries.push_back(entry);
        Ok(lsn)
    }

    /// Resolution of `lsn` if it has already left the pending window, or
    /// `None` if it is still `Volatile`/`Submitted` (§4.6 "Waiters").
    pub fn outcome_for(&self, lsn: Lsn) -> Option<WaitOutcome> {
        if lsn <= self.confirmed_lsn {
            return Some(WaitOutcome::Committed);
        }
        if self.entries.iter().any(|e| e.lsn == Some(lsn)) {
            return None;
        }
        if lsn < self.next_lsn {
            return Some(WaitOutcome::RolledBack);
        }
        None
    }

    /// Whether `lsn` belongs to the entry currently at the front of the
    /// queue, i.e. the oldest still-pending entry (§4.6 "Waiters").
    pub fn is_head(&self, lsn: Lsn) -> bool {
        self.entries.front().and_then(|e| e.lsn) == Some(lsn)
    }

    /// Records that `replica` has persisted up to `lsn`, then recomputes
    /// `volatile_confirmed_lsn` as the highest prefix acked by a quorum.
    pub fn ack(&mut self, replica: ReplicaId, lsn: Lsn) {
        self.acks.advance(replica, lsn);
        self.recompute_confirmation();
    }

    fn recompute_confirmation(&mut self) {
        // An LSN is quorum-confirmed once at least `quorum` replicas
        // (including the owner's own durable write) have acked at or past
        // it. Scan candidate LSNs in queue order and stop at the first one
        // that does not yet meet quorum.
        let mut candidate = self.volatile_confirmed_lsn;
        for entry in self.entries.iter() {
            let Some(lsn) = entry.lsn else { continue };
            if lsn <= self.volatile_confirmed_lsn {
                continue;
            }
            let acked_count = self.acks.iter().filter(|&(_, acked)| acked >= lsn).count();
            if acked_count >= self.quorum {
                candidate = lsn;
            } else {
                break;
            }
        }
        self.volatile_confirmed_lsn = candidate;
    }

    /// The host calls this once the owner's own WAL write up to
    /// `volatile_confirmed_lsn` has been fsynced (`process_async`
    /// equivalent, §4.5/§5), advancing the durable `confirmed_lsn` and
    /// marking entries up to it `Commit`.
    pub fn apply_confirm(&mut self, up_to_lsn: Lsn) {
        if up_to_lsn <= self.confirmed_lsn {
            return;
        }
        self.confirmed_lsn = up_to_lsn.min(self.volatile_confirmed_lsn);
        while let Some(entry) = self.entries.front() {
            if entry.lsn.map(|l| l <= self.confirmed_lsn).unwrap_or(false) {
                let mut entry = self.entries.pop_front().unwrap();
                entry.state = EntryState::Commit;
                self.size = self.size.saturating_sub(entry.approx_len);
                self.entry_to_confirm = self.entry_to_confirm.saturating_sub(1);
            } else {
                break;
            }
        }
    }

    /// Rolls back every entry from `from_lsn` (inclusive) to the tail,
    /// cascading: a rollback of an earlier entry always takes everything
    /// after it with it, since later entries assumed it would commit.
    pub fn apply_rollback(&mut self, from_lsn: Lsn) {
        for entry in self.entries.iter_mut() {
            if entry.lsn.map(|l| l >= from_lsn).unwrap_or(false) {
                entry.state = EntryState::Rollback;
            }
        }
        let freed: usize = self.entries.iter().filter(|e| e.state == EntryState::Rollback).map(|e| e.approx_len).sum();
        self.size = self.size.saturating_sub(freed);
        self.entries.retain(|e| e.state != EntryState::Rollback);
    }

    /// Ownership transfer (§4.6): the new owner confirms everything up to
    /// `border_lsn` (its own last known durable point) and rolls back
    /// anything beyond it, since those entries were never safely replicated
    /// under the old owner.
    pub fn transfer_ownership(&mut self, new_owner: ReplicaId, border_lsn: Lsn) {
        self.apply_confirm(border_lsn);
        self.apply_rollback(border_lsn + 1);
        self.owner_id = new_owner;
        self.acks = Vclock::new();
    }

    pub fn entries(&self) -> impl Iterator<Item = &LimboEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn mk(owner: ReplicaId) -> LimboEntry {
        LimboEntry::new_volatile(owner, Bytes::from_static(b"txn"), 0)
    }

    #[test]
    fn submit_assigns_lsn_exactly_once() {
        let mut q = LimboQueue::new(0, 2, 100);
        let lsn1 = q.submit(0, mk(0)).unwrap();
        let lsn2 = q.submit(0, mk(0)).unwrap();
        assert_eq!(lsn1, 1);
        assert_eq!(lsn2, 2);
    }

    #[test]
    fn foreign_owner_rejected() {
        let mut q = LimboQueue::new(0, 2, 100);
        assert!(q.submit(1, mk(1)).is_err());
    }

    #[test]
    fn quorum_acks_advance_confirmation_in_order() {
        let mut q = LimboQueue::new(0, 2, 100);
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();

        q.ack(0, 2);
        assert_eq!(q.volatile_confirmed_lsn(), 0, "single ack below quorum confirms nothing");

        q.ack(1, 1);
        assert_eq!(q.volatile_confirmed_lsn(), 1, "two replicas now cover lsn 1 but not lsn 2");

        q.ack(2, 2);
        assert_eq!(q.volatile_confirmed_lsn(), 2);
    }

    #[test]
    fn apply_confirm_commits_prefix_and_drains_queue() {
        let mut q = LimboQueue::new(0, 2, 100);
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.ack(0, 2);
        q.ack(1, 2);
        q.apply_confirm(q.volatile_confirmed_lsn());
        assert_eq!(q.confirmed_lsn(), 2);
        assert!(q.is_empty());
    }

    #[test]
    fn rollback_cascades_to_tail() {
        let mut q = LimboQueue::new(0, 2, 100);
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.apply_rollback(2);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn confirm_and_rollback_are_idempotent() {
        let mut q = LimboQueue::new(0, 2, 100);
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.ack(0, 2);
        q.ack(1, 2);

        q.apply_confirm(2);
        let after_first_confirm = (q.confirmed_lsn(), q.len());
        q.apply_confirm(2);
        assert_eq!((q.confirmed_lsn(), q.len()), after_first_confirm, "repeat CONFIRM(lsn) is a no-op");

        q.apply_rollback(3);
        let after_first_rollback = q.len();
        q.apply_rollback(3);
        assert_eq!(q.len(), after_first_rollback, "repeat ROLLBACK(lsn) is a no-op");
    }

    #[test]
    fn submit_rejected_once_byte_budget_exhausted() {
        let mut q = LimboQueue::new(0, 2, 10);
        q.submit(0, LimboEntry::new_volatile(0, Bytes::from_static(b"0123456789"), 0)).unwrap();
        assert_eq!(q.size(), 10);
        let err = q.submit(0, mk(0)).unwrap_err();
        assert!(matches!(err, LimboError::Overload(10)));
    }

    #[test]
    fn apply_confirm_and_rollback_release_byte_budget() {
        let mut q = LimboQueue::new(0, 2, 6);
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        assert_eq!(q.size(), 6);
        q.ack(0, 1);
        q.ack(1, 1);
        q.apply_confirm(1);
        assert_eq!(q.size(), 3, "confirming the first entry frees its bytes");
        q.apply_rollback(2);
        assert_eq!(q.size(), 0, "rolling back the tail frees the rest");
    }

    #[test]
    fn outcome_for_distinguishes_committed_pending_and_rolled_back() {
        let mut q = LimboQueue::new(0, 2, 100);
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.ack(0, 1);
        q.ack(1, 1);
        q.apply_confirm(1);
        assert_eq!(q.outcome_for(1), Some(WaitOutcome::Committed));
        assert_eq!(q.outcome_for(2), None, "submitted but not yet acked by a quorum");
        assert!(q.is_head(2));

        q.apply_rollback(3);
        assert_eq!(q.outcome_for(3), Some(WaitOutcome::RolledBack));
    }

    #[test]
    fn ownership_transfer_confirms_then_rolls_back_tail() {
        let mut q = LimboQueue::new(0, 2, 100);
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.submit(0, mk(0)).unwrap();
        q.ack(0, 3);
        q.ack(1, 1);
        let border = q.volatile_confirmed_lsn();
        q.transfer_ownership(2, border);
        assert_eq!(q.owner_id(), 2);
        assert_eq!(q.confirmed_lsn(), border);
        assert!(q.entries().all(|e| e.lsn.unwrap() <= border));
    }
}
