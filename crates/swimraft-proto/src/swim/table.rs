//! The member table: the authoritative view of the cluster as seen by this
//! instance (§3.1, §4.1).

use super::member::{Incarnation, MemberRecord, MemberStatus};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;
use swimraft_types::id::MemberId;

#[derive(Debug, Default)]
pub struct MemberTable {
    members: IndexMap<MemberId, MemberRecord>,
    self_id: Option<MemberId>,
}

/// Outcome of applying an incoming record to the table, used to decide
/// whether to re-disseminate it (§4.1 Dissemination).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record was new or strictly newer than what we had; re-disseminate.
    Updated,
    /// The record was stale or identical; drop it.
    Ignored,
    /// This update concerns our own id and is inferior to our current
    /// incarnation; a refutation must be issued.
    NeedsRefutation,
}

impl MemberTable {
    pub fn new(self_id: MemberId) -> Self {
        Self { members: IndexMap::new(), self_id: Some(self_id) }
    }

    pub fn self_id(&self) -> MemberId {
        self.self_id.expect("self_id initialized in new()")
    }

    /// Replaces the self id (UUID-change operation, §4.1). The old identity's
    /// record is removed; the new one is inserted as freshly alive at
    /// generation 0.
    pub fn change_self_id(&mut self, new_id: MemberId, addr: String, payload: Vec<u8>) {
        if let Some(old) = self.self_id.take() {
            self.members.shift_remove(&old);
        }
        self.members.insert(new_id, MemberRecord::new_self(new_id, addr, payload));
        self.self_id = Some(new_id);
    }

    pub fn insert_self(&mut self, record: MemberRecord) {
        self.self_id = Some(record.id);
        self.members.insert(record.id, record);
    }

    pub fn get(&self, id: &MemberId) -> Option<&MemberRecord> {
        self.members.get(id)
    }

    pub fn get_mut(&mut self, id: &MemberId) -> Option<&mut MemberRecord> {
        self.members.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberRecord> {
        self.members.values()
    }

    pub fn iter_others(&self) -> impl Iterator<Item = &MemberRecord> {
        let self_id = self.self_id;
        self.members.values().filter(move |m| Some(m.id) != self_id)
    }

    pub fn remove(&mut self, id: &MemberId) -> Option<MemberRecord> {
        if Some(*id) == self.self_id {
            return None;
        }
        self.members.shift_remove(id)
    }

    /// Applies an incoming member record (from a probe, ack, or
    /// dissemination section) per the incarnation/status lattice.
    pub fn apply(&mut self, round: u64, incoming: MemberRecord) -> ApplyOutcome {
        if Some(incoming.id) == self.self_id {
            let mine = self.members.get(&incoming.id).expect("self record present");
            if incoming.incarnation > mine.incarnation
                || (incoming.incarnation == mine.incarnation && incoming.status > MemberStatus::Alive)
            {
                return ApplyOutcome::NeedsRefutation;
            }
            return ApplyOutcome::Ignored;
        }

        match self.members.get(&incoming.id) {
            None => {
                let mut rec = incoming;
                rec.status_round = round;
                self.members.insert(rec.id, rec);
                ApplyOutcome::Updated
            }
            Some(existing) => {
                if existing.should_apply(incoming.incarnation, incoming.status) {
                    let mut rec = incoming;
                    rec.status_round = round;
                    self.members.insert(rec.id, rec);
                    ApplyOutcome::Updated
                } else {
                    ApplyOutcome::Ignored
                }
            }
        }
    }

    /// Bumps our own incarnation version in response to a refutation trigger
    /// and returns the resulting record for dissemination.
    pub fn refute_self(&mut self, round: u64) -> MemberRecord {
        let self_id = self.self_id();
        let mine = self.members.get_mut(&self_id).expect("self record present");
        mine.incarnation = mine.incarnation.bumped();
        mine.status = MemberStatus::Alive;
        mine.status_round = round;
        mine.clone()
    }

    /// Samples `n` distinct non-self members uniformly at random, for
    /// anti-entropy (§4.1).
    pub fn sample(&self, n: usize, rng: &mut impl Rng) -> Vec<MemberRecord> {
        let mut candidates: Vec<&MemberRecord> = self.iter_others().collect();
        candidates.shuffle(rng);
        candidates.into_iter().take(n).cloned().collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.members.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn other(round: u64) -> MemberRecord {
        MemberRecord {
            id: MemberId::new_random(),
            addr: "node:2".into(),
            incarnation: Incarnation::new(0),
            status: MemberStatus::Alive,
            payload: vec![],
            status_round: round,
        }
    }

    #[test]
    fn new_member_is_applied() {
        let mut table = MemberTable::new(MemberId::new_random());
        table.insert_self(MemberRecord::new_self(table.self_id(), "node:1".into(), vec![]));
        let rec = other(0);
        assert_eq!(table.apply(0, rec.clone()), ApplyOutcome::Updated);
        assert_eq!(table.get(&rec.id).unwrap().status, MemberStatus::Alive);
    }

    #[test]
    fn stale_update_is_ignored() {
        let mut table = MemberTable::new(MemberId::new_random());
        table.insert_self(MemberRecord::new_self(table.self_id(), "node:1".into(), vec![]));
        let mut rec = other(0);
        table.apply(0, rec.clone());

        rec.status = MemberStatus::Alive;
        rec.incarnation = Incarnation::new(0);
        assert_eq!(table.apply(1, rec), ApplyOutcome::Ignored);
    }

    #[test]
    fn suspicion_of_self_triggers_refutation() {
        let self_id = MemberId::new_random();
        let mut table = MemberTable::new(self_id);
        table.insert_self(MemberRecord::new_self(self_id, "node:1".into(), vec![]));

        let mut suspect_self = MemberRecord::new_self(self_id, "node:1".into(), vec![]);
        suspect_self.status = MemberStatus::Suspected;
        assert_eq!(table.apply(0, suspect_self), ApplyOutcome::NeedsRefutation);

        let refuted = table.refute_self(1);
        assert_eq!(refuted.incarnation.version, 1);
        assert_eq!(refuted.status, MemberStatus::Alive);
    }

    #[test]
    fn sample_excludes_self() {
        let self_id = MemberId::new_random();
        let mut table = MemberTable::new(self_id);
        table.insert_self(MemberRecord::new_self(self_id, "node:1".into(), vec![]));
        for _ in 0..5 {
            table.apply(0, other(0));
        }
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let sampled = table.sample(3, &mut rng);
        assert!(sampled.iter().all(|m| m.id != self_id));
        assert_eq!(sampled.len(), 3);
    }
}
