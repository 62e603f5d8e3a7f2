//! Member identity, incarnation ordering, and status lattice (§3.1).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use swimraft_types::id::MemberId;

/// `(generation, version)`. `generation` is fixed for the lifetime of a
/// process (bumped only across restarts); `version` is bumped by the member
/// itself whenever it refutes a suspicion or dissemination of its own death.
/// Ordering is lexicographic on `(generation, version)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incarnation {
    pub generation: u64,
    pub version: u64,
}

impl Incarnation {
    pub fn new(generation: u64) -> Self {
        Self { generation, version: 0 }
    }

    pub fn bumped(self) -> Self {
        Self { generation: self.generation, version: self.version + 1 }
    }
}

impl PartialOrd for Incarnation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Incarnation {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.generation, self.version).cmp(&(other.generation, other.version))
    }
}

/// The status lattice: `Alive < Suspected < Dead < Left`. An update only
/// ever moves a member's status forward for a given incarnation; a higher
/// incarnation resets the lattice (a refutation overrides a stale status).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberStatus {
    Alive = 0,
    Suspected = 1,
    Dead = 2,
    Left = 3,
}

/// One row of the member table: everything known about a peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: MemberId,
    pub addr: String,
    pub incarnation: Incarnation,
    pub status: MemberStatus,
    /// Opaque application payload attached by the member itself.
    pub payload: Vec<u8>,
    /// Round number (`scheduler`'s logical clock) at which `status` was last
    /// set; used to compute suspicion/death timeouts and dissemination TTD.
    #[serde(skip, default)]
    pub status_round: u64,
}

impl MemberRecord {
    pub fn new_self(id: MemberId, addr: String, payload: Vec<u8>) -> Self {
        Self {
            id,
            addr,
            incarnation: Incarnation::new(0),
            status: MemberStatus::Alive,
            payload,
            status_round: 0,
        }
    }

    /// Whether `update` should be applied over `self`, per the incarnation +
    /// status lattice in §3.1.
    pub fn should_apply(&self, update_incarnation: Incarnation, update_status: MemberStatus) -> bool {
        match update_incarnation.cmp(&self.incarnation) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => update_status > self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incarnation_orders_lexicographically() {
        assert!(Incarnation { generation: 1, version: 0 } > Incarnation { generation: 0, version: 99 });
        assert!(Incarnation { generation: 1, version: 5 } < Incarnation { generation: 1, version: 6 });
    }

    #[test]
    fn same_incarnation_only_moves_status_forward() {
        let rec = MemberRecord::new_self(MemberId::new_random(), "node:1".into(), vec![]);
        assert!(rec.should_apply(rec.incarnation, MemberStatus::Suspected));
        assert!(!rec.should_apply(rec.incarnation, MemberStatus::Alive));
    }

    #[test]
    fn higher_incarnation_always_applies() {
        let rec = MemberRecord::new_self(MemberId::new_random(), "node:1".into(), vec![]);
        assert!(rec.should_apply(rec.incarnation.bumped(), MemberStatus::Alive));
    }
}
