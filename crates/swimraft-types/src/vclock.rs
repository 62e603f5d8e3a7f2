//! # swimraft-types::vclock
//!
//! A vector clock keyed by replica id, mapping each known replica to the
//! highest LSN it has confirmed. Used by Raft to break ties between
//! candidates with an equal term (the candidate with the "more complete" log
//! wins, §4.5) and by the limbo queue to aggregate per-peer acks (§4.6).

use crate::id::{Lsn, ReplicaId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vclock {
    components: IndexMap<ReplicaId, Lsn>,
}

impl Vclock {
    pub fn new() -> Self {
        Self { components: IndexMap::new() }
    }

    pub fn get(&self, replica: ReplicaId) -> Lsn {
        self.components.get(&replica).copied().unwrap_or(0)
    }

    pub fn set(&mut self, replica: ReplicaId, lsn: Lsn) {
        self.components.insert(replica, lsn);
    }

    /// Advances the component for `replica` only if `lsn` is greater than
    /// what is already recorded. Returns whether it advanced.
    pub fn advance(&mut self, replica: ReplicaId, lsn: Lsn) -> bool {
        let cur = self.components.entry(replica).or_insert(0);
        if lsn > *cur {
            *cur = lsn;
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReplicaId, Lsn)> + '_ {
        self.components.iter().map(|(&r, &l)| (r, l))
    }

    pub fn sum(&self) -> i64 {
        self.components.values().sum()
    }

    /// Signal-LSN comparison used for Raft's vote tie-break: the clock with
    /// the higher sum of components is "more complete". Ties are
    /// Ordering::Equal, and the caller must fall back to another
    /// discriminator (e.g. instance id).
    pub fn compare_completeness(&self, other: &Vclock) -> Ordering {
        self.sum().cmp(&other.sum())
    }
}
