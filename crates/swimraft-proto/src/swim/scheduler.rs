//! Round-robin probe target scheduler with periodic shuffle (§4.1).
//!
//! Each protocol round picks the next target from a shuffled permutation of
//! known members; once the permutation is exhausted a fresh shuffle begins,
//! guaranteeing every member is probed once per `len()` rounds (the basis for
//! the O(log N) suspicion/dissemination bounds).

use rand::seq::SliceRandom;
use rand::Rng;
use swimraft_types::id::MemberId;

#[derive(Debug, Default)]
pub struct RoundScheduler {
    order: Vec<MemberId>,
    cursor: usize,
    pub round: u64,
}

impl RoundScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called whenever the member table's membership changes so the
    /// permutation reflects the current set; preserves no state across a
    /// resize beyond dropping members no longer present.
    fn reshuffle(&mut self, members: impl Iterator<Item = MemberId>, rng: &mut impl Rng) {
        self.order = members.collect();
        self.order.shuffle(rng);
        self.cursor = 0;
    }

    /// Returns the next probe target, reshuffling when the current
    /// permutation is known-stale or exhausted.
    pub fn next_target(&mut self, members: impl Iterator<Item = MemberId> + Clone, rng: &mut impl Rng) -> Option<MemberId> {
        if self.cursor >= self.order.len() {
            self.reshuffle(members, rng);
            self.round += 1;
        }
        let target = self.order.get(self.cursor).copied();
        self.cursor += 1;
        target
    }

    /// Forces a reshuffle on the next call (used after membership changes).
    pub fn invalidate(&mut self) {
        self.cursor = self.order.len();
    }
}
