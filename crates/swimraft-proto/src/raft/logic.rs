//! Pure Raft transition logic (§4.5): election timer handling, vote
//! granting/tie-break, and leader heartbeats. Kept free of I/O so it can be
//! unit-tested without a hosted `Ctx`.

use super::state::{RaftState, Role};
use serde::{Deserialize, Serialize};
use swimraft_types::id::{ReplicaId, Term};
use swimraft_types::vclock::Vclock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RaftMessage {
    RequestVote { term: Term, candidate: ReplicaId, vclock: Vclock, is_leader_seen: bool },
    RequestVoteReply { term: Term, voter: ReplicaId, granted: bool, is_leader_seen: bool },
    Heartbeat { term: Term, leader: ReplicaId },
    HeartbeatReply { term: Term, follower: ReplicaId },
    /// Sent by a resigning leader so followers don't wait out a full
    /// election timeout before starting a new election (§4.5).
    Resign { term: Term, leader: ReplicaId },
}

/// An outcome the engine must act on: send a message, persist state, or
/// schedule/cancel a timer. Kept separate from `RaftState` mutation so every
/// transition function can be tested by inspecting its output.
#[derive(Debug)]
pub enum Effect {
    Send(ReplicaId, RaftMessage),
    Broadcast(RaftMessage),
    PersistVote { term: Term, vote: Option<ReplicaId> },
    ResetElectionTimer,
    RoleChanged(Role),
}

/// Starts (or restarts) a candidacy: bumps term, votes for self, broadcasts
/// `RequestVote`. Does not check pre-vote gating; the caller (engine) is
/// responsible for calling `can_start_election` first.
pub fn start_election(state: &mut RaftState) -> Vec<Effect> {
    let new_term = state.volatile.term + 1;
    state.volatile.term = new_term;
    state.volatile.vote = Some(state.self_id);
    state.derived.role = Role::Candidate;
    state.derived.reset_votes();
    state.derived.record_vote(state.self_id);
    state.derived.leader = None;

    vec![
        Effect::PersistVote { term: new_term, vote: Some(state.self_id) },
        Effect::Broadcast(RaftMessage::RequestVote {
            term: new_term,
            candidate: state.self_id,
            vclock: state.vclock.clone(),
            is_leader_seen: false,
        }),
        Effect::RoleChanged(Role::Candidate),
    ]
}

/// Records whether `replica` claims to still see a leader this term, per the
/// `is_leader_seen` field carried on every Raft message (§4.5). A leader
/// witnessing itself contributes its own bit (`handle_heartbeat`).
pub fn update_leader_witness(state: &mut RaftState, replica: ReplicaId, is_leader_seen: bool) {
    if is_leader_seen {
        state.derived.leader_witness_map |= 1u64 << replica;
    } else {
        state.derived.leader_witness_map &= !(1u64 << replica);
    }
}

/// Pre-vote gate (§4.5): refuse to start an election while any peer claims to
/// still see a leader (`leader_witness_map != 0`), or while this instance
/// itself has seen the leader within `death_timeout`. This prevents a single
/// network partition from triggering avoidable term bumps.
pub fn can_start_election(state: &RaftState, now: swimraft_types::time::SimTime, death_timeout_ns: u64) -> bool {
    state.derived.leader_witness_map == 0
        && (state.derived.leader.is_none()
            || now.saturating_sub(state.derived.leader_last_seen) >= death_timeout_ns as u128)
}

pub fn handle_request_vote(
    state: &mut RaftState,
    term: Term,
    candidate: ReplicaId,
    candidate_vclock: &Vclock,
    candidate_leader_seen: bool,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    update_leader_witness(state, candidate, candidate_leader_seen);
    let is_leader_seen = state.derived.leader.is_some();

    if term < state.volatile.term {
        effects.push(Effect::Send(candidate, RaftMessage::RequestVoteReply { term: state.volatile.term, voter: state.self_id, granted: false, is_leader_seen }));
        return effects;
    }

    if term > state.volatile.term {
        step_down(state, term, &mut effects);
    }

    let already_voted_other = matches!(state.volatile.vote, Some(v) if v != candidate);
    let candidate_is_fresh_enough = state.vclock.compare_completeness(candidate_vclock) != std::cmp::Ordering::Greater;
    // §4.5 rule 3/4: a known leader makes this a split-brain request; only
    // grant while this instance believes the leader slot is vacant.
    let leader_known = state.derived.leader.is_some() || state.derived.role == Role::Leader;

    let granted = !leader_known && !already_voted_other && candidate_is_fresh_enough;
    if granted {
        state.volatile.vote = Some(candidate);
        effects.push(Effect::PersistVote { term, vote: Some(candidate) });
    }

    effects.push(Effect::Send(candidate, RaftMessage::RequestVoteReply { term: state.volatile.term, voter: state.self_id, granted, is_leader_seen }));
    effects
}

/// Returns `true` if this reply caused the candidate to become leader.
pub fn handle_vote_reply(state: &mut RaftState, term: Term, voter: ReplicaId, granted: bool, is_leader_seen: bool) -> (Vec<Effect>, bool) {
    let mut effects = Vec::new();
    update_leader_witness(state, voter, is_leader_seen);
    if state.derived.role != Role::Candidate || term != state.volatile.term {
        return (effects, false);
    }
    if !granted {
        return (effects, false);
    }
    state.derived.record_vote(voter);
    if state.derived.has_quorum() {
        state.derived.role = Role::Leader;
        state.derived.leader = Some(state.self_id);
        effects.push(Effect::RoleChanged(Role::Leader));
        effects.push(Effect::Broadcast(RaftMessage::Heartbeat { term: state.volatile.term, leader: state.self_id }));
        return (effects, true);
    }
    (effects, false)
}

/// Split-vote detection (§4.5): once enough declines make quorum
/// mathematically unreachable this term, give up early rather than wait out
/// the full election timeout.
pub fn is_split_vote(state: &RaftState, declined_mask: u64) -> bool {
    state.derived.role == Role::Candidate && state.derived.is_quorum_impossible(declined_mask)
}

/// Builds a declined-votes mask covering just enough peers (excluding self)
/// to make quorum mathematically impossible, for scenario-forced split votes
/// (`Action::InjectSplitVote`, §8 scenario 4).
pub fn synthetic_split_vote_mask(state: &RaftState) -> u64 {
    let need = state
        .derived
        .cluster_size
        .saturating_sub(state.derived.election_quorum)
        + 2;
    let mut mask = 0u64;
    let mut count = 0;
    for r in 0..state.derived.cluster_size as ReplicaId {
        if r == state.self_id || count >= need {
            continue;
        }
        mask |= 1u64 << r;
        count += 1;
    }
    mask
}

pub fn handle_heartbeat(state: &mut RaftState, term: Term, leader: ReplicaId, now: swimraft_types::time::SimTime) -> Vec<Effect> {
    let mut effects = Vec::new();
    if term < state.volatile.term {
        return effects;
    }
    if term > state.volatile.term {
        step_down(state, term, &mut effects);
    }
    state.derived.role = Role::Follower;
    state.derived.leader = Some(leader);
    state.derived.leader_last_seen = now;
    state.derived.leader_witness_map |= 1u64 << leader;
    effects.push(Effect::ResetElectionTimer);
    effects.push(Effect::Send(leader, RaftMessage::HeartbeatReply { term: state.volatile.term, follower: state.self_id }));
    effects
}

pub fn handle_resign(state: &mut RaftState, term: Term, leader: ReplicaId) -> Vec<Effect> {
    if Some(leader) == state.derived.leader && term == state.volatile.term {
        state.derived.leader = None;
        state.derived.leader_last_seen = 0;
    }
    // The leader said so explicitly; pre-vote gating on its witness bit no
    // longer applies (§4.5 leader resignation).
    state.derived.leader_witness_map &= !(1u64 << leader);
    Vec::new()
}

/// A leader stepping down cleanly (administrative action or graceful
/// shutdown) broadcasts `Resign` so followers can start electing sooner.
pub fn resign(state: &mut RaftState) -> Vec<Effect> {
    let term = state.volatile.term;
    let leader = state.self_id;
    state.derived.role = Role::Follower;
    state.derived.leader = None;
    vec![Effect::Broadcast(RaftMessage::Resign { term, leader }), Effect::RoleChanged(Role::Follower)]
}

fn step_down(state: &mut RaftState, term: Term, effects: &mut Vec<Effect>) {
    state.volatile.term = term;
    state.volatile.vote = None;
    state.derived.role = Role::Follower;
    state.derived.reset_votes();
    effects.push(Effect::PersistVote { term, vote: None });
    effects.push(Effect::RoleChanged(Role::Follower));
}

/// Called once the matching WAL write for `term`/`vote` has completed
/// (`process_async`, §4.5/§5): mirrors the volatile decision into persistent
/// state, maintaining the `volatile >= persistent` invariant.
pub fn process_async(state: &mut RaftState, term: Term, vote: Option<ReplicaId>) {
    if term >= state.persistent.term {
        state.persistent.term = term;
        state.persistent.vote = vote;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RaftState {
        RaftState::new(0, 5, 3)
    }

    #[test]
    fn starting_election_votes_for_self_and_bumps_term() {
        let mut s = state();
        start_election(&mut s);
        assert_eq!(s.volatile.term, 1);
        assert_eq!(s.volatile.vote, Some(0));
        assert_eq!(s.derived.role, Role::Candidate);
        assert_eq!(s.derived.vote_count, 1);
    }

    #[test]
    fn higher_term_vote_request_steps_down_candidate() {
        let mut s = state();
        start_election(&mut s);
        let effects = handle_request_vote(&mut s, 5, 2, &Vclock::new(), false);
        assert_eq!(s.derived.role, Role::Follower);
        assert!(effects.iter().any(|e| matches!(e, Effect::Send(2, RaftMessage::RequestVoteReply { granted: true, .. }))));
    }

    #[test]
    fn stale_term_vote_request_is_rejected() {
        let mut s = state();
        s.volatile.term = 10;
        let effects = handle_request_vote(&mut s, 3, 2, &Vclock::new(), false);
        assert!(matches!(effects[0], Effect::Send(2, RaftMessage::RequestVoteReply { granted: false, .. })));
    }

    #[test]
    fn quorum_of_votes_elects_leader() {
        let mut s = state();
        start_election(&mut s);
        let (_, became_leader_1) = handle_vote_reply(&mut s, 1, 1, true, false);
        assert!(!became_leader_1);
        let (_, became_leader_2) = handle_vote_reply(&mut s, 1, 2, true, false);
        assert!(became_leader_2);
        assert_eq!(s.derived.role, Role::Leader);
    }

    #[test]
    fn split_vote_detected_when_quorum_unreachable() {
        let mut s = state();
        start_election(&mut s);
        // 5 nodes, quorum 3, self has 1 vote; if 3 peers decline, only 1
        // other vote remains reachable so quorum (needs 2 more) is impossible.
        let declined_mask = (1u64 << 1) | (1u64 << 2) | (1u64 << 3);
        assert!(is_split_vote(&s, declined_mask));
    }

    #[test]
    fn lower_vclock_candidate_is_refused_when_term_tied() {
        let mut s = state();
        s.vclock.set(0, 100);
        s.volatile.term = 1;
        let mut poor_vclock = Vclock::new();
        poor_vclock.set(3, 1);
        let effects = handle_request_vote(&mut s, 1, 3, &poor_vclock, false);
        assert!(matches!(effects[0], Effect::Send(3, RaftMessage::RequestVoteReply { granted: false, .. })));
    }

    #[test]
    fn pre_vote_gate_blocks_election_while_a_peer_witnesses_a_leader() {
        let mut s = RaftState::new(0, 3, 2);
        update_leader_witness(&mut s, 2, true);
        assert!(!can_start_election(&s, 0, 1_000));
        update_leader_witness(&mut s, 2, false);
        assert!(can_start_election(&s, 0, 1_000));
    }

    #[test]
    fn vote_reply_carrying_leader_seen_sets_witness_bit() {
        let mut s = state();
        start_election(&mut s);
        handle_vote_reply(&mut s, 1, 1, false, true);
        assert_ne!(s.derived.leader_witness_map & (1u64 << 1), 0);
    }
}
