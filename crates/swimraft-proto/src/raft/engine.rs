//! Hosts the pure transition logic in `logic` against the `Protocol<M>` SDK:
//! schedules the randomized election timer, persists term/vote via the
//! host's `StoreView`, and turns `Effect`s into `Ctx` calls (§4.5, §5).

use super::logic::{self, Effect, RaftMessage};
use super::state::{RaftState, Role};
use crate::api::{FaultEvent, Protocol};
use crate::ctx_ext::Ctx;
use crate::shared::OwnershipHandle;
use swimraft_types::config::RaftConfig;
use swimraft_types::envelope::ProtoTag;
use swimraft_types::id::{NodeId, ReplicaId, TimerId};

pub struct RaftEngine {
    config: RaftConfig,
    state: RaftState,
    election_timer: Option<TimerId>,
    declined_mask: u64,
    /// Set by `FaultEvent::SplitVoteInjected`; consumed by the next election
    /// this instance starts.
    force_split_vote: bool,
    peer_nodes: Vec<NodeId>,
    /// Published to the limbo queue whenever the leader changes, so
    /// transaction ownership follows Raft leadership (§4.6) without the two
    /// protocols sharing a message type.
    ownership: Option<OwnershipHandle>,
}

impl RaftEngine {
    pub fn new(config: RaftConfig, peer_nodes: Vec<NodeId>) -> Self {
        let state = RaftState::new(config.instance_id, config.cluster_size, config.election_quorum);
        Self {
            config,
            state,
            election_timer: None,
            declined_mask: 0,
            force_split_vote: false,
            peer_nodes,
            ownership: None,
        }
    }

    pub fn with_ownership_handle(mut self, handle: OwnershipHandle) -> Self {
        self.ownership = Some(handle);
        self
    }

    fn publish_ownership(&self) {
        if let (Some(handle), Some(leader)) = (&self.ownership, self.state.derived.leader) {
            handle.set(leader, self.state.vclock.get(leader));
        }
    }

    pub fn role(&self) -> Role {
        self.state.derived.role
    }

    pub fn term(&self) -> swimraft_types::id::Term {
        self.state.volatile.term
    }

    pub fn leader(&self) -> Option<ReplicaId> {
        self.state.derived.leader
    }

    /// Fed by the limbo queue / replication layer as it learns peer LSNs, so
    /// Raft's vote tie-break has up-to-date log-completeness information.
    pub fn note_peer_lsn(&mut self, replica: ReplicaId, lsn: swimraft_types::id::Lsn) {
        self.state.vclock.advance(replica, lsn);
    }

    fn replica_node(&self, replica: ReplicaId) -> Option<NodeId> {
        self.peer_nodes.get(replica as usize).copied()
    }

    fn randomized_timeout(&self, ctx: &mut Ctx<RaftMessage>) -> swimraft_types::time::SimTime {
        let base = self.config.election_timeout_ns as u128;
        if self.config.max_shift <= 0.0 {
            return base;
        }
        let shift_unit = (ctx.rng_u64() % 1000) as f64 / 1000.0;
        let shift = (base as f64 * self.config.max_shift * shift_unit) as u128;
        base + shift
    }

    fn apply_effects(&mut self, ctx: &mut Ctx<RaftMessage>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(replica, msg) => {
                    if let Some(node) = self.replica_node(replica) {
                        let _ = ctx.send(node, &msg);
                    }
                }
                Effect::Broadcast(msg) => {
                    let _ = ctx.broadcast(&msg, None);
                }
                Effect::PersistVote { term, vote } => {
                    self.persist_vote(ctx, term, vote);
                }
                Effect::ResetElectionTimer => {
                    self.reset_election_timer(ctx);
                }
                Effect::RoleChanged(_role) => {
                    ctx.log_kv("raft_role", &format!("{:?}", self.state.derived.role));
                }
            }
        }
    }

    fn persist_vote(&mut self, ctx: &mut Ctx<RaftMessage>, term: swimraft_types::id::Term, vote: Option<ReplicaId>) {
        let data = format!("term={term},vote={vote:?}").into_bytes();
        let mut store = ctx.store();
        let _ = store.append_log(crate::api::LogRecord { term, data: data.into() });
        drop(store);
        logic::process_async(&mut self.state, term, vote);
    }

    fn reset_election_timer(&mut self, ctx: &mut Ctx<RaftMessage>) {
        if let Some(t) = self.election_timer.take() {
            ctx.cancel_timer(t);
        }
        if self.config.is_enabled {
            let after = self.randomized_timeout(ctx);
            self.election_timer = Some(ctx.set_timer(after));
        }
    }

    fn maybe_start_election(&mut self, ctx: &mut Ctx<RaftMessage>) {
        if !self.config.is_enabled || !self.config.is_candidate {
            return;
        }
        if !logic::can_start_election(&self.state, ctx.now(), self.config.death_timeout_ns) {
            self.reset_election_timer(ctx);
            return;
        }
        self.declined_mask = 0;
        let effects = logic::start_election(&mut self.state);
        self.apply_effects(ctx, effects);
        if self.force_split_vote {
            self.force_split_vote = false;
            self.declined_mask = logic::synthetic_split_vote_mask(&self.state);
            if logic::is_split_vote(&self.state, self.declined_mask) {
                ctx.log_kv("raft_split_vote", "injected");
            }
        }
        self.reset_election_timer(ctx);
    }
}

impl Protocol<RaftMessage> for RaftEngine {
    fn name(&self) -> &'static str {
        "raft"
    }

    fn proto_tag(&self) -> ProtoTag {
        ProtoTag::RAFT
    }

    fn init(&mut self, ctx: &mut Ctx<RaftMessage>) {
        self.reset_election_timer(ctx);
    }

    fn on_message(&mut self, ctx: &mut Ctx<RaftMessage>, _src: NodeId, msg: RaftMessage) {
        // §4.5 rule 4: a disabled instance takes no part in voting or
        // leadership tracking at all.
        if !self.config.is_enabled {
            return;
        }
        match msg {
            RaftMessage::RequestVote { term, candidate, vclock, is_leader_seen } => {
                let effects = logic::handle_request_vote(&mut self.state, term, candidate, &vclock, is_leader_seen);
                self.apply_effects(ctx, effects);
            }
            RaftMessage::RequestVoteReply { term, voter, granted, is_leader_seen } => {
                if !granted {
                    self.declined_mask |= 1u64 << voter;
                }
                let (effects, _became_leader) = logic::handle_vote_reply(&mut self.state, term, voter, granted, is_leader_seen);
                self.apply_effects(ctx, effects);
                if logic::is_split_vote(&self.state, self.declined_mask) {
                    ctx.log_kv("raft_split_vote", "true");
                    self.reset_election_timer(ctx);
                }
            }
            RaftMessage::Heartbeat { term, leader } => {
                let effects = logic::handle_heartbeat(&mut self.state, term, leader, ctx.now());
                self.apply_effects(ctx, effects);
            }
            RaftMessage::HeartbeatReply { .. } => {}
            RaftMessage::Resign { term, leader } => {
                logic::handle_resign(&mut self.state, term, leader);
                self.maybe_start_election(ctx);
            }
        }
        self.publish_ownership();
    }

    fn on_timer(&mut self, ctx: &mut Ctx<RaftMessage>, timer: TimerId) {
        if Some(timer) == self.election_timer {
            self.election_timer = None;
            self.maybe_start_election(ctx);
        }
    }

    fn on_fault(&mut self, ctx: &mut Ctx<RaftMessage>, fault: FaultEvent) {
        match fault {
            FaultEvent::NodeCrashed => {
                if self.state.derived.role == Role::Leader {
                    let effects = logic::resign(&mut self.state);
                    self.apply_effects(ctx, effects);
                }
            }
            FaultEvent::SplitVoteInjected => {
                self.force_split_vote = true;
            }
            _ => {}
        }
    }
}
