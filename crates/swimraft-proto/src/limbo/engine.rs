//! Hosts `LimboQueue` against the `Protocol<M>` SDK: the owner replicates
//! newly-submitted entries and confirmation/rollback decisions to followers,
//! and followers ack. Ownership itself is driven externally by whichever
//! replica Raft currently recognizes as leader (§4.6) — `set_owner` is called
//! by the node host whenever Raft's leader changes.

use super::entry::LimboEntry;
use super::messages::LimboMessage;
use super::queue::{LimboError, LimboQueue, WaitOutcome};
use crate::api::{FaultEvent, Protocol};
use crate::ctx_ext::Ctx;
use crate::shared::OwnershipHandle;
use bytes::Bytes;
use std::collections::HashMap;
use swimraft_types::config::LimboConfig;
use swimraft_types::envelope::ProtoTag;
use swimraft_types::id::{Lsn, NodeId, ReplicaId, TimerId};

pub struct LimboEngine {
    queue: LimboQueue,
    self_replica: ReplicaId,
    is_owner: bool,
    ownership: Option<OwnershipHandle>,
    replication_synchro_timeout_ns: u64,
    /// Outstanding `wait_complete` deadlines, keyed by the timer fired on
    /// expiry (§4.6 "Waiters").
    pending_waits: HashMap<TimerId, Lsn>,
    /// Resolutions ready to be picked up by `poll_wait`: populated either as
    /// soon as `outcome_for` settles or when a timed-out head waiter is told
    /// `NEED_ROLLBACK` (§4.6, §7).
    completions: HashMap<Lsn, WaitOutcome>,
}

impl LimboEngine {
    pub fn new(config: LimboConfig) -> Self {
        let queue = LimboQueue::new(config.instance_id, config.quorum, config.max_size);
        Self {
            queue,
            self_replica: config.instance_id,
            is_owner: false,
            ownership: None,
            replication_synchro_timeout_ns: config.replication_synchro_timeout_ns,
            pending_waits: HashMap::new(),
            completions: HashMap::new(),
        }
    }

    pub fn with_ownership_handle(mut self, handle: OwnershipHandle) -> Self {
        self.ownership = Some(handle);
        self
    }

    fn poll_ownership(&mut self, ctx: &mut Ctx<LimboMessage>) {
        if let Some(handle) = &self.ownership {
            if let Some((owner, border_lsn)) = handle.get() {
                if owner != self.queue.owner_id() {
                    self.set_owner(ctx, owner, border_lsn);
                }
            }
        }
    }

    pub fn queue(&self) -> &LimboQueue {
        &self.queue
    }

    /// Called by the node host whenever Raft's leadership changes. `border_lsn`
    /// is this replica's own last known durable point, used for confirm-then-
    /// rollback ownership transfer semantics (§4.6).
    pub fn set_owner(&mut self, ctx: &mut Ctx<LimboMessage>, new_owner: ReplicaId, border_lsn: Lsn) {
        let was_owner = self.is_owner;
        self.is_owner = new_owner == self.self_replica;
        if self.queue.owner_id() != new_owner {
            self.queue.transfer_ownership(new_owner, border_lsn);
        }
        if self.is_owner && !was_owner {
            let _ = ctx.broadcast(&LimboMessage::OwnerAnnounce { new_owner, border_lsn }, None);
        }
    }

    /// Called by the application layer (through the node host) to submit a
    /// new transaction. Only valid while this replica is the owner.
    pub fn submit_local(&mut self, ctx: &mut Ctx<LimboMessage>, data: Bytes) -> Result<Lsn, LimboError> {
        let entry = LimboEntry::new_volatile(self.self_replica, data.clone(), ctx.now());
        let lsn = self.queue.submit(self.self_replica, entry)?;
        let _ = ctx.broadcast(&LimboMessage::Assign { lsn, data }, None);
        self.queue.ack(self.self_replica, lsn);
        self.maybe_confirm(ctx);
        self.settle_ready_waits(ctx);
        Ok(lsn)
    }

    /// Submits and immediately rolls back a nop entry (§4.6 "Flush"): by the
    /// time it is rolled back every entry ahead of it has already left the
    /// volatile state, since LSNs are assigned in submission order.
    pub fn flush(&mut self, ctx: &mut Ctx<LimboMessage>) -> Result<(), LimboError> {
        let nop_lsn = self.submit_local(ctx, Bytes::new())?;
        self.queue.apply_rollback(nop_lsn);
        let _ = ctx.broadcast(&LimboMessage::Rollback { from_lsn: nop_lsn }, None);
        self.settle_ready_waits(ctx);
        Ok(())
    }

    /// Registers interest in `lsn`'s outcome (§4.6 "Waiters"). Returns the
    /// outcome immediately if it has already settled; otherwise arms a
    /// `replication_synchro_timeout` deadline and the caller should poll
    /// `poll_wait` again once notified (e.g. via `on_timer` driving a trigger,
    /// or simply by re-calling `wait_complete` after the next relevant
    /// message). On timeout with no settled outcome, `poll_wait` will
    /// eventually report `NeedRollback` if this was the head waiter, per
    /// `SYNC_ROLLBACK`/`SYNC_TIMEOUT` (§7).
    pub fn wait_complete(&mut self, ctx: &mut Ctx<LimboMessage>, lsn: Lsn) -> Option<WaitOutcome> {
        if let Some(outcome) = self.queue.outcome_for(lsn) {
            return Some(outcome);
        }
        let timer = ctx.set_timer(self.replication_synchro_timeout_ns as u128);
        self.pending_waits.insert(timer, lsn);
        None
    }

    /// Drains a completion previously produced for `lsn`, if any.
    pub fn poll_wait(&mut self, lsn: Lsn) -> Option<WaitOutcome> {
        self.completions.remove(&lsn)
    }

    fn maybe_confirm(&mut self, ctx: &mut Ctx<LimboMessage>) {
        let target = self.queue.volatile_confirmed_lsn();
        if target > self.queue.confirmed_lsn() {
            self.queue.apply_confirm(target);
            let _ = ctx.broadcast(&LimboMessage::Confirm { up_to_lsn: target }, None);
        }
    }

    /// Resolves any `wait_complete` registrations whose LSN has settled since
    /// it was armed, cancelling their timeout timer.
    fn settle_ready_waits(&mut self, ctx: &mut Ctx<LimboMessage>) {
        let armed: Vec<TimerId> = self.pending_waits.keys().copied().collect();
        for timer in armed {
            let lsn = self.pending_waits[&timer];
            if let Some(outcome) = self.queue.outcome_for(lsn) {
                self.pending_waits.remove(&timer);
                ctx.cancel_timer(timer);
                self.completions.insert(lsn, outcome);
            }
        }
    }

    fn resolve_wait_timeout(&mut self, lsn: Lsn) {
        if let Some(outcome) = self.queue.outcome_for(lsn) {
            self.completions.insert(lsn, outcome);
            return;
        }
        if self.queue.is_head(lsn) && lsn > self.queue.volatile_confirmed_lsn() {
            self.completions.insert(lsn, WaitOutcome::NeedRollback);
        }
        // Not the head waiter: another fiber is already resolving this
        // prefix. The caller re-arms with `wait_complete` to keep waiting.
    }
}

impl Protocol<LimboMessage> for LimboEngine {
    fn name(&self) -> &'static str {
        "limbo"
    }

    fn proto_tag(&self) -> ProtoTag {
        ProtoTag::LIMBO
    }

    fn init(&mut self, _ctx: &mut Ctx<LimboMessage>) {}

    fn on_message(&mut self, ctx: &mut Ctx<LimboMessage>, src: NodeId, msg: LimboMessage) {
        match msg {
            LimboMessage::Assign { lsn, data: _ } => {
                if !self.is_owner {
                    let _ = ctx.send(src, &LimboMessage::Ack { lsn, replica: self.self_replica });
                }
            }
            LimboMessage::Ack { lsn, replica } => {
                if self.is_owner {
                    self.queue.ack(replica, lsn);
                    self.maybe_confirm(ctx);
                }
            }
            LimboMessage::Confirm { up_to_lsn } => {
                self.queue.apply_confirm(up_to_lsn);
            }
            LimboMessage::Rollback { from_lsn } => {
                self.queue.apply_rollback(from_lsn);
            }
            LimboMessage::OwnerAnnounce { new_owner, border_lsn } => {
                if self.queue.owner_id() != new_owner {
                    self.queue.transfer_ownership(new_owner, border_lsn);
                    self.is_owner = new_owner == self.self_replica;
                }
            }
        }
        self.poll_ownership(ctx);
        self.settle_ready_waits(ctx);
    }

    fn on_timer(&mut self, _ctx: &mut Ctx<LimboMessage>, timer: TimerId) {
        if let Some(lsn) = self.pending_waits.remove(&timer) {
            self.resolve_wait_timeout(lsn);
        }
    }

    fn on_fault(&mut self, _ctx: &mut Ctx<LimboMessage>, fault: FaultEvent) {
        if let FaultEvent::NodeCrashed = fault {
            self.is_owner = false;
        }
    }
}
