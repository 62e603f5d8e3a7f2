//! # swimraft-types::metrics
//!
//! Metric name and label constants. Centralizing these prevents typos and
//! keeps the engine (where metrics are emitted) and any consumer (Prometheus
//! exporter, tests) in agreement.

// --- Metric names: transport ---
pub const MET_NET_MSG_SENT: &str = "swimraft_net_msg_sent_total";
pub const MET_NET_MSG_DELIVERED: &str = "swimraft_net_msg_delivered_total";
pub const MET_NET_MSG_DROPPED: &str = "swimraft_net_msg_dropped_total";
pub const MET_LATENCY_HISTO: &str = "swimraft_net_latency_ns";

// --- Metric names: engine ---
pub const MET_TIMER_FIRED: &str = "swimraft_timer_fired_total";
pub const MET_NODE_CRASHED: &str = "swimraft_node_crashed_total";
pub const MET_NODE_RESTARTED: &str = "swimraft_node_restarted_total";
pub const MET_STORE_WRITE_ERR: &str = "swimraft_store_write_errors_total";
pub const MET_EVENT_EXEC_HISTO: &str = "swimraft_event_exec_ns";

// --- Metric names: SWIM ---
pub const MET_SWIM_PROBE_SENT: &str = "swimraft_swim_probe_sent_total";
pub const MET_SWIM_ACK_RECEIVED: &str = "swimraft_swim_ack_received_total";
pub const MET_SWIM_MEMBER_SUSPECTED: &str = "swimraft_swim_member_suspected_total";
pub const MET_SWIM_MEMBER_DEAD: &str = "swimraft_swim_member_dead_total";
pub const MET_SWIM_MEMBERS_GAUGE: &str = "swimraft_swim_members";
pub const MET_SWIM_REFUTATIONS: &str = "swimraft_swim_refutations_total";

// --- Metric names: Raft ---
pub const MET_RAFT_ELECTIONS_STARTED: &str = "swimraft_raft_elections_started_total";
pub const MET_RAFT_TERM_GAUGE: &str = "swimraft_raft_term";
pub const MET_RAFT_ROLE_CHANGES: &str = "swimraft_raft_role_changes_total";
pub const MET_RAFT_SPLIT_VOTES: &str = "swimraft_raft_split_votes_total";

// --- Metric names: limbo ---
pub const MET_LIMBO_QUEUE_LEN_GAUGE: &str = "swimraft_limbo_queue_len";
pub const MET_LIMBO_CONFIRMED_LSN_GAUGE: &str = "swimraft_limbo_confirmed_lsn";
pub const MET_LIMBO_ROLLBACKS: &str = "swimraft_limbo_rollbacks_total";

// --- Label keys ---
pub const LBL_NODE: &str = "node";
pub const LBL_SRC: &str = "src";
pub const LBL_DST: &str = "dst";
pub const LBL_LINK: &str = "link";
pub const LBL_EVENT: &str = "event";
pub const LBL_PROTO: &str = "proto";
pub const LBL_REASON: &str = "reason";
pub const LBL_KIND: &str = "kind";
pub const LBL_MEMBER: &str = "member";
