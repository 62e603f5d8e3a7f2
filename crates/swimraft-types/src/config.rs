//! # swimraft-types::config
//!
//! Strongly-typed configuration, mirroring the shape of the scenario/config
//! files. `serde` parses TOML/YAML into these structs (§4.9).

use crate::id::ReplicaId;
use serde::{Deserialize, Serialize};

/// A wrapper for the RNG seed to make its purpose explicit at call sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RngSeed(pub u64);

/// A specification for a deterministic probability distribution for delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DelayDist {
    Const(u64),
    Uniform { lo: u64, hi: u64 },
    Normal { mu: f64, sigma: f64 },
    Pareto { scale: f64, shape: f64 },
}

/// A specification for a Bernoulli trial (a coin flip), used by fault
/// injection (drop/corrupt probabilities).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bernoulli(pub f64);

/// GC mode governing when a dead member record is evicted from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcMode {
    /// Evict dead members after the dissemination-bounded TTL.
    On,
    /// Never evict; dead members are kept forever (diagnostic use).
    Off,
}

impl Default for GcMode {
    fn default() -> Self {
        GcMode::On
    }
}

/// Live configuration for a SWIM instance (§4.9, §6 "Configuration knobs").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwimConfig {
    /// The address this instance binds to and advertises as its source.
    pub uri: String,
    /// Period, in nanoseconds, between successive protocol rounds.
    pub heartbeat_rate_ns: u64,
    /// Time, in nanoseconds, to wait for a direct ack before escalating to
    /// indirect pings.
    pub ack_timeout_ns: u64,
    #[serde(default)]
    pub gc_mode: GcMode,
    /// Number of indirect-probe relays per suspected member (K in the
    /// literature); the source caps this at `num_members - 2`.
    #[serde(default = "default_num_failure_detection_subgroups")]
    pub num_failure_detection_subgroups: usize,
    /// Arbitrary application payload attached to this instance's member
    /// record and disseminated verbatim.
    #[serde(default)]
    pub payload: Vec<u8>,
    /// Pre-shared key for AEAD encryption of the wire protocol, if any.
    #[serde(default)]
    pub codec: Option<CryptoConfig>,
    /// Multiplier `C` in `ttd = ceil(log2(cluster_size)) * C` (§4.1):
    /// how many times an update is piggybacked before it is presumed to have
    /// reached every member via gossip.
    #[serde(default = "default_dissemination_multiplier")]
    pub dissemination_multiplier: u32,
}

fn default_num_failure_detection_subgroups() -> usize {
    3
}

fn default_dissemination_multiplier() -> u32 {
    3
}

/// AEAD transport encryption configuration (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    pub algo: CryptoAlgo,
    pub mode: CryptoMode,
    /// Raw key bytes; length must match `algo`'s required key size.
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoAlgo {
    Aes128,
    Aes192,
    Aes256,
    /// Test-only; never selected by production defaults.
    Des,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoMode {
    Ecb,
    Cbc,
    Cfb,
    Ofb,
}

/// Live configuration for a Raft instance (§4.5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaftConfig {
    pub is_enabled: bool,
    pub is_candidate: bool,
    /// Base election timeout, in nanoseconds, before randomized shift.
    pub election_timeout_ns: u64,
    /// Number of votes (inclusive of self) required to become leader.
    pub election_quorum: usize,
    /// Time, in nanoseconds, after which an unreachable leader is presumed
    /// dead by its peers (informs SWIM-driven leader-witness expiry).
    pub death_timeout_ns: u64,
    /// Maximum randomized addition to the election timeout, as a fraction
    /// of `election_timeout_ns` (source clamps this to [0, 1)).
    pub max_shift: f64,
    pub instance_id: ReplicaId,
    pub cluster_size: usize,
}

/// Live configuration for a limbo queue instance (§3.3, §4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimboConfig {
    pub instance_id: ReplicaId,
    /// Number of replicas (inclusive of the owner) that must ack an entry
    /// before it is considered quorum-durable.
    pub quorum: usize,
    /// Backpressure bound on the total `approx_len` of entries awaiting
    /// confirmation, in bytes.
    #[serde(default = "default_limbo_max_size")]
    pub max_size: usize,
    /// How long `wait_complete` lets a submitter block on an entry before
    /// deciding (possibly `NEED_ROLLBACK`), in simulated nanoseconds.
    #[serde(default = "default_replication_synchro_timeout_ns")]
    pub replication_synchro_timeout_ns: u64,
}

fn default_limbo_max_size() -> usize {
    16 * 1024 * 1024
}

fn default_replication_synchro_timeout_ns() -> u64 {
    5_000_000_000
}
