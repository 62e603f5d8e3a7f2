//! Synchronous-replication transaction limbo queue (§3.3, §4.6): entries
//! wait here between submission and quorum-confirmed durability, bound to
//! whichever replica Raft currently recognizes as leader.

pub mod engine;
pub mod entry;
pub mod messages;
pub mod queue;

pub use engine::LimboEngine;
pub use entry::{EntryState, LimboEntry};
pub use messages::LimboMessage;
pub use queue::{LimboError, LimboQueue, WaitOutcome};
