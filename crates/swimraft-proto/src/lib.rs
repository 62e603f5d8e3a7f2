//! # swimraft-proto
//!
//! The SDK for implementing distributed protocols hosted by `swimraft-engine`.
//! It defines the core traits (`Protocol`, `ProtocolDyn`) and the context
//! object (`Ctx`) that protocols use to interact with the host, and the three
//! protocol implementations built against that SDK: `swim` (membership and
//! failure detection), `raft` (leader election), and `limbo` (synchronous
//! replication's transaction queue, owned by the Raft-elected leader).

#![forbid(unsafe_code)]

pub mod api;
pub mod ctx_ext;
pub mod limbo;
pub mod raft;
pub mod shared;
pub mod swim;

pub use api::{FaultEvent, Protocol, ProtocolDyn};
pub use ctx_ext::Ctx;
pub use shared::OwnershipHandle;
