//! SWIM membership and failure-detection gossip engine (§4.1).
//!
//! `engine::SwimEngine` is the `ProtocolDyn` implementation hosted by the
//! engine; the other submodules are its building blocks, factored the way
//! they are independently testable and independently grounded.

pub mod codec;
pub mod crypto;
pub mod dissemination;
pub mod engine;
pub mod failure_detector;
pub mod member;
pub mod scheduler;
pub mod table;
pub mod triggers;

pub use engine::SwimEngine;
pub use member::{Incarnation, MemberRecord, MemberStatus};

#[derive(Debug, thiserror::Error)]
pub enum SwimError {
    #[error(transparent)]
    Codec(#[from] swimraft_types::errors::CodecError),
    #[error("swim config rejected: {0}")]
    Config(String),
    #[error("operation rejected: {0}")]
    Rejected(String),
}
