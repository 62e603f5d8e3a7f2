//! Raft leader-election state machine (§4.5). Split into pure transition
//! logic (`logic`), the state shape (`state`), and the hosted `Protocol<M>`
//! implementation (`engine`) so the transitions can be unit-tested without a
//! `Ctx`.

pub mod engine;
pub mod logic;
pub mod state;

pub use engine::RaftEngine;
pub use logic::RaftMessage;
pub use state::{Role};

#[derive(Debug, thiserror::Error)]
pub enum RaftError {
    #[error("vote request from {candidate} at term {term} rejected: inferior vclock")]
    InferiorVclock { candidate: swimraft_types::id::ReplicaId, term: swimraft_types::id::Term },
    #[error("instance id {0} already set")]
    InstanceIdAlreadySet(swimraft_types::id::ReplicaId),
}
