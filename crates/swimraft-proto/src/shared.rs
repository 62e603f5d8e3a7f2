//! A small shared handle used to wire the Raft engine's leadership decisions
//! into the limbo queue's ownership without coupling the two protocols'
//! message types together. Raft writes to it whenever its leader changes;
//! the limbo engine polls it on every event and reconciles (§4.6).

use std::sync::{Arc, Mutex};
use swimraft_types::id::{Lsn, ReplicaId};

#[derive(Clone)]
pub struct OwnershipHandle(Arc<Mutex<Option<(ReplicaId, Lsn)>>>);

impl OwnershipHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub fn set(&self, owner: ReplicaId, border_lsn: Lsn) {
        *self.0.lock().unwrap() = Some((owner, border_lsn));
    }

    pub fn get(&self) -> Option<(ReplicaId, Lsn)> {
        *self.0.lock().unwrap()
    }
}

impl Default for OwnershipHandle {
    fn default() -> Self {
        Self::new()
    }
}
