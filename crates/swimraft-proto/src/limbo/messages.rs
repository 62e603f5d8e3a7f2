//! Wire messages for replicating limbo entries from the owning leader to
//! followers and aggregating their acks (§4.6).

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use swimraft_types::id::{Lsn, ReplicaId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LimboMessage {
    /// Leader replicates a newly-assigned entry to a follower.
    Assign { lsn: Lsn, data: Bytes },
    /// Follower acknowledges durability of its log up to `lsn`.
    Ack { lsn: Lsn, replica: ReplicaId },
    /// Leader informs followers a prefix is now quorum-durable.
    Confirm { up_to_lsn: Lsn },
    /// Leader informs followers to discard everything from `from_lsn` on.
    Rollback { from_lsn: Lsn },
    /// New owner announces itself after a leadership change, carrying its
    /// own last known durable point so followers can reconcile (§4.6).
    OwnerAnnounce { new_owner: ReplicaId, border_lsn: Lsn },
}
