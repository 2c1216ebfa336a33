//! Node status snapshots and creation dispositions.

use serde::{Deserialize, Serialize};

/// Creation mode of a node, consumed only at create time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// Survives the creating session.
    #[default]
    Persistent,
    /// Persistent, with a unique monotonically increasing name suffix.
    PersistentSequential,
    /// Deleted when the creating session ends.
    Ephemeral,
    /// Ephemeral with a sequence suffix.
    EphemeralSequential,
    /// Persistent, eligible for server-side expiry after its TTL once childless.
    PersistentTtl,
    /// TTL variant with a sequence suffix.
    PersistentSequentialTtl,
    /// Persistent, reaped by the server once it has been childless for a while.
    Container,
}

impl Disposition {
    /// Whether the server appends a sequence suffix to the name.
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            Disposition::PersistentSequential
                | Disposition::EphemeralSequential
                | Disposition::PersistentSequentialTtl
        )
    }

    /// Whether the node's lifetime is tied to the creating session.
    pub fn is_ephemeral(self) -> bool {
        matches!(self, Disposition::Ephemeral | Disposition::EphemeralSequential)
    }

    /// Whether the node carries a time-to-live.
    pub fn is_ttl(self) -> bool {
        matches!(
            self,
            Disposition::PersistentTtl | Disposition::PersistentSequentialTtl
        )
    }

    /// Whether this is a container node.
    pub fn is_container(self) -> bool {
        matches!(self, Disposition::Container)
    }
}

/// Point-in-time metadata snapshot of a node.
///
/// Produced fresh on every query; never cached by this crate and never
/// mutated. Transaction ids (`*txid` fields) come from the service's global
/// mutation sequence; timestamps are milliseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Transaction id that created the node.
    pub ctxid: i64,
    /// Transaction id of the last data write.
    pub mtxid: i64,
    /// Transaction id of the last child-list change.
    pub ptxid: i64,
    /// Creation time, epoch millis.
    pub ctime_ms: i64,
    /// Last data-write time, epoch millis.
    pub mtime_ms: i64,
    /// Data version, bumped on every data write.
    pub version: i32,
    /// Child-list version, bumped on every create/delete beneath the node.
    pub cversion: i32,
    /// ACL version, bumped on every ACL write.
    pub aversion: i32,
    /// Owning session id for ephemeral nodes, zero otherwise.
    pub ephemeral_owner: u64,
    /// Length of the node's data in bytes.
    pub data_length: u32,
    /// Number of direct children.
    pub num_children: u32,
}

impl Status {
    /// Whether the node is ephemeral (owned by some session).
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral_owner != 0
    }
}
