//! Fluent builder for atomic multi-operation transactions.
//!
//! Steps accumulate in order and are submitted in one shot; the service
//! applies all of them or none.
//!
//! ```ignore
//! let results = Transaction::new()
//!     .check("/config", 3)
//!     .set_data("/config/active", b"blue".to_vec(), None)
//!     .create("/config/history-", b"blue".to_vec(), vec![Acl::open()],
//!             Disposition::PersistentSequential)
//!     .commit(&client)
//!     .await?;
//! ```

use grove_model::{Acl, Disposition, GroveError, NodePath, Op, OpResult};

use crate::client::Client;

/// An ordered list of steps awaiting atomic submission.
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    ops: Vec<Op>,
}

impl Transaction {
    /// An empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a create step.
    pub fn create(
        mut self,
        path: impl Into<NodePath>,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
    ) -> Self {
        self.ops.push(Op::Create {
            path: path.into(),
            data,
            acl,
            disposition,
            ttl: None,
        });
        self
    }

    /// Appends a delete step.
    pub fn delete(mut self, path: impl Into<NodePath>, version: Option<i32>) -> Self {
        self.ops.push(Op::Delete {
            path: path.into(),
            version,
        });
        self
    }

    /// Appends a data-write step.
    pub fn set_data(
        mut self,
        path: impl Into<NodePath>,
        data: Vec<u8>,
        version: Option<i32>,
    ) -> Self {
        self.ops.push(Op::SetData {
            path: path.into(),
            data,
            version,
        });
        self
    }

    /// Appends a version assertion.
    pub fn check(mut self, path: impl Into<NodePath>, version: i32) -> Self {
        self.ops.push(Op::Check {
            path: path.into(),
            version,
        });
        self
    }

    /// Appends an already-built op.
    pub fn op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    /// Number of accumulated steps.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether no steps have been added.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Submits the steps for atomic application.
    pub async fn commit(self, client: &Client) -> Result<Vec<OpResult>, GroveError> {
        client.transact(self.ops).await
    }
}
