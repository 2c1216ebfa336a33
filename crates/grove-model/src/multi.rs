//! Atomic multi-operation transaction triples.
//!
//! One [`Op`] per step, submitted as an ordered list; the service applies
//! all of them or none. Success yields one [`OpResult`] per step in the
//! same order; failure yields [`MultiError`] whose problems carry the
//! index of each step that reported an error.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acl::Acl;
use crate::path::NodePath;
use crate::status::{Disposition, Status};

/// One step of an atomic transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Create a node.
    Create {
        /// Path to create (final name may gain a sequence suffix).
        path: NodePath,
        /// Initial data.
        data: Vec<u8>,
        /// Initial ACL list; must be non-empty.
        acl: Vec<Acl>,
        /// Creation mode.
        disposition: Disposition,
        /// Time-to-live for TTL dispositions.
        ttl: Option<Duration>,
    },
    /// Delete a node, optionally guarded by its data version.
    Delete {
        /// Path to delete.
        path: NodePath,
        /// Expected data version; `None` skips the guard.
        version: Option<i32>,
    },
    /// Overwrite a node's data, optionally guarded by its data version.
    SetData {
        /// Path to write.
        path: NodePath,
        /// Replacement data.
        data: Vec<u8>,
        /// Expected data version; `None` skips the guard.
        version: Option<i32>,
    },
    /// Assert a node's data version without changing anything.
    Check {
        /// Path to check.
        path: NodePath,
        /// Version the node must currently have.
        version: i32,
    },
}

impl Op {
    /// The path this step addresses.
    pub fn path(&self) -> &NodePath {
        match self {
            Op::Create { path, .. }
            | Op::Delete { path, .. }
            | Op::SetData { path, .. }
            | Op::Check { path, .. } => path,
        }
    }
}

/// Successful outcome of one transaction step, positionally correlated
/// with the submitted ops.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpResult {
    /// A create succeeded; carries the final path (sequence suffix applied).
    Created {
        /// Path of the created node.
        path: NodePath,
    },
    /// A delete succeeded.
    Deleted,
    /// A data write succeeded; carries the node's fresh status.
    DataSet {
        /// Status after the write.
        status: Status,
    },
    /// A version check passed.
    Checked,
}

/// Failure detail for one transaction step.
#[derive(Debug)]
pub struct MultiProblem {
    /// Index of the step in the submitted op list.
    pub index: usize,
    /// What went wrong at that step.
    pub error: crate::error::GroveError,
}

/// An aborted transaction: no step was applied.
#[derive(Debug)]
pub struct MultiError {
    /// Per-step failure detail, in submission order.
    pub problems: Vec<MultiProblem>,
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transaction aborted")?;
        for problem in &self.problems {
            write!(f, "; step {}: {}", problem.index, problem.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
