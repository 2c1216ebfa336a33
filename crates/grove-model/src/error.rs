//! Error taxonomy for coordination operations.
//!
//! The native client reports failures as numeric codes; the facade maps
//! each code (plus the path it fired for, where one applies) into
//! [`GroveError`]. Every variant renders as a single user-facing line.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::multi::MultiError;

/// Numeric failure code as reported by the native coordination client.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Success; never surfaced as an error.
    pub const OK: ErrorCode = ErrorCode(0);
    /// Connection to the cluster was lost mid-operation.
    pub const CONNECTION_LOSS: ErrorCode = ErrorCode(-4);
    /// The server does not implement the requested operation.
    pub const UNIMPLEMENTED: ErrorCode = ErrorCode(-6);
    /// The target node does not exist.
    pub const NO_NODE: ErrorCode = ErrorCode(-101);
    /// The session lacks permission for the operation.
    pub const NO_AUTH: ErrorCode = ErrorCode(-102);
    /// A version guard did not match the node's current version.
    pub const BAD_VERSION: ErrorCode = ErrorCode(-103);
    /// Ephemeral nodes cannot have children.
    pub const NO_CHILDREN_FOR_EPHEMERALS: ErrorCode = ErrorCode(-108);
    /// The target node already exists.
    pub const NODE_EXISTS: ErrorCode = ErrorCode(-110);
    /// The node still has children.
    pub const NOT_EMPTY: ErrorCode = ErrorCode(-111);
    /// The session has expired server-side.
    pub const SESSION_EXPIRED: ErrorCode = ErrorCode(-112);
    /// The supplied ACL list was rejected.
    pub const INVALID_ACL: ErrorCode = ErrorCode(-114);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure taxonomy surfaced by the client facade.
#[derive(Debug, Error)]
pub enum GroveError {
    /// The target node does not exist.
    #[error("{path}: no such node")]
    NoNode {
        /// Path the operation addressed.
        path: String,
    },

    /// A version guard did not match.
    #[error("{path}: version mismatch")]
    BadVersion {
        /// Path the operation addressed.
        path: String,
    },

    /// Create hit an existing node.
    #[error("{path}: node already exists")]
    NodeExists {
        /// Path the operation addressed.
        path: String,
    },

    /// Delete hit a node that still has children.
    #[error("{path}: node has children")]
    NotEmpty {
        /// Path the operation addressed.
        path: String,
    },

    /// The ACL list was rejected (empty, or refused by the server).
    #[error("{path}: invalid acl")]
    InvalidAcl {
        /// Path the operation addressed.
        path: String,
    },

    /// Create addressed a child of an ephemeral node.
    #[error("{path}: ephemeral nodes cannot have children")]
    NoChildrenForEphemerals {
        /// Path of the ephemeral parent.
        path: String,
    },

    /// Connection to the cluster was lost; the command may be retried.
    #[error("connection lost")]
    ConnectionLoss,

    /// The session expired; ephemeral state tied to it is gone.
    #[error("session expired")]
    SessionExpired,

    /// The session is not authorized for the operation.
    #[error("not authorized")]
    NoAuth,

    /// The server does not implement the requested operation.
    #[error("operation not implemented by this server")]
    Unimplemented,

    /// An atomic multi-operation transaction aborted.
    #[error(transparent)]
    Multi(#[from] MultiError),

    /// Any other native-client code, preserved numerically.
    #[error("coordination error {code} ({path})")]
    Coordination {
        /// Raw native code.
        code: i32,
        /// Path the operation addressed, empty for session-level failures.
        path: String,
    },
}

impl GroveError {
    /// Maps a native code to the taxonomy, attaching `path` where the
    /// variant is per-node.
    pub fn from_code(code: ErrorCode, path: &str) -> GroveError {
        match code {
            ErrorCode::NO_NODE => GroveError::NoNode { path: path.to_string() },
            ErrorCode::BAD_VERSION => GroveError::BadVersion { path: path.to_string() },
            ErrorCode::NODE_EXISTS => GroveError::NodeExists { path: path.to_string() },
            ErrorCode::NOT_EMPTY => GroveError::NotEmpty { path: path.to_string() },
            ErrorCode::INVALID_ACL => GroveError::InvalidAcl { path: path.to_string() },
            ErrorCode::NO_CHILDREN_FOR_EPHEMERALS => GroveError::NoChildrenForEphemerals {
                path: path.to_string(),
            },
            ErrorCode::CONNECTION_LOSS => GroveError::ConnectionLoss,
            ErrorCode::SESSION_EXPIRED => GroveError::SessionExpired,
            ErrorCode::NO_AUTH => GroveError::NoAuth,
            ErrorCode::UNIMPLEMENTED => GroveError::Unimplemented,
            other => GroveError::Coordination {
                code: other.0,
                path: path.to_string(),
            },
        }
    }

    /// Whether the failure concerns the whole session rather than one node.
    ///
    /// Session-level failures abort the surrounding command instead of being
    /// reported per-path and skipped.
    pub fn is_session_level(&self) -> bool {
        matches!(
            self,
            GroveError::ConnectionLoss | GroveError::SessionExpired | GroveError::NoAuth
        )
    }
}

/// Shorthand result over [`GroveError`].
pub type Result<T> = std::result::Result<T, GroveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping_attaches_path() {
        let err = GroveError::from_code(ErrorCode::NO_NODE, "/a/b");
        assert_eq!(err.to_string(), "/a/b: no such node");
        let err = GroveError::from_code(ErrorCode::BAD_VERSION, "/a");
        assert_eq!(err.to_string(), "/a: version mismatch");
    }

    #[test]
    fn test_session_level_codes_ignore_path() {
        let err = GroveError::from_code(ErrorCode::SESSION_EXPIRED, "/ignored");
        assert_eq!(err.to_string(), "session expired");
        assert!(err.is_session_level());
        assert!(GroveError::from_code(ErrorCode::CONNECTION_LOSS, "").is_session_level());
        assert!(!GroveError::from_code(ErrorCode::NO_NODE, "/a").is_session_level());
    }

    #[test]
    fn test_unknown_code_preserved() {
        let err = GroveError::from_code(ErrorCode(-999), "/x");
        assert_eq!(err.to_string(), "coordination error -999 (/x)");
    }
}
