//! Session lifecycle projections.
//!
//! These mirror the native client's connection identity and state; the
//! wrapper re-derives them on demand and never caches beyond the state
//! channel the facade exposes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the session with the coordination cluster.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No live connection; the client may still reconnect within the timeout.
    Disconnected,
    /// Connection establishment in progress.
    Connecting,
    /// Connected with a live session.
    Connected,
    /// Connected to a read-only server.
    ConnectedReadOnly,
    /// Connected, with credentials accepted.
    Authenticated,
    /// The session timed out server-side; ephemeral state is gone.
    Expired,
    /// Closed deliberately by the client.
    Closed,
}

impl SessionState {
    /// Whether operations can still be issued in this state.
    pub fn is_alive(self) -> bool {
        !matches!(self, SessionState::Expired | SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::ConnectedReadOnly => "connected-read-only",
            SessionState::Authenticated => "authenticated",
            SessionState::Expired => "expired",
            SessionState::Closed => "closed",
        })
    }
}

/// Identity of an established session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Server-assigned session id.
    pub id: u64,
    /// Negotiated session timeout.
    pub timeout: Duration,
    /// Whether the session was requested read-only.
    pub read_only: bool,
}

/// An authentication credential: scheme plus opaque bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Authentication scheme, e.g. `digest`.
    pub scheme: String,
    /// Scheme-specific payload, passed through verbatim.
    pub auth: Vec<u8>,
}

impl Credential {
    /// Builds a `digest` credential from `username:password` text.
    pub fn digest(userpass: &str) -> Self {
        Self {
            scheme: "digest".to_string(),
            auth: userpass.as_bytes().to_vec(),
        }
    }
}
