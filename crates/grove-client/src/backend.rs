//! The native-client seam.
//!
//! [`Backend`] is the boundary between this crate and the native
//! coordination client: string paths in, numeric [`ErrorCode`]s out, watch
//! deliveries pushed onto channels from whatever thread the native client
//! notifies on. The facade in [`crate::client`] owns all translation into
//! the typed error taxonomy.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use grove_model::{
    Acl, Credential, Disposition, ErrorCode, Event, NodePath, Op, OpResult, SessionInfo,
    SessionState, Status,
};

/// Default client port of the coordination service.
pub const DEFAULT_PORT: u16 = 2181;

/// Default session timeout requested at connect.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// One `host[:port]` member of the server ensemble.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerAddr {
    /// Hostname or address literal.
    pub host: String,
    /// Client port.
    pub port: u16,
}

/// A malformed `host[:port]` server argument.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid server address '{0}'")]
pub struct AddrError(pub String);

impl FromStr for ServerAddr {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self, AddrError> {
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port_text)) => {
                let port = port_text.parse().map_err(|_| AddrError(s.to_string()))?;
                (host, port)
            }
            None => (s, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(AddrError(s.to_string()));
        }
        Ok(ServerAddr {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The server ensemble a session connects to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnsembleConfig {
    /// Ensemble members, tried in order.
    pub servers: Vec<ServerAddr>,
}

impl EnsembleConfig {
    /// Parses a list of `host[:port]` arguments.
    pub fn parse(args: &[String]) -> Result<Self, AddrError> {
        let servers = args
            .iter()
            .map(|arg| arg.parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EnsembleConfig { servers })
    }
}

impl fmt::Display for EnsembleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, server) in self.servers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{server}")?;
        }
        Ok(())
    }
}

/// Session parameters requested at connect time.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Session timeout to negotiate.
    pub timeout: Duration,
    /// Request a read-only session.
    pub read_only: bool,
    /// Credentials to present immediately after the handshake.
    pub credentials: Vec<Credential>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SESSION_TIMEOUT,
            read_only: false,
            credentials: Vec::new(),
        }
    }
}

/// Result alias for raw backend calls.
pub type CodeResult<T> = Result<T, ErrorCode>;

/// Outcome of an atomic multi submission at the backend layer.
#[derive(Debug)]
pub enum MultiOutcome {
    /// Every step applied; one result per step, in order.
    Committed(Vec<OpResult>),
    /// Nothing applied; `(step index, code)` for each step that errored.
    Failed(Vec<(usize, ErrorCode)>),
}

/// Operations the native coordination client offers.
///
/// Watch-registering variants pair the read result with a channel the
/// native client pushes events onto; one-shot watches close the channel
/// after the first delivery. Implementations must never partially apply
/// [`Backend::multi`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Creates a node; returns the final path (sequence suffix applied).
    async fn create(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
        ttl: Option<Duration>,
    ) -> CodeResult<NodePath>;

    /// Deletes a node, optionally guarded by its data version.
    async fn delete(&self, path: &NodePath, version: Option<i32>) -> CodeResult<()>;

    /// Returns the node's status, or `None` if it does not exist.
    async fn exists(&self, path: &NodePath) -> CodeResult<Option<Status>>;

    /// Like [`Backend::exists`], additionally watching for the node's
    /// creation, deletion, or next data change.
    async fn exists_watch(
        &self,
        path: &NodePath,
    ) -> CodeResult<(Option<Status>, mpsc::UnboundedReceiver<Event>)>;

    /// Reads data and status.
    async fn get_data(&self, path: &NodePath) -> CodeResult<(Vec<u8>, Status)>;

    /// Like [`Backend::get_data`], additionally watching for the next data
    /// change or deletion.
    async fn get_data_watch(
        &self,
        path: &NodePath,
    ) -> CodeResult<(Vec<u8>, Status, mpsc::UnboundedReceiver<Event>)>;

    /// Overwrites data, optionally guarded by the data version.
    async fn set_data(&self, path: &NodePath, data: Vec<u8>, version: Option<i32>)
        -> CodeResult<Status>;

    /// Lists child names in lexical order.
    async fn children(&self, path: &NodePath) -> CodeResult<Vec<String>>;

    /// Like [`Backend::children`], additionally watching for the next
    /// child-list change or deletion.
    async fn children_watch(
        &self,
        path: &NodePath,
    ) -> CodeResult<(Vec<String>, mpsc::UnboundedReceiver<Event>)>;

    /// Registers a persistent watch on a node or (recursively) a subtree.
    async fn watch_persistent(
        &self,
        path: &NodePath,
        recursive: bool,
    ) -> CodeResult<mpsc::UnboundedReceiver<Event>>;

    /// Reads the node's ACL list and status.
    async fn get_acl(&self, path: &NodePath) -> CodeResult<(Vec<Acl>, Status)>;

    /// Replaces the node's ACL list, optionally guarded by the ACL version.
    async fn set_acl(&self, path: &NodePath, acl: Vec<Acl>, version: Option<i32>)
        -> CodeResult<Status>;

    /// Submits an ordered op list for atomic application.
    async fn multi(&self, ops: Vec<Op>) -> CodeResult<MultiOutcome>;

    /// Presents a credential on the live session.
    async fn add_auth(&self, credential: Credential) -> CodeResult<()>;

    /// Identity of the established session.
    fn session(&self) -> SessionInfo;

    /// Observable session lifecycle state.
    fn state(&self) -> watch::Receiver<SessionState>;

    /// Closes the session, releasing ephemerals it owns.
    async fn close(&self) -> CodeResult<()>;
}
