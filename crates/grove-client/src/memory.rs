//! Deterministic in-process backend.
//!
//! Implements the full namespace semantics — versioned data/ACL/child
//! bookkeeping, transaction-id stamping, sequential suffixes, ephemeral
//! ownership, watches, atomic multi — against an in-memory table, so the
//! shell and the test suites run without a server. Authorization and
//! container/TTL reaping belong to a real server; the simulation records
//! ACLs and dispositions verbatim and never reaps.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use grove_model::{
    Acl, Credential, Disposition, ErrorCode, Event, NodePath, Op, OpResult, SessionInfo,
    SessionState, Status,
};

use crate::backend::{Backend, CodeResult, ConnectOptions, EnsembleConfig, MultiOutcome};

/// Invalid-arguments code for requests a real server would refuse outright
/// (deleting the root, TTL on a non-TTL disposition).
const BAD_ARGUMENTS: ErrorCode = ErrorCode(-8);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
struct NodeRecord {
    data: Vec<u8>,
    acl: Vec<Acl>,
    disposition: Disposition,
    ttl: Option<Duration>,
    ctxid: i64,
    mtxid: i64,
    ptxid: i64,
    ctime_ms: i64,
    mtime_ms: i64,
    version: i32,
    cversion: i32,
    aversion: i32,
    ephemeral_owner: u64,
    children: BTreeSet<String>,
    next_sequence: u64,
}

impl NodeRecord {
    fn new(txid: i64, now_ms: i64) -> Self {
        Self {
            data: Vec::new(),
            acl: vec![Acl::open()],
            disposition: Disposition::Persistent,
            ttl: None,
            ctxid: txid,
            mtxid: txid,
            ptxid: txid,
            ctime_ms: now_ms,
            mtime_ms: now_ms,
            version: 0,
            cversion: 0,
            aversion: 0,
            ephemeral_owner: 0,
            children: BTreeSet::new(),
            next_sequence: 0,
        }
    }

    fn status(&self) -> Status {
        Status {
            ctxid: self.ctxid,
            mtxid: self.mtxid,
            ptxid: self.ptxid,
            ctime_ms: self.ctime_ms,
            mtime_ms: self.mtime_ms,
            version: self.version,
            cversion: self.cversion,
            aversion: self.aversion,
            ephemeral_owner: self.ephemeral_owner,
            data_length: self.data.len() as u32,
            num_children: self.children.len() as u32,
        }
    }
}

/// The node table plus the mutation rules over it.
///
/// Kept separate from the watch registry so `multi` can clone it, apply
/// every step against the clone, and swap it back only when all steps
/// succeeded.
#[derive(Clone)]
struct Namespace {
    nodes: HashMap<String, NodeRecord>,
}

impl Namespace {
    fn new(txid: i64, now_ms: i64) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), NodeRecord::new(txid, now_ms));
        Self { nodes }
    }

    fn get(&self, path: &NodePath) -> Result<&NodeRecord, ErrorCode> {
        self.nodes.get(path.as_str()).ok_or(ErrorCode::NO_NODE)
    }

    fn create(
        &mut self,
        path: &NodePath,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
        ttl: Option<Duration>,
        txid: i64,
        now_ms: i64,
        session_id: u64,
    ) -> Result<(NodePath, Vec<Event>), ErrorCode> {
        if !path.is_absolute() || path.as_str() == "/" {
            return Err(BAD_ARGUMENTS);
        }
        if acl.is_empty() {
            return Err(ErrorCode::INVALID_ACL);
        }
        if ttl.is_some() != disposition.is_ttl() {
            return Err(BAD_ARGUMENTS);
        }
        let parent = path.parent().ok_or(BAD_ARGUMENTS)?;
        {
            let parent_rec = self
                .nodes
                .get(parent.as_str())
                .ok_or(ErrorCode::NO_NODE)?;
            if parent_rec.ephemeral_owner != 0 {
                return Err(ErrorCode::NO_CHILDREN_FOR_EPHEMERALS);
            }
        }

        let name = if disposition.is_sequential() {
            let parent_rec = self.nodes.get_mut(parent.as_str()).expect("parent checked");
            let sequence = parent_rec.next_sequence;
            parent_rec.next_sequence += 1;
            format!("{}{:010}", path.name(), sequence)
        } else {
            path.name().to_string()
        };
        let final_path = parent.child(&name);
        if self.nodes.contains_key(final_path.as_str()) {
            return Err(ErrorCode::NODE_EXISTS);
        }

        let mut record = NodeRecord::new(txid, now_ms);
        record.data = data;
        record.acl = acl;
        record.disposition = disposition;
        record.ttl = ttl;
        if disposition.is_ephemeral() {
            record.ephemeral_owner = session_id;
        }
        self.nodes.insert(final_path.as_str().to_string(), record);

        let parent_rec = self.nodes.get_mut(parent.as_str()).expect("parent checked");
        parent_rec.children.insert(name);
        parent_rec.cversion += 1;
        parent_rec.ptxid = txid;

        let events = vec![
            Event::Created(final_path.clone()),
            Event::ChildrenChanged(parent),
        ];
        Ok((final_path, events))
    }

    fn delete(
        &mut self,
        path: &NodePath,
        version: Option<i32>,
        txid: i64,
    ) -> Result<Vec<Event>, ErrorCode> {
        if path.as_str() == "/" {
            return Err(BAD_ARGUMENTS);
        }
        {
            let record = self.get(path)?;
            if let Some(expected) = version {
                if expected != record.version {
                    return Err(ErrorCode::BAD_VERSION);
                }
            }
            if !record.children.is_empty() {
                return Err(ErrorCode::NOT_EMPTY);
            }
        }
        self.nodes.remove(path.as_str());

        let parent = path.parent().expect("non-root path has a parent");
        if let Some(parent_rec) = self.nodes.get_mut(parent.as_str()) {
            parent_rec.children.remove(path.name());
            parent_rec.cversion += 1;
            parent_rec.ptxid = txid;
        }

        Ok(vec![
            Event::Deleted(path.clone()),
            Event::ChildrenChanged(parent),
        ])
    }

    fn set_data(
        &mut self,
        path: &NodePath,
        data: Vec<u8>,
        version: Option<i32>,
        txid: i64,
        now_ms: i64,
    ) -> Result<(Status, Vec<Event>), ErrorCode> {
        let record = self
            .nodes
            .get_mut(path.as_str())
            .ok_or(ErrorCode::NO_NODE)?;
        if let Some(expected) = version {
            if expected != record.version {
                return Err(ErrorCode::BAD_VERSION);
            }
        }
        record.data = data;
        record.version += 1;
        record.mtxid = txid;
        record.mtime_ms = now_ms;
        Ok((record.status(), vec![Event::DataChanged(path.clone())]))
    }

    fn set_acl(
        &mut self,
        path: &NodePath,
        acl: Vec<Acl>,
        version: Option<i32>,
    ) -> Result<Status, ErrorCode> {
        if acl.is_empty() {
            return Err(ErrorCode::INVALID_ACL);
        }
        let record = self
            .nodes
            .get_mut(path.as_str())
            .ok_or(ErrorCode::NO_NODE)?;
        if let Some(expected) = version {
            if expected != record.aversion {
                return Err(ErrorCode::BAD_VERSION);
            }
        }
        record.acl = acl;
        record.aversion += 1;
        Ok(record.status())
    }

    fn check(&self, path: &NodePath, version: i32) -> Result<(), ErrorCode> {
        let record = self.get(path)?;
        if record.version != version {
            return Err(ErrorCode::BAD_VERSION);
        }
        Ok(())
    }
}

struct PersistentWatch {
    path: NodePath,
    recursive: bool,
    tx: mpsc::UnboundedSender<Event>,
}

#[derive(Default)]
struct WatchTable {
    data: HashMap<String, Vec<mpsc::UnboundedSender<Event>>>,
    children: HashMap<String, Vec<mpsc::UnboundedSender<Event>>>,
    exists: HashMap<String, Vec<mpsc::UnboundedSender<Event>>>,
    persistent: Vec<PersistentWatch>,
}

impl WatchTable {
    fn register(
        map: &mut HashMap<String, Vec<mpsc::UnboundedSender<Event>>>,
        path: &NodePath,
    ) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        map.entry(path.as_str().to_string()).or_default().push(tx);
        rx
    }

    /// Routes one event: one-shot registrations for the path are drained,
    /// persistent subscriptions stay armed.
    fn fire(&mut self, event: &Event) {
        let drain = |map: &mut HashMap<String, Vec<mpsc::UnboundedSender<Event>>>,
                     key: &NodePath,
                     event: &Event| {
            if let Some(senders) = map.remove(key.as_str()) {
                for tx in senders {
                    let _ = tx.send(event.clone());
                }
            }
        };
        match event {
            Event::Created(path) => drain(&mut self.exists, path, event),
            Event::Deleted(path) => {
                drain(&mut self.data, path, event);
                drain(&mut self.exists, path, event);
                drain(&mut self.children, path, event);
            }
            Event::DataChanged(path) => {
                drain(&mut self.data, path, event);
                drain(&mut self.exists, path, event);
            }
            Event::ChildrenChanged(path) => drain(&mut self.children, path, event),
            Event::SessionStateChanged(_) => {}
        }

        self.persistent.retain(|w| !w.tx.is_closed());
        for w in &self.persistent {
            let deliver = match event {
                Event::ChildrenChanged(path) => !w.recursive && *path == w.path,
                Event::Created(path) | Event::Deleted(path) | Event::DataChanged(path) => {
                    *path == w.path || (w.recursive && descends(path, &w.path))
                }
                Event::SessionStateChanged(_) => true,
            };
            if deliver {
                let _ = w.tx.send(event.clone());
            }
        }
    }
}

fn descends(path: &NodePath, base: &NodePath) -> bool {
    if base.as_str() == "/" {
        path.as_str() != "/"
    } else {
        path.as_str()
            .strip_prefix(base.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

struct State {
    namespace: Namespace,
    watches: WatchTable,
}

/// In-process implementation of [`Backend`].
pub struct MemoryBackend {
    state: Mutex<State>,
    txid: AtomicI64,
    session: SessionInfo,
    state_tx: watch::Sender<SessionState>,
}

impl MemoryBackend {
    /// Establishes a fresh, empty namespace with a live session.
    pub fn new(options: &ConnectOptions) -> Arc<Self> {
        let session = SessionInfo {
            id: 0x0100_0000_0000 | NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            timeout: options.timeout,
            read_only: options.read_only,
        };
        let initial = if !options.credentials.is_empty() {
            SessionState::Authenticated
        } else if options.read_only {
            SessionState::ConnectedReadOnly
        } else {
            SessionState::Connected
        };
        let (state_tx, _) = watch::channel(initial);
        let backend = Self {
            state: Mutex::new(State {
                namespace: Namespace::new(0, now_ms()),
                watches: WatchTable::default(),
            }),
            txid: AtomicI64::new(0),
            session,
            state_tx,
        };
        Arc::new(backend)
    }

    /// Simulated session establishment against `config`.
    ///
    /// The ensemble is logged and otherwise ignored; no sockets are opened.
    pub fn connect(config: &EnsembleConfig, options: &ConnectOptions) -> Arc<Self> {
        debug!(ensemble = %config, timeout = ?options.timeout, "memory backend session established");
        Self::new(options)
    }

    /// Forces server-side session expiry, releasing owned ephemerals.
    /// Every subsequent operation fails with the session-expired code.
    pub fn expire(&self) {
        self.teardown(SessionState::Expired);
    }

    fn teardown(&self, final_state: SessionState) {
        let mut state = self.state.lock().expect("lock poisoned");
        let owned: Vec<NodePath> = state
            .namespace
            .nodes
            .iter()
            .filter(|(_, record)| record.ephemeral_owner == self.session.id)
            .map(|(path, _)| NodePath::new(path.as_str()))
            .collect();
        let txid = self.next_txid();
        for path in owned {
            if let Ok(events) = state.namespace.delete(&path, None, txid) {
                for event in &events {
                    state.watches.fire(event);
                }
            }
        }
        state
            .watches
            .fire(&Event::SessionStateChanged(final_state));
        drop(state);
        let _ = self.state_tx.send(final_state);
    }

    fn next_txid(&self) -> i64 {
        self.txid.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn guard(&self) -> Result<(), ErrorCode> {
        match *self.state_tx.borrow() {
            SessionState::Expired => Err(ErrorCode::SESSION_EXPIRED),
            SessionState::Closed => Err(ErrorCode::CONNECTION_LOSS),
            _ => Ok(()),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
        ttl: Option<Duration>,
    ) -> CodeResult<NodePath> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let txid = self.next_txid();
        let (final_path, events) = state.namespace.create(
            path,
            data,
            acl,
            disposition,
            ttl,
            txid,
            now_ms(),
            self.session.id,
        )?;
        for event in &events {
            state.watches.fire(event);
        }
        Ok(final_path)
    }

    async fn delete(&self, path: &NodePath, version: Option<i32>) -> CodeResult<()> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let txid = self.next_txid();
        let events = state.namespace.delete(path, version, txid)?;
        for event in &events {
            state.watches.fire(event);
        }
        Ok(())
    }

    async fn exists(&self, path: &NodePath) -> CodeResult<Option<Status>> {
        self.guard()?;
        let state = self.state.lock().expect("lock poisoned");
        Ok(state.namespace.get(path).ok().map(NodeRecord::status))
    }

    async fn exists_watch(
        &self,
        path: &NodePath,
    ) -> CodeResult<(Option<Status>, mpsc::UnboundedReceiver<Event>)> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let status = state.namespace.get(path).ok().map(NodeRecord::status);
        let rx = WatchTable::register(&mut state.watches.exists, path);
        Ok((status, rx))
    }

    async fn get_data(&self, path: &NodePath) -> CodeResult<(Vec<u8>, Status)> {
        self.guard()?;
        let state = self.state.lock().expect("lock poisoned");
        let record = state.namespace.get(path)?;
        Ok((record.data.clone(), record.status()))
    }

    async fn get_data_watch(
        &self,
        path: &NodePath,
    ) -> CodeResult<(Vec<u8>, Status, mpsc::UnboundedReceiver<Event>)> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let (data, status) = {
            let record = state.namespace.get(path)?;
            (record.data.clone(), record.status())
        };
        let rx = WatchTable::register(&mut state.watches.data, path);
        Ok((data, status, rx))
    }

    async fn set_data(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        version: Option<i32>,
    ) -> CodeResult<Status> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let txid = self.next_txid();
        let (status, events) = state.namespace.set_data(path, data, version, txid, now_ms())?;
        for event in &events {
            state.watches.fire(event);
        }
        Ok(status)
    }

    async fn children(&self, path: &NodePath) -> CodeResult<Vec<String>> {
        self.guard()?;
        let state = self.state.lock().expect("lock poisoned");
        let record = state.namespace.get(path)?;
        Ok(record.children.iter().cloned().collect())
    }

    async fn children_watch(
        &self,
        path: &NodePath,
    ) -> CodeResult<(Vec<String>, mpsc::UnboundedReceiver<Event>)> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let names = {
            let record = state.namespace.get(path)?;
            record.children.iter().cloned().collect()
        };
        let rx = WatchTable::register(&mut state.watches.children, path);
        Ok((names, rx))
    }

    async fn watch_persistent(
        &self,
        path: &NodePath,
        recursive: bool,
    ) -> CodeResult<mpsc::UnboundedReceiver<Event>> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let (tx, rx) = mpsc::unbounded_channel();
        state.watches.persistent.push(PersistentWatch {
            path: path.clone(),
            recursive,
            tx,
        });
        Ok(rx)
    }

    async fn get_acl(&self, path: &NodePath) -> CodeResult<(Vec<Acl>, Status)> {
        self.guard()?;
        let state = self.state.lock().expect("lock poisoned");
        let record = state.namespace.get(path)?;
        Ok((record.acl.clone(), record.status()))
    }

    async fn set_acl(
        &self,
        path: &NodePath,
        acl: Vec<Acl>,
        version: Option<i32>,
    ) -> CodeResult<Status> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        state.namespace.set_acl(path, acl, version)
    }

    async fn multi(&self, ops: Vec<Op>) -> CodeResult<MultiOutcome> {
        self.guard()?;
        let mut state = self.state.lock().expect("lock poisoned");
        let txid = self.next_txid();
        let stamp = now_ms();

        let mut scratch = state.namespace.clone();
        let mut results = Vec::with_capacity(ops.len());
        let mut events = Vec::new();
        for (index, op) in ops.iter().enumerate() {
            let step = match op {
                Op::Create {
                    path,
                    data,
                    acl,
                    disposition,
                    ttl,
                } => scratch
                    .create(
                        path,
                        data.clone(),
                        acl.clone(),
                        *disposition,
                        *ttl,
                        txid,
                        stamp,
                        self.session.id,
                    )
                    .map(|(final_path, step_events)| {
                        events.extend(step_events);
                        OpResult::Created { path: final_path }
                    }),
                Op::Delete { path, version } => {
                    scratch.delete(path, *version, txid).map(|step_events| {
                        events.extend(step_events);
                        OpResult::Deleted
                    })
                }
                Op::SetData {
                    path,
                    data,
                    version,
                } => scratch
                    .set_data(path, data.clone(), *version, txid, stamp)
                    .map(|(status, step_events)| {
                        events.extend(step_events);
                        OpResult::DataSet { status }
                    }),
                Op::Check { path, version } => {
                    scratch.check(path, *version).map(|()| OpResult::Checked)
                }
            };
            match step {
                Ok(result) => results.push(result),
                Err(code) => return Ok(MultiOutcome::Failed(vec![(index, code)])),
            }
        }

        state.namespace = scratch;
        for event in &events {
            state.watches.fire(event);
        }
        Ok(MultiOutcome::Committed(results))
    }

    async fn add_auth(&self, credential: Credential) -> CodeResult<()> {
        self.guard()?;
        debug!(scheme = %credential.scheme, "credential presented");
        let _ = self.state_tx.send(SessionState::Authenticated);
        Ok(())
    }

    fn session(&self) -> SessionInfo {
        self.session.clone()
    }

    fn state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    async fn close(&self) -> CodeResult<()> {
        self.guard()?;
        self.teardown(SessionState::Closed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> Arc<MemoryBackend> {
        MemoryBackend::new(&ConnectOptions::default())
    }

    fn path(s: &str) -> NodePath {
        NodePath::new(s)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let b = backend();
        let created = b
            .create(
                &path("/app"),
                b"v1".to_vec(),
                vec![Acl::open()],
                Disposition::Persistent,
                None,
            )
            .await
            .unwrap();
        assert_eq!(created.as_str(), "/app");

        let (data, status) = b.get_data(&path("/app")).await.unwrap();
        assert_eq!(data, b"v1");
        assert_eq!(status.version, 0);
        assert_eq!(status.data_length, 2);
        assert!(!status.is_ephemeral());
    }

    #[tokio::test]
    async fn test_create_requires_parent() {
        let b = backend();
        let err = b
            .create(
                &path("/a/b"),
                Vec::new(),
                vec![Acl::open()],
                Disposition::Persistent,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err, ErrorCode::NO_NODE);
    }

    #[tokio::test]
    async fn test_create_existing_fails() {
        let b = backend();
        b.create(&path("/a"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        let err = b
            .create(&path("/a"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap_err();
        assert_eq!(err, ErrorCode::NODE_EXISTS);
    }

    #[tokio::test]
    async fn test_sequential_names() {
        let b = backend();
        b.create(&path("/q"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        let first = b
            .create(
                &path("/q/item-"),
                Vec::new(),
                vec![Acl::open()],
                Disposition::PersistentSequential,
                None,
            )
            .await
            .unwrap();
        let second = b
            .create(
                &path("/q/item-"),
                Vec::new(),
                vec![Acl::open()],
                Disposition::PersistentSequential,
                None,
            )
            .await
            .unwrap();
        assert_eq!(first.as_str(), "/q/item-0000000000");
        assert_eq!(second.as_str(), "/q/item-0000000001");
    }

    #[tokio::test]
    async fn test_ephemeral_cannot_have_children() {
        let b = backend();
        b.create(&path("/e"), Vec::new(), vec![Acl::open()], Disposition::Ephemeral, None)
            .await
            .unwrap();
        let err = b
            .create(&path("/e/c"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap_err();
        assert_eq!(err, ErrorCode::NO_CHILDREN_FOR_EPHEMERALS);
    }

    #[tokio::test]
    async fn test_version_guards() {
        let b = backend();
        b.create(&path("/v"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        let status = b.set_data(&path("/v"), b"x".to_vec(), Some(0)).await.unwrap();
        assert_eq!(status.version, 1);
        assert_eq!(
            b.set_data(&path("/v"), b"y".to_vec(), Some(0)).await.unwrap_err(),
            ErrorCode::BAD_VERSION
        );
        assert_eq!(
            b.delete(&path("/v"), Some(0)).await.unwrap_err(),
            ErrorCode::BAD_VERSION
        );
        b.delete(&path("/v"), Some(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_not_empty() {
        let b = backend();
        b.create(&path("/p"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        b.create(&path("/p/c"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        assert_eq!(
            b.delete(&path("/p"), None).await.unwrap_err(),
            ErrorCode::NOT_EMPTY
        );
    }

    #[tokio::test]
    async fn test_children_sorted() {
        let b = backend();
        for name in ["/z", "/a", "/m"] {
            b.create(&path(name), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
                .await
                .unwrap();
        }
        assert_eq!(b.children(&path("/")).await.unwrap(), vec!["a", "m", "z"]);
    }

    #[tokio::test]
    async fn test_child_version_tracks_mutations() {
        let b = backend();
        b.create(&path("/n"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        b.create(&path("/n/c"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        b.delete(&path("/n/c"), None).await.unwrap();
        let status = b.exists(&path("/n")).await.unwrap().unwrap();
        assert_eq!(status.cversion, 2);
        assert_eq!(status.num_children, 0);
    }

    #[tokio::test]
    async fn test_data_watch_fires_once() {
        let b = backend();
        b.create(&path("/w"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        let (_, _, mut rx) = b.get_data_watch(&path("/w")).await.unwrap();
        b.set_data(&path("/w"), b"1".to_vec(), None).await.unwrap();
        b.set_data(&path("/w"), b"2".to_vec(), None).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::DataChanged(path("/w"))));
        // One-shot: the second write produced nothing and the channel closed.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_exists_watch_sees_creation() {
        let b = backend();
        let (status, mut rx) = b.exists_watch(&path("/later")).await.unwrap();
        assert!(status.is_none());
        b.create(&path("/later"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(Event::Created(path("/later"))));
    }

    #[tokio::test]
    async fn test_children_watch_sees_child_change() {
        let b = backend();
        b.create(&path("/d"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        let (names, mut rx) = b.children_watch(&path("/d")).await.unwrap();
        assert!(names.is_empty());
        b.create(&path("/d/k"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(Event::ChildrenChanged(path("/d"))));
    }

    #[tokio::test]
    async fn test_persistent_recursive_watch() {
        let b = backend();
        b.create(&path("/t"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        let mut rx = b.watch_persistent(&path("/t"), true).await.unwrap();
        b.create(&path("/t/a"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        b.set_data(&path("/t/a"), b"x".to_vec(), None).await.unwrap();
        b.delete(&path("/t/a"), None).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::Created(path("/t/a"))));
        assert_eq!(rx.recv().await, Some(Event::DataChanged(path("/t/a"))));
        assert_eq!(rx.recv().await, Some(Event::Deleted(path("/t/a"))));
    }

    #[tokio::test]
    async fn test_multi_all_or_nothing() {
        let b = backend();
        let outcome = b
            .multi(vec![
                Op::Create {
                    path: path("/m1"),
                    data: Vec::new(),
                    acl: vec![Acl::open()],
                    disposition: Disposition::Persistent,
                    ttl: None,
                },
                Op::Delete {
                    path: path("/absent"),
                    version: None,
                },
            ])
            .await
            .unwrap();
        match outcome {
            MultiOutcome::Failed(problems) => {
                assert_eq!(problems, vec![(1, ErrorCode::NO_NODE)]);
            }
            MultiOutcome::Committed(_) => panic!("expected failure"),
        }
        // Step 0 must not have been applied.
        assert!(b.exists(&path("/m1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_multi_commit() {
        let b = backend();
        let outcome = b
            .multi(vec![
                Op::Create {
                    path: path("/m"),
                    data: b"d".to_vec(),
                    acl: vec![Acl::open()],
                    disposition: Disposition::Persistent,
                    ttl: None,
                },
                Op::Check {
                    path: path("/m"),
                    version: 0,
                },
                Op::SetData {
                    path: path("/m"),
                    data: b"e".to_vec(),
                    version: Some(0),
                },
            ])
            .await
            .unwrap();
        match outcome {
            MultiOutcome::Committed(results) => {
                assert_eq!(results.len(), 3);
                assert_eq!(results[0], OpResult::Created { path: path("/m") });
                assert_eq!(results[1], OpResult::Checked);
                assert!(matches!(results[2], OpResult::DataSet { .. }));
            }
            MultiOutcome::Failed(problems) => panic!("unexpected abort: {problems:?}"),
        }
        let (data, _) = b.get_data(&path("/m")).await.unwrap();
        assert_eq!(data, b"e");
    }

    #[tokio::test]
    async fn test_expiry_releases_ephemerals_and_fails_ops() {
        let b = backend();
        b.create(&path("/locks"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        b.create(
            &path("/locks/holder"),
            Vec::new(),
            vec![Acl::open()],
            Disposition::Ephemeral,
            None,
        )
        .await
        .unwrap();

        b.expire();
        assert_eq!(*b.state().borrow(), SessionState::Expired);
        assert_eq!(
            b.children(&path("/locks")).await.unwrap_err(),
            ErrorCode::SESSION_EXPIRED
        );
    }

    #[tokio::test]
    async fn test_close_releases_ephemerals() {
        let b = backend();
        b.create(&path("/e"), Vec::new(), vec![Acl::open()], Disposition::Ephemeral, None)
            .await
            .unwrap();
        let mut rx = b.watch_persistent(&path("/"), true).await.unwrap();
        b.close().await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::Deleted(path("/e"))));
        assert_eq!(
            rx.recv().await,
            Some(Event::SessionStateChanged(SessionState::Closed))
        );
    }

    #[tokio::test]
    async fn test_acl_versioning() {
        let b = backend();
        b.create(&path("/s"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
        let update = vec![grove_model::Acl::parse("digest:a:b=rw").unwrap()];
        let status = b.set_acl(&path("/s"), update.clone(), Some(0)).await.unwrap();
        assert_eq!(status.aversion, 1);
        assert_eq!(
            b.set_acl(&path("/s"), update, Some(0)).await.unwrap_err(),
            ErrorCode::BAD_VERSION
        );
        let (acl, _) = b.get_acl(&path("/s")).await.unwrap();
        assert_eq!(acl[0].to_string(), "digest:a:b=rw---");
    }

    #[tokio::test]
    async fn test_empty_acl_rejected() {
        let b = backend();
        assert_eq!(
            b.create(&path("/x"), Vec::new(), Vec::new(), Disposition::Persistent, None)
                .await
                .unwrap_err(),
            ErrorCode::INVALID_ACL
        );
    }

    #[tokio::test]
    async fn test_ttl_requires_ttl_disposition() {
        let b = backend();
        assert_eq!(
            b.create(
                &path("/t"),
                Vec::new(),
                vec![Acl::open()],
                Disposition::Persistent,
                Some(Duration::from_secs(5)),
            )
            .await
            .unwrap_err(),
            BAD_ARGUMENTS
        );
        b.create(
            &path("/t"),
            Vec::new(),
            vec![Acl::open()],
            Disposition::PersistentTtl,
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    }
}
