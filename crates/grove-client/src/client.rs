//! The typed client facade.
//!
//! Wraps a [`Backend`] and owns all translation from numeric codes into
//! the [`GroveError`] taxonomy, attaching the path an operation addressed.
//! Async operations are the primary surface; watch variants return the
//! read result together with a channel the native client delivers on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use grove_model::{
    Acl, Credential, Disposition, Event, GroveError, MultiError, MultiProblem, NodePath, Op,
    OpResult, SessionInfo, SessionState, Status,
};

use crate::backend::{Backend, MultiOutcome};

/// Handle to an established session, cheap to clone.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
}

impl Client {
    /// Wraps an established backend session.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Identity of the underlying session.
    pub fn session(&self) -> SessionInfo {
        self.backend.session()
    }

    /// Subscribes to session lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.backend.state()
    }

    /// The last observed session state.
    pub fn current_state(&self) -> SessionState {
        *self.backend.state().borrow()
    }

    /// Creates a node and returns its final path (sequence suffix applied).
    ///
    /// An empty ACL list is rejected here, before any network call.
    pub async fn create(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
        ttl: Option<Duration>,
    ) -> Result<NodePath, GroveError> {
        if acl.is_empty() {
            return Err(GroveError::InvalidAcl {
                path: path.as_str().to_string(),
            });
        }
        self.backend
            .create(path, data, acl, disposition, ttl)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Creates a node, first creating any missing ancestors as persistent
    /// nodes with empty data and the same ACL list.
    pub async fn create_recursive(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
        ttl: Option<Duration>,
    ) -> Result<NodePath, GroveError> {
        let mut ancestors = Vec::new();
        let mut cursor = path.parent();
        while let Some(ancestor) = cursor {
            if ancestor.as_str() == "/" || ancestor.is_empty() {
                break;
            }
            cursor = ancestor.parent();
            ancestors.push(ancestor);
        }
        for ancestor in ancestors.into_iter().rev() {
            match self
                .create(&ancestor, Vec::new(), acl.clone(), Disposition::Persistent, None)
                .await
            {
                Ok(_) | Err(GroveError::NodeExists { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        self.create(path, data, acl, disposition, ttl).await
    }

    /// Deletes a node, optionally guarded by its data version.
    pub async fn delete(&self, path: &NodePath, version: Option<i32>) -> Result<(), GroveError> {
        self.backend
            .delete(path, version)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Deletes a node and everything beneath it, deepest entries first.
    ///
    /// The subtree is enumerated up front, so nodes deleted concurrently
    /// between enumeration and deletion are tolerated.
    pub async fn delete_recursive(&self, path: &NodePath) -> Result<(), GroveError> {
        let mut order = vec![path.clone()];
        let mut index = 0;
        while index < order.len() {
            let current = order[index].clone();
            index += 1;
            match self.children(&current).await {
                Ok(names) => order.extend(names.iter().map(|name| current.child(name))),
                Err(GroveError::NoNode { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        for target in order.iter().rev() {
            match self.delete(target, None).await {
                Ok(()) | Err(GroveError::NoNode { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Returns the node's status, or `None` if it does not exist.
    pub async fn exists(&self, path: &NodePath) -> Result<Option<Status>, GroveError> {
        self.backend
            .exists(path)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Like [`Client::exists`], watching for creation, deletion, or the
    /// next data change of the path.
    pub async fn exists_watch(
        &self,
        path: &NodePath,
    ) -> Result<(Option<Status>, mpsc::UnboundedReceiver<Event>), GroveError> {
        self.backend
            .exists_watch(path)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Reads data and status.
    pub async fn get(&self, path: &NodePath) -> Result<(Vec<u8>, Status), GroveError> {
        self.backend
            .get_data(path)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Like [`Client::get`], watching for the next data change or deletion.
    pub async fn get_watch(
        &self,
        path: &NodePath,
    ) -> Result<(Vec<u8>, Status, mpsc::UnboundedReceiver<Event>), GroveError> {
        self.backend
            .get_data_watch(path)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Overwrites the node's data, optionally guarded by the data version.
    pub async fn set(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        version: Option<i32>,
    ) -> Result<Status, GroveError> {
        self.backend
            .set_data(path, data, version)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Lists child names in lexical order.
    pub async fn children(&self, path: &NodePath) -> Result<Vec<String>, GroveError> {
        self.backend
            .children(path)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Like [`Client::children`], watching for the next child-list change.
    pub async fn children_watch(
        &self,
        path: &NodePath,
    ) -> Result<(Vec<String>, mpsc::UnboundedReceiver<Event>), GroveError> {
        self.backend
            .children_watch(path)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Registers a persistent watch on the node, or on the whole subtree
    /// when `recursive` is set. The watch stays armed until the receiver
    /// is dropped or the session ends.
    pub async fn subscribe(
        &self,
        path: &NodePath,
        recursive: bool,
    ) -> Result<mpsc::UnboundedReceiver<Event>, GroveError> {
        self.backend
            .watch_persistent(path, recursive)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Reads the node's ACL list and status.
    pub async fn get_acl(&self, path: &NodePath) -> Result<(Vec<Acl>, Status), GroveError> {
        self.backend
            .get_acl(path)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Replaces the node's ACL list, optionally guarded by the ACL version.
    ///
    /// An empty list is rejected here, before any network call.
    pub async fn set_acl(
        &self,
        path: &NodePath,
        acl: Vec<Acl>,
        version: Option<i32>,
    ) -> Result<Status, GroveError> {
        if acl.is_empty() {
            return Err(GroveError::InvalidAcl {
                path: path.as_str().to_string(),
            });
        }
        self.backend
            .set_acl(path, acl, version)
            .await
            .map_err(|code| GroveError::from_code(code, path.as_str()))
    }

    /// Atomically applies an ordered op list: all steps or none.
    ///
    /// Success returns one result per step, in order; an abort surfaces as
    /// [`GroveError::Multi`] with per-step problems.
    pub async fn transact(&self, ops: Vec<Op>) -> Result<Vec<OpResult>, GroveError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        for op in &ops {
            if let Op::Create { path, acl, .. } = op {
                if acl.is_empty() {
                    return Err(GroveError::InvalidAcl {
                        path: path.as_str().to_string(),
                    });
                }
            }
        }
        let outcome = self
            .backend
            .multi(ops.clone())
            .await
            .map_err(|code| GroveError::from_code(code, ""))?;
        match outcome {
            MultiOutcome::Committed(results) => Ok(results),
            MultiOutcome::Failed(problems) => {
                debug!(steps = ops.len(), failed = problems.len(), "transaction aborted");
                let problems = problems
                    .into_iter()
                    .map(|(index, code)| MultiProblem {
                        index,
                        error: GroveError::from_code(code, ops[index].path().as_str()),
                    })
                    .collect();
                Err(GroveError::Multi(MultiError { problems }))
            }
        }
    }

    /// Presents a credential on the live session.
    pub async fn add_auth(&self, credential: Credential) -> Result<(), GroveError> {
        self.backend
            .add_auth(credential)
            .await
            .map_err(|code| GroveError::from_code(code, ""))
    }

    /// Closes the session, releasing ephemerals it owns.
    pub async fn close(&self) -> Result<(), GroveError> {
        self.backend
            .close()
            .await
            .map_err(|code| GroveError::from_code(code, ""))
    }
}
