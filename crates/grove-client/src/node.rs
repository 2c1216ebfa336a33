//! Object-style convenience over one path.
//!
//! A [`Node`] pins a [`Client`] to a single namespace path so callers
//! (notably the shell's find engine, which acts on enumerated nodes
//! rather than re-resolving path arguments) can issue operations without
//! re-threading the path everywhere.

use std::time::Duration;

use grove_model::{Acl, Disposition, GroveError, NodePath, Status};

use crate::client::Client;

/// A path bound to a client handle.
#[derive(Clone)]
pub struct Node {
    client: Client,
    path: NodePath,
}

impl Node {
    /// Binds `path` to `client`.
    pub fn new(client: Client, path: NodePath) -> Self {
        Self { client, path }
    }

    /// The bound path.
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The last component of the bound path.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// A node for a direct child.
    pub fn child(&self, name: &str) -> Node {
        Node::new(self.client.clone(), self.path.child(name))
    }

    /// A node for the parent path, if there is one.
    pub fn parent(&self) -> Option<Node> {
        self.path
            .parent()
            .map(|parent| Node::new(self.client.clone(), parent))
    }

    /// Creates this node.
    pub async fn create(
        &self,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
        ttl: Option<Duration>,
    ) -> Result<NodePath, GroveError> {
        self.client.create(&self.path, data, acl, disposition, ttl).await
    }

    /// Deletes this node.
    pub async fn delete(&self, version: Option<i32>) -> Result<(), GroveError> {
        self.client.delete(&self.path, version).await
    }

    /// Deletes this node and everything beneath it.
    pub async fn delete_recursive(&self) -> Result<(), GroveError> {
        self.client.delete_recursive(&self.path).await
    }

    /// The node's status, or `None` if it does not exist.
    pub async fn exists(&self) -> Result<Option<Status>, GroveError> {
        self.client.exists(&self.path).await
    }

    /// The node's status; no-such-node if it is gone.
    pub async fn stat(&self) -> Result<Status, GroveError> {
        self.exists().await?.ok_or_else(|| GroveError::NoNode {
            path: self.path.as_str().to_string(),
        })
    }

    /// The node's data and status.
    pub async fn data(&self) -> Result<(Vec<u8>, Status), GroveError> {
        self.client.get(&self.path).await
    }

    /// Overwrites the node's data.
    pub async fn set_data(
        &self,
        data: Vec<u8>,
        version: Option<i32>,
    ) -> Result<Status, GroveError> {
        self.client.set(&self.path, data, version).await
    }

    /// Child names in lexical order.
    pub async fn children_names(&self) -> Result<Vec<String>, GroveError> {
        self.client.children(&self.path).await
    }

    /// Child nodes in lexical order.
    pub async fn children(&self) -> Result<Vec<Node>, GroveError> {
        Ok(self
            .children_names()
            .await?
            .iter()
            .map(|name| self.child(name))
            .collect())
    }

    /// The node's ACL list and status.
    pub async fn acl(&self) -> Result<(Vec<Acl>, Status), GroveError> {
        self.client.get_acl(&self.path).await
    }

    /// Replaces the node's ACL list.
    pub async fn set_acl(
        &self,
        acl: Vec<Acl>,
        version: Option<i32>,
    ) -> Result<Status, GroveError> {
        self.client.set_acl(&self.path, acl, version).await
    }
}
