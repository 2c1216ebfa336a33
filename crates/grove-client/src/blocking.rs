//! Synchronous view over the async facade.
//!
//! For embedders and tests that are not running inside a tokio runtime:
//! the wrapper owns a current-thread runtime and blocks on each call.
//! Must not be used from async context.

use std::io;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use grove_model::{Acl, Credential, Disposition, GroveError, NodePath, Op, OpResult, Status};

use crate::backend::{ConnectOptions, EnsembleConfig};
use crate::client::Client;
use crate::memory::MemoryBackend;

/// Blocking wrapper around [`Client`].
pub struct BlockingClient {
    client: Client,
    runtime: Runtime,
}

impl BlockingClient {
    /// Wraps an existing client in a private current-thread runtime.
    pub fn new(client: Client) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { client, runtime })
    }

    /// Connects a memory-backed session (see [`MemoryBackend::connect`]).
    pub fn connect_memory(
        config: &EnsembleConfig,
        options: &ConnectOptions,
    ) -> io::Result<Self> {
        Self::new(Client::new(MemoryBackend::connect(config, options)))
    }

    /// The wrapped async client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// See [`Client::create`].
    pub fn create(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        acl: Vec<Acl>,
        disposition: Disposition,
        ttl: Option<Duration>,
    ) -> Result<NodePath, GroveError> {
        self.runtime
            .block_on(self.client.create(path, data, acl, disposition, ttl))
    }

    /// See [`Client::delete`].
    pub fn delete(&self, path: &NodePath, version: Option<i32>) -> Result<(), GroveError> {
        self.runtime.block_on(self.client.delete(path, version))
    }

    /// See [`Client::exists`].
    pub fn exists(&self, path: &NodePath) -> Result<Option<Status>, GroveError> {
        self.runtime.block_on(self.client.exists(path))
    }

    /// See [`Client::get`].
    pub fn get(&self, path: &NodePath) -> Result<(Vec<u8>, Status), GroveError> {
        self.runtime.block_on(self.client.get(path))
    }

    /// See [`Client::set`].
    pub fn set(
        &self,
        path: &NodePath,
        data: Vec<u8>,
        version: Option<i32>,
    ) -> Result<Status, GroveError> {
        self.runtime.block_on(self.client.set(path, data, version))
    }

    /// See [`Client::children`].
    pub fn children(&self, path: &NodePath) -> Result<Vec<String>, GroveError> {
        self.runtime.block_on(self.client.children(path))
    }

    /// See [`Client::get_acl`].
    pub fn get_acl(&self, path: &NodePath) -> Result<(Vec<Acl>, Status), GroveError> {
        self.runtime.block_on(self.client.get_acl(path))
    }

    /// See [`Client::set_acl`].
    pub fn set_acl(
        &self,
        path: &NodePath,
        acl: Vec<Acl>,
        version: Option<i32>,
    ) -> Result<Status, GroveError> {
        self.runtime.block_on(self.client.set_acl(path, acl, version))
    }

    /// See [`Client::transact`].
    pub fn transact(&self, ops: Vec<Op>) -> Result<Vec<OpResult>, GroveError> {
        self.runtime.block_on(self.client.transact(ops))
    }

    /// See [`Client::add_auth`].
    pub fn add_auth(&self, credential: Credential) -> Result<(), GroveError> {
        self.runtime.block_on(self.client.add_auth(credential))
    }

    /// See [`Client::close`].
    pub fn close(&self) -> Result<(), GroveError> {
        self.runtime.block_on(self.client.close())
    }
}
