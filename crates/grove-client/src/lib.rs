#![warn(missing_docs)]

//! Grove client subsystem: typed facade over the native coordination client.
//!
//! The native client is an external collaborator reached through the
//! [`backend::Backend`] trait; everything protocol-level (consensus,
//! session delivery, watch propagation) lives behind it. This crate adds
//! the ergonomic surface: error-code translation, watches delivered over
//! channels, the [`node::Node`] convenience object, atomic transactions,
//! and a deterministic in-process backend for tests and offline use.

pub mod backend;
pub mod blocking;
pub mod client;
pub mod memory;
pub mod node;
pub mod transaction;

pub use backend::{Backend, ConnectOptions, EnsembleConfig, ServerAddr};
pub use blocking::BlockingClient;
pub use client::Client;
pub use memory::MemoryBackend;
pub use node::Node;
pub use transaction::Transaction;
