//! Grove shell subsystem: interactive shell over the coordination namespace.
//!
//! A read-eval-print loop speaking filesystem-like verbs (`ls`, `get`,
//! `mk`, `rm`, `find`, ...) against a [`grove_client::Client`]. One
//! working path threads through the loop; commands resolve their path
//! arguments against it and hand back an updated context.

pub mod cli;
pub mod commands;
pub mod encoding;
pub mod find;
pub mod render;
pub mod shell;
pub mod token;

pub use cli::Cli;
pub use shell::{LoopSignal, Shell, ShellContext};
