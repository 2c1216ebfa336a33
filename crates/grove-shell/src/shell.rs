//! The read-eval-print loop.
//!
//! One working path (plus the previous one, for `cd -`) threads through
//! the loop as explicit context. Each iteration tokenizes a line,
//! dispatches it, and renders session-level failures as single-line
//! messages; only session expiry ends the loop, since ephemeral state
//! tied to the expired session is unrecoverable.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use grove_client::Client;
use grove_model::{GroveError, NodePath};

use crate::commands;
use crate::encoding::Encoding;
use crate::token;

/// Whether the loop keeps reading after a command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopSignal {
    /// Read the next line.
    Continue,
    /// Leave the shell.
    Quit,
}

/// Mutable state threaded through the dispatch loop.
pub struct ShellContext {
    /// Current working path; every relative argument resolves against it.
    pub cwd: NodePath,
    /// Previous working path, for `cd -`.
    pub last: Option<NodePath>,
    /// Charset applied when a command does not pick its own.
    pub default_encoding: Encoding,
    /// Display form of the connected ensemble, for `config`.
    pub ensemble: String,
}

/// The interactive shell over one client session.
pub struct Shell {
    client: Client,
    ctx: ShellContext,
}

impl Shell {
    /// Builds a shell starting at `start`.
    pub fn new(client: Client, start: NodePath, default_encoding: Encoding, ensemble: String) -> Self {
        Self {
            client,
            ctx: ShellContext {
                cwd: start,
                last: None,
                default_encoding,
                ensemble,
            },
        }
    }

    /// The current loop context.
    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    /// Runs one input line: tokenize, dispatch, render failures.
    ///
    /// Blank lines and `#` comments are skipped so script files can carry
    /// structure.
    pub async fn run_line(&mut self, line: &str) -> LoopSignal {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return LoopSignal::Continue;
        }
        let tokens = match token::tokenize(trimmed) {
            Ok(tokens) if tokens.is_empty() => return LoopSignal::Continue,
            Ok(tokens) => tokens,
            Err(err) => {
                println!("{err}");
                return LoopSignal::Continue;
            }
        };
        debug!(command = %tokens[0], "dispatch");
        match commands::dispatch(&tokens, &mut self.ctx, &self.client).await {
            Ok(signal) => signal,
            Err(err) => match err.downcast_ref::<GroveError>() {
                Some(GroveError::SessionExpired) => {
                    println!("session expired: restart the shell to establish a new session");
                    LoopSignal::Quit
                }
                Some(grove_err) => {
                    println!("{grove_err}");
                    LoopSignal::Continue
                }
                None => {
                    println!("{err:#}");
                    LoopSignal::Continue
                }
            },
        }
    }

    /// Feeds a whole script through the loop, stopping at `quit` or
    /// session expiry.
    pub async fn run_script(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            if self.run_line(line).await == LoopSignal::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Reads lines from stdin with a `path>` prompt until EOF or `quit`.
    pub async fn run_interactive(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{}> ", self.ctx.cwd);
            std::io::stdout().flush()?;
            match lines.next_line().await? {
                Some(line) => {
                    if self.run_line(&line).await == LoopSignal::Quit {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(())
    }
}
