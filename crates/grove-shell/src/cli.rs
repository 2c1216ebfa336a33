//! Outer command line and session bootstrap.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use grove_client::{Client, ConnectOptions, EnsembleConfig, MemoryBackend};
use grove_model::NodePath;

use crate::encoding::Encoding;
use crate::shell::Shell;

/// How to reach the coordination service.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// In-process simulated namespace; no sockets are opened.
    Memory,
}

/// `grove [OPTIONS] SERVER...`
#[derive(Parser)]
#[command(
    name = "grove",
    about = "Interactive shell over a coordination service namespace",
    version
)]
pub struct Cli {
    /// Starting working path
    #[arg(long, default_value = "/")]
    pub path: String,

    /// Session timeout in seconds
    #[arg(long, default_value_t = 30, env = "GROVE_TIMEOUT")]
    pub timeout: u64,

    /// Request a read-only session
    #[arg(long)]
    pub readonly: bool,

    /// Run one command and exit
    #[arg(long, conflicts_with = "file")]
    pub command: Option<String>,

    /// Run commands from a script file and exit
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Charset for data arguments and script files
    #[arg(long, default_value = "utf-8")]
    pub encoding: Encoding,

    /// Transport to reach the service with
    #[arg(long, value_enum, default_value_t = TransportKind::Memory)]
    pub transport: TransportKind,

    /// Ensemble members, `host[:port]`
    #[arg(required = true, value_name = "SERVER")]
    pub servers: Vec<String>,
}

impl Cli {
    /// Establishes the session and runs the requested mode: one
    /// `--command`, a `--file` script, or the interactive loop.
    pub async fn run(self) -> Result<()> {
        let config = EnsembleConfig::parse(&self.servers)?;
        let start = NodePath::new(self.path.as_str()).normalize();
        if !start.is_absolute() {
            bail!("--path must be absolute, got '{}'", self.path);
        }

        let options = ConnectOptions {
            timeout: Duration::from_secs(self.timeout),
            read_only: self.readonly,
            credentials: Vec::new(),
        };
        let backend = match self.transport {
            TransportKind::Memory => MemoryBackend::connect(&config, &options),
        };
        let client = Client::new(backend);
        let mut shell = Shell::new(client.clone(), start, self.encoding, config.to_string());

        if let Some(command) = &self.command {
            shell.run_line(command).await;
        } else if let Some(file) = &self.file {
            let bytes = std::fs::read(file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let text = self.encoding.decode(&bytes)?;
            shell.run_script(&text).await?;
        } else {
            shell.run_interactive().await?;
        }

        let _ = client.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_a_server() {
        assert!(Cli::try_parse_from(["grove"]).is_err());
        let cli = Cli::try_parse_from(["grove", "node1:2181", "node2"]).unwrap();
        assert_eq!(cli.servers, vec!["node1:2181", "node2"]);
        assert_eq!(cli.path, "/");
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.transport, TransportKind::Memory);
    }

    #[test]
    fn test_cli_command_conflicts_with_file() {
        assert!(Cli::try_parse_from([
            "grove", "--command", "ls", "--file", "script.grv", "node1"
        ])
        .is_err());
    }

    #[test]
    fn test_cli_mode_flags() {
        let cli = Cli::try_parse_from([
            "grove",
            "--path",
            "/apps",
            "--readonly",
            "--encoding",
            "latin-1",
            "--command",
            "ls -l",
            "node1",
        ])
        .unwrap();
        assert_eq!(cli.path, "/apps");
        assert!(cli.readonly);
        assert_eq!(cli.encoding, Encoding::Latin1);
        assert_eq!(cli.command.as_deref(), Some("ls -l"));
    }
}
