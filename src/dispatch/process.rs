//! Process-per-connection workers.
//!
//! # Responsibilities
//! - Spawn one `relay-worker` process per accepted connection, handing it the
//!   client socket as stdin
//! - Close the parent's copy of the client socket right after spawning
//! - Reap every child asynchronously so none linger as zombies
//!
//! # Design Decisions
//! - Workers are spawned with exec rather than a bare fork; the listening
//!   socket is close-on-exec, so children never hold it
//! - Relay limits travel as command-line flags; workers share no state with
//!   the supervisor or each other

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsFd, OwnedFd};
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::process::Command;

use crate::config::{ProxyConfig, RelayConfig};
use crate::http::{ExchangeHandler, Outcome};
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::ConnectionPermit;

/// File name of the worker executable.
pub const WORKER_BIN: &str = "relay-worker";

/// Command line of `relay-worker`.
#[derive(Debug, Clone, PartialEq, Eq, clap::Parser)]
#[command(
    name = "relay-worker",
    about = "Serve one proxied exchange on the client socket passed as stdin"
)]
pub struct WorkerArgs {
    /// Longest accepted request, header or response header line.
    #[arg(long, default_value_t = 8192)]
    pub max_line_length: usize,

    /// Body relay chunk size in bytes.
    #[arg(long, default_value_t = 8192)]
    pub chunk_size: usize,

    /// Upstream connect timeout; no timeout when omitted.
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl WorkerArgs {
    pub fn new(relay: &RelayConfig, log_level: &str) -> Self {
        Self {
            max_line_length: relay.max_line_length,
            chunk_size: relay.chunk_size,
            connect_timeout_ms: relay.connect_timeout_ms,
            log_level: log_level.to_string(),
        }
    }

    /// Flags reproducing these arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--max-line-length".to_string(),
            self.max_line_length.to_string(),
            "--chunk-size".to_string(),
            self.chunk_size.to_string(),
            "--log-level".to_string(),
            self.log_level.clone(),
        ];
        if let Some(ms) = self.connect_timeout_ms {
            args.push("--connect-timeout-ms".to_string());
            args.push(ms.to_string());
        }
        args
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_line_length: self.max_line_length,
            chunk_size: self.chunk_size,
            connect_timeout_ms: self.connect_timeout_ms,
        }
    }
}

/// `relay-worker` next to the running executable.
pub fn default_worker_program() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe.with_file_name(format!("{}{}", WORKER_BIN, std::env::consts::EXE_SUFFIX)))
}

/// Spawns and reaps worker processes.
#[derive(Debug, Clone)]
pub struct WorkerSupervisor {
    program: PathBuf,
    args: Vec<String>,
}

impl WorkerSupervisor {
    pub fn new(program: PathBuf, args: &WorkerArgs) -> Self {
        Self {
            program,
            args: args.to_args(),
        }
    }

    /// Build from configuration, locating the worker binary if not set.
    pub fn from_config(config: &ProxyConfig) -> io::Result<Self> {
        let program = match &config.dispatch.worker_program {
            Some(program) => program.clone(),
            None => default_worker_program()?,
        };
        let args = WorkerArgs::new(&config.relay, &config.observability.log_level);
        Ok(Self::new(program, &args))
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Hand `stream` to a fresh worker process.
    ///
    /// The permit and guard live until the child has been reaped.
    pub fn spawn(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        guard: ConnectionGuard,
    ) -> io::Result<()> {
        let socket: OwnedFd = stream.into_std()?.into();

        let child = {
            let mut command = Command::new(&self.program);
            command
                .args(&self.args)
                .stdin(Stdio::from(socket))
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
            command.spawn()
            // `command` drops here, closing the parent's copy of the socket.
        };
        let mut child = child?;

        let connection_id = guard.id();
        tracing::debug!(
            connection_id = %connection_id,
            %peer,
            pid = ?child.id(),
            "Worker spawned"
        );

        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::trace!(connection_id = %connection_id, "Worker reaped");
                }
                Ok(status) => {
                    tracing::warn!(connection_id = %connection_id, %status, "Worker exited abnormally");
                }
                Err(e) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "Failed to reap worker");
                }
            }
        });
        Ok(())
    }
}

/// Worker side: serve one exchange on the socket inherited as stdin.
pub async fn serve_inherited_socket(args: &WorkerArgs) -> io::Result<Outcome> {
    let socket = io::stdin().as_fd().try_clone_to_owned()?;
    let stream = std::net::TcpStream::from(socket);
    stream.set_nonblocking(true)?;
    let peer = stream.peer_addr()?;
    let stream = TcpStream::from_std(stream)?;

    let tracker = ConnectionTracker::new();
    let handler = ExchangeHandler::new(&args.relay_config());
    Ok(handler
        .serve_connection(BufReader::new(stream), peer, tracker.track())
        .await)
}
