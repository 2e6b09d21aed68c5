//! Connection dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Listener
//!     → Dispatcher (strategy chosen once at startup)
//!         process:     accept → spawn relay-worker with socket as stdin → reap
//!         thread:      accept → detached OS thread → one exchange
//!         task:        accept → detached runtime task → one exchange
//!         multiplexed: wait for readiness → register / serve ready clients
//!     → shutdown signal: stop accepting → drain live connections
//! ```
//!
//! # Design Decisions
//! - A failure inside one exchange never stops the accept loop
//! - Accept errors are logged and retried after a short backoff

pub mod multiplexed;
#[cfg(unix)]
pub mod process;
pub mod registry;
pub mod task;
pub mod thread;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::config::{ProxyConfig, Strategy};
use crate::http::ExchangeHandler;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{ConnectionPermit, Listener};

/// Pause after a failed accept before trying again.
pub(crate) const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to locate worker program: {0}")]
    WorkerProgram(#[source] io::Error),

    #[error("strategy `{0}` is not supported on this platform")]
    Unsupported(Strategy),
}

/// Schedules accepted connections according to the configured strategy.
pub struct Dispatcher {
    config: ProxyConfig,
    handler: ExchangeHandler,
    tracker: ConnectionTracker,
}

impl Dispatcher {
    pub fn new(config: ProxyConfig) -> Self {
        let handler = ExchangeHandler::new(&config.relay);
        Self {
            config,
            handler,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Live connection counter shared with every worker.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn strategy(&self) -> Strategy {
        self.config.dispatch.strategy
    }

    /// Serve `listener` until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), DispatchError> {
        let strategy = self.strategy();
        tracing::info!(
            strategy = %strategy,
            address = ?listener.local_addr().ok(),
            max_connections = listener.max_connections(),
            "Dispatcher running"
        );

        match strategy {
            Strategy::Multiplexed => {
                multiplexed::run(
                    &listener,
                    self.handler,
                    self.config.dispatch.max_clients,
                    &self.tracker,
                    &mut shutdown,
                )
                .await;
            }
            Strategy::Thread => {
                let runtime = Handle::current();
                let handler = self.handler;
                accept_loop(&listener, &self.tracker, &mut shutdown, |stream, peer, permit, guard| {
                    thread::spawn_worker(&runtime, handler, stream, peer, permit, guard)
                })
                .await;
            }
            Strategy::Task => {
                let handler = self.handler;
                accept_loop(&listener, &self.tracker, &mut shutdown, |stream, peer, permit, guard| {
                    task::spawn_worker(handler, stream, peer, permit, guard);
                    Ok(())
                })
                .await;
            }
            #[cfg(unix)]
            Strategy::Process => {
                let supervisor =
                    process::WorkerSupervisor::from_config(&self.config).map_err(DispatchError::WorkerProgram)?;
                tracing::info!(program = %supervisor.program().display(), "Worker program");
                accept_loop(&listener, &self.tracker, &mut shutdown, |stream, peer, permit, guard| {
                    supervisor.spawn(stream, peer, permit, guard)
                })
                .await;
            }
            #[cfg(not(unix))]
            Strategy::Process => return Err(DispatchError::Unsupported(strategy)),
        }

        drop(listener);
        self.drain().await;
        Ok(())
    }

    async fn drain(&self) {
        let active = self.tracker.active_count();
        if active == 0 {
            tracing::info!("No live connections; shutdown complete");
            return;
        }

        let deadline = Duration::from_secs(self.config.dispatch.drain_timeout_secs);
        tracing::info!(active, timeout_secs = deadline.as_secs(), "Draining live connections");
        match tokio::time::timeout(deadline, self.tracker.wait_for_shutdown()).await {
            Ok(()) => tracing::info!("All connections drained"),
            Err(_) => tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed; abandoning live connections"
            ),
        }
    }
}

/// Accept until shutdown, handing each connection to `spawn`.
async fn accept_loop<F>(
    listener: &Listener,
    tracker: &ConnectionTracker,
    shutdown: &mut broadcast::Receiver<()>,
    mut spawn: F,
) where
    F: FnMut(TcpStream, SocketAddr, ConnectionPermit, ConnectionGuard) -> io::Result<()>,
{
    loop {
        let accepted = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Shutdown requested; no longer accepting");
                break;
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer, permit)) => {
                let guard = tracker.track();
                let id = guard.id();
                if let Err(e) = spawn(stream, peer, permit, guard) {
                    tracing::error!(connection_id = %id, %peer, error = %e, "Failed to start worker");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
