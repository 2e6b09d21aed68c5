//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the runtime flavor the strategy needs
//! - Install the metrics exporter when enabled
//! - Bind the listener and run the dispatcher until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, after everything else is ready

use std::fmt;
use std::io;

use tokio::runtime::{Builder, Runtime};

use crate::config::{ProxyConfig, Strategy};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::lifecycle::{signals, Shutdown};
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;

/// Error type for startup and serving.
#[derive(Debug)]
pub enum StartupError {
    /// The runtime could not be built.
    Runtime(io::Error),
    /// The listening socket could not be bound.
    Listener(ListenerError),
    /// The dispatcher could not start.
    Dispatch(DispatchError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Runtime(e) => write!(f, "Failed to build runtime: {}", e),
            StartupError::Listener(e) => write!(f, "{}", e),
            StartupError::Dispatch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ListenerError> for StartupError {
    fn from(e: ListenerError) -> Self {
        StartupError::Listener(e)
    }
}

impl From<DispatchError> for StartupError {
    fn from(e: DispatchError) -> Self {
        StartupError::Dispatch(e)
    }
}

/// Runtime for `strategy`.
///
/// The multiplexed loop runs on a single thread; every other strategy gets a
/// multi-thread runtime whose reactor keeps running while threads block on it.
pub fn build_runtime(strategy: Strategy) -> Result<Runtime, StartupError> {
    let mut builder = match strategy {
        Strategy::Multiplexed => Builder::new_current_thread(),
        Strategy::Process | Strategy::Thread | Strategy::Task => Builder::new_multi_thread(),
    };
    builder.enable_all().build().map_err(StartupError::Runtime)
}

/// Bind, serve until SIGINT/SIGTERM, then drain.
pub async fn serve(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        strategy = %config.dispatch.strategy,
        max_line_length = config.relay.max_line_length,
        connect_timeout_ms = ?config.relay.connect_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    run_until(config, listener, &shutdown).await
}

/// Run the dispatcher on an already bound listener until `shutdown` fires.
pub async fn run_until(config: ProxyConfig, listener: Listener, shutdown: &Shutdown) -> Result<(), StartupError> {
    Dispatcher::new(config).run(listener, shutdown.subscribe()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
