//! Forwarding HTTP/1.0 proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ net::listener ─▶ dispatch (strategy)       │
//!                           │                     │                        │
//!                           │                     ▼                        │
//!                           │   http::handler: request ─▶ uri ─▶ headers   │
//!                           │                     │                        │
//!                           │                     ▼                        │
//!     ◀─────────────────────┼── http::response ◀─ net::upstream ◀──────────┼──── Origin
//!                           │                                              │
//!                           │   config · observability · lifecycle         │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use relay_proxy::config::{load_config, validate_config, ProxyConfig, Strategy};
use relay_proxy::lifecycle::{build_runtime, serve};
use relay_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "relay-proxy")]
#[command(about = "Forwarding HTTP/1.0 proxy", long_about = None)]
struct Cli {
    /// TCP port to listen on.
    port: u16,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Concurrency strategy; overrides `dispatch.strategy`.
    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => {
                let config = ProxyConfig::default();
                validate_config(&config).map_err(|errors| {
                    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
                })?;
                config
            }
        };
        config.listener.port = self.port;
        if let Some(strategy) = self.strategy {
            config.dispatch.strategy = strategy;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("relay-proxy: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!("relay-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let result = build_runtime(config.dispatch.strategy).and_then(|runtime| runtime.block_on(serve(config)));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Proxy stopped");
            eprintln!("relay-proxy: {}", e);
            ExitCode::FAILURE
        }
    }
}
