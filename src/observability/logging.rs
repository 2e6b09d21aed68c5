//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Map the configured log level onto a filter for this crate
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Workers spawned by the process strategy log through the same setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for a level name.
pub fn default_directive(level: &str) -> String {
    format!("relay_proxy={},relay_worker={}", level, level)
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
