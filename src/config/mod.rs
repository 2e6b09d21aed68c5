//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → command-line overrides (port, strategy)
//!     → ProxyConfig (validated, immutable)
//!     → cloned into the dispatcher and relay
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the strategy cannot change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{DispatchConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, RelayConfig, Strategy};
pub use validation::{validate_config, ValidationError};
