//! Forwarding HTTP/1.0 proxy library.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use dispatch::Dispatcher;
pub use http::ExchangeHandler;
pub use lifecycle::Shutdown;
