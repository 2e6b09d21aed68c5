//! Origin server connections.
//!
//! # Responsibilities
//! - Resolve and connect to the host/port named by the request URI
//! - Map every connect failure to a 502
//!
//! # Design Decisions
//! - One attempt, no retries
//! - Ports must be numeric; service names are not looked up
//! - No connect timeout unless configured; a stalled connect blocks only the
//!   worker that issued it
//! - The returned stream is owned by the caller and closes on drop

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::http::error::ProxyError;
use crate::http::uri::TargetAddress;

/// Opens upstream TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamConnector {
    connect_timeout: Option<Duration>,
}

impl UpstreamConnector {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    /// Connect to the origin server for `target`.
    pub async fn connect(&self, target: &TargetAddress) -> Result<TcpStream, ProxyError> {
        let bad_gateway = |source: io::Error| ProxyError::BadGateway {
            authority: target.authority(),
            source,
        };

        let port: u16 = target.port.parse().map_err(|_| {
            bad_gateway(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid port {:?}", target.port),
            ))
        })?;

        let connect = TcpStream::connect((target.host.as_str(), port));
        let stream = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| bad_gateway(io::ErrorKind::TimedOut.into()))?,
            None => connect.await,
        }
        .map_err(bad_gateway)?;

        tracing::debug!(
            upstream = %target.authority(),
            local_addr = ?stream.local_addr().ok(),
            "Upstream connected"
        );
        Ok(stream)
    }
}
