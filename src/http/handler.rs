//! One request/response exchange on an accepted client connection.
//!
//! # Responsibilities
//! - Read and validate the request
//! - Resolve the origin, connect, forward the rewritten request
//! - Relay the response, or answer with an error page
//! - Log and count the outcome
//!
//! # Design Decisions
//! - Every failure is scoped to this connection; nothing here can take the
//!   dispatcher down
//! - Sockets are owned locally, so every exit path closes them

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::Instrument;

use crate::config::RelayConfig;
use crate::http::error::ProxyError;
use crate::http::headers::build_upstream_request;
use crate::http::request::ParsedRequest;
use crate::http::response::{relay_response, RelayEnd, RelayLimits, RelayOutcome};
use crate::http::uri::TargetAddress;
use crate::net::connection::{ConnectionGuard, ConnectionState};
use crate::net::upstream::UpstreamConnector;
use crate::observability::metrics;

/// Result of one exchange.
#[derive(Debug)]
pub enum Outcome {
    /// The client closed the connection without sending anything.
    PeerClosed,
    /// An error page with this status was sent.
    Rejected { status: u16 },
    /// The upstream response was relayed (possibly partially).
    Relayed(RelayOutcome),
    /// The client stream failed before a response could be sent.
    Aborted(std::io::Error),
}

impl Outcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::PeerClosed => "peer_closed",
            Outcome::Rejected { status: 400 } => "bad_request",
            Outcome::Rejected { status: 501 } => "not_implemented",
            Outcome::Rejected { status: 502 } => "bad_gateway",
            Outcome::Rejected { .. } => "rejected",
            Outcome::Relayed(relay) => match relay.end {
                RelayEnd::Complete => "relayed",
                RelayEnd::UpstreamClosed => "short_response",
                RelayEnd::UpstreamFailed(_) | RelayEnd::HeaderTooLong => "upstream_failed",
                RelayEnd::ClientFailed(_) => "client_failed",
            },
            Outcome::Aborted(_) => "aborted",
        }
    }

    fn response_bytes(&self) -> u64 {
        match self {
            Outcome::Relayed(relay) => relay.total_bytes(),
            _ => 0,
        }
    }
}

/// Runs exchanges. Cheap to copy into every worker.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeHandler {
    connector: UpstreamConnector,
    limits: RelayLimits,
}

impl ExchangeHandler {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            connector: UpstreamConnector::new(config.connect_timeout()),
            limits: RelayLimits {
                max_line: config.max_line_length,
                chunk_size: config.chunk_size,
            },
        }
    }

    /// Serve one exchange on `client`, then close it.
    pub async fn serve_connection<S>(&self, mut client: BufReader<S>, peer: SocketAddr, mut conn: ConnectionGuard) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let span = tracing::info_span!("connection", id = %conn.id(), %peer);
        async move {
            let outcome = self.serve(&mut client, &mut conn).await;
            let _ = client.get_mut().shutdown().await;
            log_outcome(&outcome);
            metrics::record_exchange(outcome.label(), outcome.response_bytes());
            outcome
        }
        .instrument(span)
        .await
    }

    /// Run the exchange without closing the client.
    pub async fn serve<S>(&self, client: &mut BufReader<S>, conn: &mut ConnectionGuard) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        conn.advance(ConnectionState::Parsing);

        let request = match ParsedRequest::read(client, self.limits.max_line).await {
            Ok(Some(request)) => request,
            Ok(None) => return Outcome::PeerClosed,
            Err(e) => return reject(client.get_mut(), conn, e).await,
        };

        let target = match TargetAddress::parse(&request.uri, self.limits.max_line) {
            Ok(target) => target,
            Err(reason) => {
                let error = ProxyError::BadUri {
                    uri: String::from_utf8_lossy(&request.uri).into_owned(),
                    reason,
                };
                return reject(client.get_mut(), conn, error).await;
            }
        };

        let upstream = match self.connector.connect(&target).await {
            Ok(upstream) => upstream,
            Err(e) => return reject(client.get_mut(), conn, e).await,
        };

        conn.advance(ConnectionState::Relaying);
        tracing::info!(
            request = %request.request_line(),
            upstream = %target.authority(),
            path = %String::from_utf8_lossy(&target.path),
            "Forwarding request"
        );

        let mut upstream = BufReader::new(upstream);
        if let Err(source) = upstream
            .get_mut()
            .write_all(&build_upstream_request(&request, &target))
            .await
        {
            let error = ProxyError::BadGateway {
                authority: target.authority(),
                source,
            };
            return reject(client.get_mut(), conn, error).await;
        }

        Outcome::Relayed(relay_response(&mut upstream, client.get_mut(), self.limits).await)
    }
}

/// Answer with the error page owed for `error`, if any.
async fn reject<W>(client: &mut W, conn: &mut ConnectionGuard, error: ProxyError) -> Outcome
where
    W: AsyncWrite + Unpin,
{
    let Some(page) = error.error_page() else {
        return match error {
            ProxyError::Stream(e) => Outcome::Aborted(e),
            other => Outcome::Aborted(std::io::Error::other(other.to_string())),
        };
    };

    conn.advance(ConnectionState::Erroring);
    tracing::warn!(status = page.status, error = %error, "Rejecting request");
    match page.send(client).await {
        Ok(()) => Outcome::Rejected { status: page.status },
        Err(e) => Outcome::Aborted(e),
    }
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::PeerClosed => tracing::debug!("Client closed without a request"),
        Outcome::Rejected { status } => tracing::debug!(status, "Error response sent"),
        Outcome::Relayed(relay) => match &relay.end {
            RelayEnd::Complete => tracing::info!(
                header_bytes = relay.header_bytes,
                body_bytes = relay.body_bytes,
                "Response relayed"
            ),
            RelayEnd::UpstreamClosed => tracing::info!(
                body_bytes = relay.body_bytes,
                content_length = ?relay.content_length,
                "Upstream closed early; short response relayed"
            ),
            RelayEnd::UpstreamFailed(e) => tracing::warn!(
                body_bytes = relay.body_bytes,
                error = %e,
                "Upstream read failed mid-response"
            ),
            RelayEnd::HeaderTooLong => tracing::warn!("Upstream header line too long; relay stopped"),
            RelayEnd::ClientFailed(e) => tracing::warn!(error = %e, "Client write failed"),
        },
        Outcome::Aborted(e) => tracing::warn!(error = %e, "Client stream failed"),
    }
}
