//! Upstream response relay.
//!
//! # Responsibilities
//! - Forward response header lines to the client as they arrive
//! - Pick up `Content-Length` on the way through
//! - Forward exactly that many body bytes, or everything until EOF
//!
//! # Design Decisions
//! - No buffering beyond one line or one chunk; bytes leave in arrival order
//! - Upstream hiccups after the relay has started are not reported to the
//!   client: whatever was already forwarded is what it gets
//! - Transfer-Encoding is not interpreted; chunked bodies run to EOF

use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::line::{is_blank, read_line, LineError};

const CONTENT_LENGTH: &[u8] = b"content-length:";

/// Limits applied while relaying.
#[derive(Debug, Clone, Copy)]
pub struct RelayLimits {
    pub max_line: usize,
    pub chunk_size: usize,
}

/// How a relay finished.
#[derive(Debug)]
pub enum RelayEnd {
    /// Headers and the framed body were forwarded in full.
    Complete,
    /// Upstream closed before the declared length was reached.
    UpstreamClosed,
    /// Reading from upstream failed after the relay started.
    UpstreamFailed(std::io::Error),
    /// Writing to the client failed.
    ClientFailed(std::io::Error),
    /// An upstream header line exceeded the line limit.
    HeaderTooLong,
}

/// Summary of a single relayed response.
#[derive(Debug)]
pub struct RelayOutcome {
    pub header_bytes: u64,
    pub body_bytes: u64,
    pub content_length: Option<i64>,
    pub end: RelayEnd,
}

impl RelayOutcome {
    pub fn total_bytes(&self) -> u64 {
        self.header_bytes + self.body_bytes
    }
}

/// Parse an integer the way C's `atoi` does: skip leading whitespace, accept
/// an optional sign and as many digits as follow. Anything else yields 0.
fn parse_leading_int(raw: &[u8]) -> i64 {
    let raw = raw.trim_ascii_start();
    let (negative, digits) = match raw.first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let value = digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    if negative {
        -value
    } else {
        value
    }
}

/// Value of a `Content-Length:` header line, if this is one.
pub fn content_length(line: &[u8]) -> Option<i64> {
    let prefix = line.get(..CONTENT_LENGTH.len())?;
    if !prefix.eq_ignore_ascii_case(CONTENT_LENGTH) {
        return None;
    }
    Some(parse_leading_int(&line[CONTENT_LENGTH.len()..]))
}

/// Relay one response from `upstream` to `client`.
///
/// Never fails: every way the relay can end is reported in the outcome.
pub async fn relay_response<R, W>(upstream: &mut R, client: &mut W, limits: RelayLimits) -> RelayOutcome
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut outcome = RelayOutcome {
        header_bytes: 0,
        body_bytes: 0,
        content_length: None,
        end: RelayEnd::Complete,
    };

    let mut line = Vec::with_capacity(256);
    loop {
        line.clear();
        let n = match read_line(upstream, &mut line, limits.max_line).await {
            Ok(0) => {
                outcome.end = RelayEnd::UpstreamClosed;
                return finish(client, outcome).await;
            }
            Ok(n) => n,
            Err(LineError::TooLong { .. }) => {
                outcome.end = RelayEnd::HeaderTooLong;
                return finish(client, outcome).await;
            }
            Err(LineError::Io(e)) => {
                outcome.end = RelayEnd::UpstreamFailed(e);
                return finish(client, outcome).await;
            }
        };

        if let Err(e) = client.write_all(&line).await {
            outcome.end = RelayEnd::ClientFailed(e);
            return outcome;
        }
        outcome.header_bytes += n as u64;

        if let Some(length) = content_length(&line) {
            outcome.content_length = Some(length);
        }
        if is_blank(&line) {
            break;
        }
    }

    let mut chunk = vec![0u8; limits.chunk_size];
    let mut remaining = match outcome.content_length {
        Some(length) if length > 0 => Some(length as u64),
        _ => None,
    };

    loop {
        let want = match remaining {
            Some(0) => break,
            Some(left) => chunk.len().min(usize::try_from(left).unwrap_or(usize::MAX)),
            None => chunk.len(),
        };
        let n = match upstream.read(&mut chunk[..want]).await {
            Ok(0) => {
                if remaining.is_some() {
                    outcome.end = RelayEnd::UpstreamClosed;
                }
                break;
            }
            Ok(n) => n,
            Err(e) => {
                outcome.end = RelayEnd::UpstreamFailed(e);
                break;
            }
        };
        if let Err(e) = client.write_all(&chunk[..n]).await {
            outcome.end = RelayEnd::ClientFailed(e);
            return outcome;
        }
        outcome.body_bytes += n as u64;
        if let Some(left) = remaining.as_mut() {
            *left -= n as u64;
        }
    }

    finish(client, outcome).await
}

async fn finish<W>(client: &mut W, mut outcome: RelayOutcome) -> RelayOutcome
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = client.flush().await {
        outcome.end = RelayEnd::ClientFailed(e);
    }
    outcome
}
