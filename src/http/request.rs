//! Request line and header block parsing.
//!
//! # Responsibilities
//! - Read the request line and split it into method, URI and version
//! - Reject methods other than GET before any header is read
//! - Collect raw header lines up to the blank terminator
//!
//! # Design Decisions
//! - Every line goes through the bounded line reader; over-long lines are
//!   rejected rather than truncated
//! - Lines are handled as bytes; the URI and header lines need not be UTF-8
//! - Header lines are kept verbatim with their own terminator and in order,
//!   since the rewriter forwards most of them untouched

use tokio::io::AsyncBufRead;

use crate::http::error::ProxyError;
use crate::http::line::{is_blank, read_line, trim_terminator, LineError};

/// The only method the relay forwards.
pub const SUPPORTED_METHOD: &str = "GET";

/// A parsed client request, minus any body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub uri: Vec<u8>,
    pub version: Vec<u8>,
    /// Raw header lines including their terminators, in arrival order.
    pub headers: Vec<Vec<u8>>,
}

impl ParsedRequest {
    /// Read one request from `reader`.
    ///
    /// Returns `Ok(None)` when the peer closed the connection before sending
    /// anything.
    pub async fn read<R>(reader: &mut R, max_line: usize) -> Result<Option<Self>, ProxyError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        let n = read_line(reader, &mut buf, max_line)
            .await
            .map_err(|e| line_error(e, "Request line too long"))?;
        if n == 0 {
            return Ok(None);
        }

        let mut tokens = trim_terminator(&buf)
            .split(|b| b.is_ascii_whitespace())
            .filter(|token| !token.is_empty());
        let (Some(method), Some(uri), Some(version)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(ProxyError::BadRequest("Malformed request line"));
        };

        if !method.eq_ignore_ascii_case(SUPPORTED_METHOD.as_bytes()) {
            return Err(ProxyError::NotImplemented(
                String::from_utf8_lossy(method).into_owned(),
            ));
        }

        let mut request = Self {
            method: String::from_utf8_lossy(method).into_owned(),
            uri: uri.to_vec(),
            version: version.to_vec(),
            headers: Vec::new(),
        };
        request.read_headers(reader, max_line).await?;
        Ok(Some(request))
    }

    async fn read_headers<R>(&mut self, reader: &mut R, max_line: usize) -> Result<(), ProxyError>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let mut buf = Vec::new();
            let n = read_line(reader, &mut buf, max_line)
                .await
                .map_err(|e| line_error(e, "Header line too long"))?;
            if n == 0 || !buf.ends_with(b"\n") {
                return Err(ProxyError::Stream(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed inside the header block",
                )));
            }
            if is_blank(&buf) {
                return Ok(());
            }
            self.headers.push(buf);
        }
    }

    /// `METHOD URI VERSION`, as used for logging.
    pub fn request_line(&self) -> String {
        format!(
            "{} {} {}",
            self.method,
            String::from_utf8_lossy(&self.uri),
            String::from_utf8_lossy(&self.version)
        )
    }
}

fn line_error(error: LineError, too_long: &'static str) -> ProxyError {
    match error {
        LineError::TooLong { .. } => ProxyError::BadRequest(too_long),
        LineError::Io(e) => ProxyError::Stream(e),
    }
}
