//! Per-exchange error taxonomy and the HTML error responder.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::uri::UriError;

/// Everything that can stop an exchange before the relay starts.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Malformed or over-long request/header line.
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    /// A method other than GET.
    #[error("method {0:?} not implemented")]
    NotImplemented(String),
    /// The request target could not be resolved.
    #[error("bad URI {uri:?}: {reason}")]
    BadUri { uri: String, reason: UriError },
    /// The origin server could not be reached.
    #[error("cannot connect to {authority}: {source}")]
    BadGateway {
        authority: String,
        #[source]
        source: std::io::Error,
    },
    /// The client stream failed; nothing can be sent back.
    #[error("client stream failed: {0}")]
    Stream(#[source] std::io::Error),
}

impl ProxyError {
    /// The error response owed to the client, if one can still be sent.
    pub fn error_page(&self) -> Option<ErrorPage> {
        let page = match self {
            ProxyError::BadRequest(msg) => ErrorPage::new(400, "Bad Request", *msg),
            ProxyError::NotImplemented(_) => {
                ErrorPage::new(501, "Not Implemented", "Proxy does not implement this method")
            }
            ProxyError::BadUri { .. } => ErrorPage::new(400, "Bad Request", "Failed to parse URI"),
            ProxyError::BadGateway { .. } => {
                ErrorPage::new(502, "Bad Gateway", "Failed to connect to server")
            }
            ProxyError::Stream(_) => return None,
        };
        Some(page)
    }
}

/// A complete, self-contained HTTP/1.0 error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: u16,
    pub reason: &'static str,
    pub message: &'static str,
}

impl ErrorPage {
    pub fn new(status: u16, reason: &'static str, message: &'static str) -> Self {
        Self {
            status,
            reason,
            message,
        }
    }

    pub fn body(&self) -> String {
        format!(
            "<html><title>{status} {reason}</title><body bgcolor=\"ffffff\">\r\n\
             {status} {reason}\r\n\
             <p>{message}\r\n\
             </body></html>\r\n",
            status = self.status,
            reason = self.reason,
            message = self.message,
        )
    }

    /// Status line, headers and body in one buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.body();
        let mut buf = format!(
            "HTTP/1.0 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
            self.status,
            self.reason,
            body.len()
        )
        .into_bytes();
        buf.extend_from_slice(body.as_bytes());
        buf
    }

    /// Write the whole response and flush it.
    pub async fn send<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await
    }
}
