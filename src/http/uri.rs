//! Absolute-URI resolution.
//!
//! Splits `http://host[:port][/path]` into its parts. The authority is split
//! on its first `:`, so bracketed IPv6 literals are not understood. The path
//! is carried as raw bytes and forwarded unchanged.

use std::fmt;

const SCHEME: &[u8] = b"http://";
const DEFAULT_PORT: &str = "80";

/// Origin server address and path, derived from a request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub host: String,
    pub port: String,
    pub path: Vec<u8>,
}

/// Reasons a URI cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("URI does not start with http://")]
    UnsupportedScheme,
    #[error("authority of {len} bytes exceeds the {limit} byte limit")]
    AuthorityTooLong { len: usize, limit: usize },
    #[error("authority is not valid UTF-8")]
    MalformedAuthority,
    #[error("URI has no host")]
    MissingHost,
}

impl TargetAddress {
    /// Resolve an absolute `http://` URI.
    ///
    /// `max_authority` bounds the `host[:port]` part.
    pub fn parse(uri: &[u8], max_authority: usize) -> Result<Self, UriError> {
        let rest = match uri.get(..SCHEME.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(SCHEME) => &uri[SCHEME.len()..],
            _ => return Err(UriError::UnsupportedScheme),
        };

        let (authority, path) = match rest.iter().position(|&b| b == b'/') {
            Some(slash) => rest.split_at(slash),
            None => (rest, &b"/"[..]),
        };
        if authority.len() >= max_authority {
            return Err(UriError::AuthorityTooLong {
                len: authority.len(),
                limit: max_authority,
            });
        }

        let authority = std::str::from_utf8(authority).map_err(|_| UriError::MalformedAuthority)?;
        let (host, port) = authority.split_once(':').unwrap_or((authority, DEFAULT_PORT));
        if host.is_empty() {
            return Err(UriError::MissingHost);
        }

        Ok(Self {
            host: host.to_string(),
            port: port.to_string(),
            path: path.to_vec(),
        })
    }

    /// `host:port`, as used for logging.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "http://{}:{}{}",
            self.host,
            self.port,
            String::from_utf8_lossy(&self.path)
        )
    }
}
