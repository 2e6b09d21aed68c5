//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted client connection
//!     → handler.rs (one exchange per connection)
//!     → request.rs (request line + header block, via line.rs)
//!     → uri.rs (absolute URI → host, port, path)
//!     → headers.rs (rewrite headers, build upstream request)
//!     → net/upstream.rs (connect to origin)
//!     → response.rs (relay headers, frame body by Content-Length)
//!     → Client
//!
//! Any failure before the relay starts:
//!     → error.rs (status + HTML error page)
//! ```

pub mod error;
pub mod handler;
pub mod headers;
pub mod line;
pub mod request;
pub mod response;
pub mod uri;

pub use error::{ErrorPage, ProxyError};
pub use handler::{ExchangeHandler, Outcome};
pub use request::ParsedRequest;
pub use response::{RelayEnd, RelayLimits, RelayOutcome};
pub use uri::TargetAddress;
