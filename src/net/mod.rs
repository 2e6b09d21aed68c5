//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (id, lifecycle tracking, state machine)
//!     → Hand off to a dispatch strategy
//!
//! Outgoing:
//!     upstream.rs (connect to the origin named by the request URI)
//!
//! Connection States:
//!     Accepted → Parsing → Relaying | Erroring → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each connection tracked for graceful shutdown

pub mod connection;
pub mod listener;
pub mod upstream;
