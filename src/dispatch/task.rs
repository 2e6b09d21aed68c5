//! Task-per-connection workers.

use std::net::SocketAddr;

use tokio::io::BufReader;
use tokio::net::TcpStream;

use crate::http::ExchangeHandler;
use crate::net::connection::ConnectionGuard;
use crate::net::listener::ConnectionPermit;

/// Spawn a detached runtime task that serves one exchange.
pub(crate) fn spawn_worker(
    handler: ExchangeHandler,
    stream: TcpStream,
    peer: SocketAddr,
    permit: ConnectionPermit,
    guard: ConnectionGuard,
) {
    tokio::spawn(async move {
        let _permit = permit;
        handler
            .serve_connection(BufReader::new(stream), peer, guard)
            .await;
    });
}
