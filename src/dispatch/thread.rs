//! Thread-per-connection workers.

use std::io;
use std::net::SocketAddr;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::runtime::Handle;

use crate::http::ExchangeHandler;
use crate::net::connection::ConnectionGuard;
use crate::net::listener::ConnectionPermit;

/// Start a detached OS thread that serves one exchange and exits.
///
/// The thread drives its I/O through `runtime`, which must be a multi-thread
/// runtime so its reactor keeps running while the thread blocks.
pub(crate) fn spawn_worker(
    runtime: &Handle,
    handler: ExchangeHandler,
    stream: TcpStream,
    peer: SocketAddr,
    permit: ConnectionPermit,
    guard: ConnectionGuard,
) -> io::Result<()> {
    let runtime = runtime.clone();
    std::thread::Builder::new()
        .name(format!("relay-{}", guard.id()))
        .spawn(move || {
            let _permit = permit;
            runtime.block_on(handler.serve_connection(BufReader::new(stream), peer, guard));
        })
        .map(drop)
}
