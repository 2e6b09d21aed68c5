//! Single-threaded readiness loop.
//!
//! One loop owns the listener and a bounded registry of idle clients. Each
//! iteration waits until the listener or any registered client is readable,
//! registers a newly accepted client, then serves every ready client to
//! completion in slot order. A slow origin therefore stalls every other
//! ready client until its relay finishes.

use std::future::poll_fn;
use std::net::SocketAddr;
use std::task::{Context, Poll};

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::dispatch::registry::ConnectionRegistry;
use crate::dispatch::ACCEPT_BACKOFF;
use crate::http::ExchangeHandler;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};

/// A registered client waiting for its request.
struct Client {
    reader: BufReader<TcpStream>,
    peer: SocketAddr,
    guard: ConnectionGuard,
}

/// What became ready during one wait.
struct Ready {
    accepted: Option<Result<(TcpStream, SocketAddr), ListenerError>>,
    clients: Vec<usize>,
}

fn poll_ready(listener: &Listener, registry: &ConnectionRegistry<Client>, cx: &mut Context<'_>) -> Poll<Ready> {
    let accepted = match listener.poll_accept(cx) {
        Poll::Ready(result) => Some(result),
        Poll::Pending => None,
    };
    let clients: Vec<usize> = registry
        .iter()
        .filter(|(_, client)| client.reader.get_ref().poll_read_ready(cx).is_ready())
        .map(|(slot, _)| slot)
        .collect();

    if accepted.is_none() && clients.is_empty() {
        Poll::Pending
    } else {
        Poll::Ready(Ready { accepted, clients })
    }
}

pub(crate) async fn run(
    listener: &Listener,
    handler: ExchangeHandler,
    max_clients: usize,
    tracker: &ConnectionTracker,
    shutdown: &mut broadcast::Receiver<()>,
) {
    let mut registry = ConnectionRegistry::with_capacity(max_clients);

    loop {
        let ready = tokio::select! {
            _ = shutdown.recv() => break,
            ready = poll_fn(|cx| poll_ready(listener, &registry, cx)) => ready,
        };

        match ready.accepted {
            Some(Ok((stream, peer))) => {
                let guard = tracker.track();
                let id = guard.id();
                let client = Client {
                    reader: BufReader::new(stream),
                    peer,
                    guard,
                };
                match registry.insert(client) {
                    Ok(slot) => tracing::debug!(
                        connection_id = %id,
                        %peer,
                        slot,
                        high_water = registry.high_water(),
                        "Client registered"
                    ),
                    Err(_rejected) => tracing::error!(
                        connection_id = %id,
                        %peer,
                        capacity = registry.capacity(),
                        "Connection registry full; dropping client"
                    ),
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
            None => {}
        }

        for slot in ready.clients {
            if let Some(client) = registry.remove(slot) {
                handler
                    .serve_connection(client.reader, client.peer, client.guard)
                    .await;
            }
        }
    }

    if !registry.is_empty() {
        tracing::info!(idle_clients = registry.len(), "Closing idle clients");
    }
}
