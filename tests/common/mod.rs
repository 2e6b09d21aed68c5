//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use relay_proxy::config::{ListenerConfig, ProxyConfig, Strategy};
use relay_proxy::lifecycle::startup::{run_until, StartupError};
use relay_proxy::lifecycle::Shutdown;
use relay_proxy::net::listener::Listener;

/// Origin server that answers every connection with a fixed raw response.
///
/// Returns its address and a channel yielding each request head it saw,
/// one line per entry with the `\r\n` stripped.
pub async fn start_origin(response: impl Into<Vec<u8>>) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<String>>) {
    let response: Arc<[u8]> = response.into().into();
    start_programmable_origin(move |_head| {
        let response = Arc::clone(&response);
        async move { response.to_vec() }
    })
    .await
}

/// Origin server whose response is computed from the request head.
pub async fn start_programmable_origin<F, Fut>(f: F) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<String>>)
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Vec<u8>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = Arc::clone(&f);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut socket = BufReader::new(socket);
                let head = read_head(&mut socket).await;
                let _ = tx.send(head.clone());
                let response = f(head).await;
                let _ = socket.get_mut().write_all(&response).await;
                let _ = socket.get_mut().shutdown().await;
            });
        }
    });

    (addr, rx)
}

async fn read_head(socket: &mut BufReader<TcpStream>) -> Vec<String> {
    let mut head = Vec::new();
    loop {
        let mut line = String::new();
        match socket.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if line.is_empty() {
            break;
        }
        head.push(line);
    }
    head
}

/// Origin server that records each request head as raw bytes, blank line
/// included, and answers with a fixed response.
pub async fn start_raw_origin(response: impl Into<Vec<u8>>) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let response: Arc<[u8]> = response.into().into();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let response = Arc::clone(&response);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut socket = BufReader::new(socket);
                let mut head = Vec::new();
                loop {
                    let start = head.len();
                    match socket.read_until(b'\n', &mut head).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                    if matches!(&head[start..], b"\r\n" | b"\n") {
                        break;
                    }
                }
                let _ = tx.send(head);
                let _ = socket.get_mut().write_all(&response).await;
                let _ = socket.get_mut().shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// True when no connection reaches the origin within a short window.
pub async fn origin_stays_idle<T>(heads: &mut mpsc::UnboundedReceiver<T>) -> bool {
    tokio::time::timeout(Duration::from_millis(200), heads.recv()).await.is_err()
}

/// A port nothing is listening on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// A proxy running in-process on an ephemeral port.
pub struct ProxyHandle {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    server: JoinHandle<Result<(), StartupError>>,
}

impl ProxyHandle {
    /// Trigger shutdown and wait for the drain to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.server)
            .await
            .expect("proxy did not stop")
            .unwrap()
            .unwrap();
    }
}

pub fn test_config(strategy: Strategy) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener = ListenerConfig {
        bind_host: "127.0.0.1".into(),
        port: 0,
        max_connections: 64,
    };
    config.dispatch.strategy = strategy;
    config.dispatch.drain_timeout_secs = 2;
    if strategy == Strategy::Process {
        config.dispatch.worker_program = Some(env!("CARGO_BIN_EXE_relay-worker").into());
    }
    config
}

pub async fn start_proxy(config: ProxyConfig) -> ProxyHandle {
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { run_until(config, listener, &shutdown).await })
    };
    ProxyHandle { addr, shutdown, server }
}

/// Send raw bytes to the proxy and read until it closes the connection.
///
/// A reset after the response counts as the end of it: the proxy closes
/// early on rejected requests, leaving unread input behind.
pub async fn send_raw(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(request).await.unwrap();
    read_until_closed(&mut client).await
}

pub async fn read_until_closed(client: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    let read_all = async {
        loop {
            match client.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => response.extend_from_slice(&chunk[..n]),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), read_all)
        .await
        .expect("proxy did not close the connection");
    response
}

pub fn get_request(origin: SocketAddr, path: &str, headers: &[&str]) -> Vec<u8> {
    let mut request = format!("GET http://{}{} HTTP/1.0\r\n", origin, path);
    for header in headers {
        request.push_str(header);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request.into_bytes()
}
