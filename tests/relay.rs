//! End-to-end relay behaviour, exercised under every in-process strategy.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use relay_proxy::config::Strategy;
use relay_proxy::http::headers::USER_AGENT;

mod common;

use common::{
    get_request, origin_stays_idle, read_until_closed, send_raw, start_origin, start_proxy, start_raw_origin, test_config,
    unused_port,
};

async fn content_length_frames_body(strategy: Strategy) {
    let (origin, mut heads) =
        start_origin(&b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\nX-Origin: yes\r\n\r\nhelloEXTRA BYTES"[..]).await;
    let proxy = start_proxy(test_config(strategy)).await;

    let response = send_raw(proxy.addr, &get_request(origin, "/greeting", &["Accept: */*"])).await;
    assert_eq!(
        response,
        b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\nX-Origin: yes\r\n\r\nhello".to_vec()
    );

    let head = heads.recv().await.unwrap();
    assert_eq!(head[0], "GET /greeting HTTP/1.0");
    assert_eq!(head[1], "Accept: */*");
    assert!(head.contains(&format!("User-Agent: {}", USER_AGENT)));
    assert!(head.contains(&"Host: 127.0.0.1".to_string()));
    assert!(head.contains(&"Connection: close".to_string()));
    assert!(head.contains(&"Proxy-Connection: close".to_string()));

    proxy.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn content_length_frames_body_thread() {
    content_length_frames_body(Strategy::Thread).await;
}

#[tokio::test]
async fn content_length_frames_body_task() {
    content_length_frames_body(Strategy::Task).await;
}

#[tokio::test]
async fn content_length_frames_body_multiplexed() {
    content_length_frames_body(Strategy::Multiplexed).await;
}

async fn body_without_length_runs_to_eof(strategy: Strategy) {
    let body = "x".repeat(20_000);
    let raw = format!("HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\n{}", body);
    let (origin, _heads) = start_origin(raw.clone()).await;
    let proxy = start_proxy(test_config(strategy)).await;

    let response = send_raw(proxy.addr, &get_request(origin, "/", &[])).await;
    assert_eq!(response, raw.into_bytes());

    proxy.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn body_without_length_runs_to_eof_thread() {
    body_without_length_runs_to_eof(Strategy::Thread).await;
}

#[tokio::test]
async fn body_without_length_runs_to_eof_multiplexed() {
    body_without_length_runs_to_eof(Strategy::Multiplexed).await;
}

#[tokio::test]
async fn short_body_is_relayed_as_is() {
    let (origin, _heads) = start_origin(&b"HTTP/1.0 200 OK\r\nContent-Length: 100\r\n\r\nonly this"[..]).await;
    let proxy = start_proxy(test_config(Strategy::Task)).await;

    let response = send_raw(proxy.addr, &get_request(origin, "/", &[])).await;
    assert_eq!(response, b"HTTP/1.0 200 OK\r\nContent-Length: 100\r\n\r\nonly this".to_vec());

    proxy.stop().await;
}

#[tokio::test]
async fn client_headers_are_rewritten() {
    let (origin, mut heads) = start_origin(&b"HTTP/1.0 204 No Content\r\n\r\n"[..]).await;
    let proxy = start_proxy(test_config(Strategy::Task)).await;

    let request = get_request(
        origin,
        "/a?b=c",
        &[
            "user-agent: curl/8.0",
            "Host: example.test",
            "Proxy-Connection: keep-alive",
            "Connection: keep-alive",
            "Cookie: k=v",
        ],
    );
    send_raw(proxy.addr, &request).await;

    let head = heads.recv().await.unwrap();
    assert_eq!(
        head,
        vec![
            "GET /a?b=c HTTP/1.0".to_string(),
            "Host: example.test".to_string(),
            "Cookie: k=v".to_string(),
            format!("User-Agent: {}", USER_AGENT),
            "Connection: close".to_string(),
            "Proxy-Connection: close".to_string(),
        ]
    );

    proxy.stop().await;
}

#[tokio::test]
async fn explicit_port_and_empty_path() {
    let (origin, mut heads) = start_origin(&b"HTTP/1.0 200 OK\r\nContent-Length: 0\r\n\r\n"[..]).await;
    let proxy = start_proxy(test_config(Strategy::Task)).await;

    let request = format!("GET http://127.0.0.1:{} HTTP/1.0\r\n\r\n", origin.port());
    let response = send_raw(proxy.addr, request.as_bytes()).await;
    assert_eq!(response, b"HTTP/1.0 200 OK\r\nContent-Length: 0\r\n\r\n".to_vec());
    assert_eq!(heads.recv().await.unwrap()[0], "GET / HTTP/1.0");

    proxy.stop().await;
}

async fn error_pages(strategy: Strategy) {
    let proxy = start_proxy(test_config(strategy)).await;

    let response = String::from_utf8(send_raw(proxy.addr, b"GET /\r\n\r\n").await).unwrap();
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
    assert!(response.contains("Content-Type: text/html\r\n"));

    let response = String::from_utf8(send_raw(proxy.addr, b"POST http://127.0.0.1/ HTTP/1.0\r\n\r\n").await).unwrap();
    assert!(response.starts_with("HTTP/1.0 501 Not Implemented\r\n"));
    assert!(response.contains("Proxy does not implement this method"));

    let response = String::from_utf8(send_raw(proxy.addr, b"GET ftp://host/file HTTP/1.0\r\n\r\n").await).unwrap();
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
    assert!(response.contains("Failed to parse URI"));

    let request = format!("GET http://127.0.0.1:{}/ HTTP/1.0\r\n\r\n", unused_port().await);
    let response = String::from_utf8(send_raw(proxy.addr, request.as_bytes()).await).unwrap();
    assert!(response.starts_with("HTTP/1.0 502 Bad Gateway\r\n"));
    assert!(response.contains("Failed to connect to server"));

    proxy.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_pages_thread() {
    error_pages(Strategy::Thread).await;
}

#[tokio::test]
async fn error_pages_task() {
    error_pages(Strategy::Task).await;
}

#[tokio::test]
async fn error_pages_multiplexed() {
    error_pages(Strategy::Multiplexed).await;
}

async fn rejected_requests_never_reach_origin(strategy: Strategy) {
    let (origin, mut heads) = start_origin(&b"HTTP/1.0 200 OK\r\n\r\n"[..]).await;
    let proxy = start_proxy(test_config(strategy)).await;

    let request = format!("POST http://{}/x HTTP/1.0\r\nContent-Length: 0\r\n\r\n", origin);
    let response = String::from_utf8(send_raw(proxy.addr, request.as_bytes()).await).unwrap();
    assert!(response.starts_with("HTTP/1.0 501 Not Implemented\r\n"));

    let request = format!("GET http://{}/x\r\n\r\n", origin);
    let response = String::from_utf8(send_raw(proxy.addr, request.as_bytes()).await).unwrap();
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));

    assert!(origin_stays_idle(&mut heads).await);
    proxy.stop().await;
}

#[tokio::test]
async fn rejected_requests_never_reach_origin_task() {
    rejected_requests_never_reach_origin(Strategy::Task).await;
}

#[tokio::test]
async fn rejected_requests_never_reach_origin_multiplexed() {
    rejected_requests_never_reach_origin(Strategy::Multiplexed).await;
}

#[tokio::test]
async fn non_utf8_request_bytes_reach_origin_unchanged() {
    let (origin, mut heads) = start_raw_origin(&b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nok"[..]).await;
    let proxy = start_proxy(test_config(Strategy::Task)).await;

    let mut request = format!("GET http://{}/caf", origin).into_bytes();
    request.extend_from_slice(b"\xe9 HTTP/1.0\r\nX-Name: caf\xe9\r\nX-Bare: 1\n\r\n");
    let response = send_raw(proxy.addr, &request).await;
    assert_eq!(response, b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec());

    let head = heads.recv().await.unwrap();
    assert!(head.starts_with(b"GET /caf\xe9 HTTP/1.0\r\nX-Name: caf\xe9\r\nX-Bare: 1\nUser-Agent: "));

    proxy.stop().await;
}

#[tokio::test]
async fn over_long_request_line_is_rejected() {
    let mut config = test_config(Strategy::Task);
    config.relay.max_line_length = 64;
    let proxy = start_proxy(config).await;

    let request = format!("GET http://127.0.0.1/{} HTTP/1.0\r\n\r\n", "a".repeat(200));
    let response = String::from_utf8(send_raw(proxy.addr, request.as_bytes()).await).unwrap();
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
    assert!(response.contains("Request line too long"));

    proxy.stop().await;
}

#[tokio::test]
async fn silent_client_gets_nothing() {
    let proxy = start_proxy(test_config(Strategy::Task)).await;
    let mut client = TcpStream::connect(proxy.addr).await.unwrap();
    client.shutdown().await.unwrap();
    assert!(read_until_closed(&mut client).await.is_empty());
    proxy.stop().await;
}

#[tokio::test]
async fn reqwest_through_proxy() {
    let (origin, mut heads) =
        start_origin(&b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 11\r\n\r\nhello world"[..]).await;
    let proxy = start_proxy(test_config(Strategy::Task)).await;

    let client = reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(format!("http://{}", proxy.addr)).unwrap())
        .build()
        .unwrap();
    let response = client
        .get(format!("http://{}/via-proxy", origin))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "hello world");

    let head = heads.recv().await.unwrap();
    assert_eq!(head[0], "GET /via-proxy HTTP/1.1");
    assert!(head.iter().any(|l| l.eq_ignore_ascii_case(&format!("host: {}", origin))));

    proxy.stop().await;
}
