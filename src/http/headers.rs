//! Upstream request construction.
//!
//! The proxy replaces the client's `User-Agent`, `Connection` and
//! `Proxy-Connection` headers with its own, adds `Host` when the client left
//! it out, and forwards everything else byte for byte and in order.

use crate::http::request::ParsedRequest;
use crate::http::uri::TargetAddress;

/// User agent presented to every origin server.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

/// Client headers that never reach the origin.
const REPLACED: [&str; 3] = ["User-Agent", "Connection", "Proxy-Connection"];

/// Header name of a raw line: everything before the first `:`.
fn header_name(line: &[u8]) -> Option<&[u8]> {
    line.iter().position(|&b| b == b':').map(|colon| &line[..colon])
}

fn is_named(line: &[u8], name: &str) -> bool {
    header_name(line).is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes()))
}

/// Build the header block sent upstream, including the terminating blank line.
///
/// Forwarded lines keep the terminator they arrived with.
pub fn rewrite_headers(headers: &[Vec<u8>], host: &str) -> Vec<u8> {
    let mut block = Vec::new();
    let mut host_present = false;

    for line in headers {
        if REPLACED.iter().any(|name| is_named(line, name)) {
            continue;
        }
        if is_named(line, "Host") {
            host_present = true;
        }
        block.extend_from_slice(line);
    }

    block.extend_from_slice(b"User-Agent: ");
    block.extend_from_slice(USER_AGENT.as_bytes());
    block.extend_from_slice(b"\r\n");
    if !host_present {
        block.extend_from_slice(b"Host: ");
        block.extend_from_slice(host.as_bytes());
        block.extend_from_slice(b"\r\n");
    }
    block.extend_from_slice(b"Connection: close\r\n");
    block.extend_from_slice(b"Proxy-Connection: close\r\n");
    block.extend_from_slice(b"\r\n");
    block
}

/// Request line (origin-form path) followed by the rewritten header block.
pub fn build_upstream_request(request: &ParsedRequest, target: &TargetAddress) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(request.method.as_bytes());
    out.push(b' ');
    out.extend_from_slice(&target.path);
    out.push(b' ');
    out.extend_from_slice(&request.version);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&rewrite_headers(&request.headers, &target.host));
    out
}
