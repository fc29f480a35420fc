use std::net::SocketAddr;

use axum::http::header::HeaderMap;

/// Resolve the originating network address of a request.
///
/// Forwarding headers win over the peer address so deployments behind a
/// reverse proxy record the real client: first entry of `X-Forwarded-For`,
/// then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.ip().to_string()
}
