//! Client address and user agent for session bookkeeping.

use axum::http::HeaderMap;
use std::net::SocketAddr;

use crate::auth::ClientInfo;

/// Best-effort client IP.
///
/// First `X-Forwarded-For` entry, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Collect the client details stored on a new session.
pub fn client_info(headers: &HeaderMap, user_agent: Option<&str>, peer: Option<SocketAddr>) -> ClientInfo {
    ClientInfo {
        user_agent: user_agent.unwrap_or_default().to_string(),
        ip_address: client_ip(headers, peer),
    }
}
