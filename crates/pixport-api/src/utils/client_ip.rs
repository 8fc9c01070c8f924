//! Client identifier derivation.
//!
//! Quota is attributed per network origin. When behind a load balancer the
//! X-Forwarded-For header carries a chain of IPs; this module validates and
//! extracts the client IP based on how many proxies are trusted. The
//! identifier remains spoofable by a client that controls its forwarded
//! headers - a known, accepted weakness of IP-keyed quotas.

use crate::state::AppState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Extract and validate the client IP from request headers.
///
/// Order: X-Forwarded-For (validated against `trusted_proxy_count`),
/// X-Real-IP, then the direct socket address, then "unknown".
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(header_value) = forwarded_for.to_str() {
            let ip = extract_from_forwarded_for(header_value, trusted_proxy_count);
            if ip != "unknown" {
                return ip;
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(header_value) = real_ip.to_str() {
            let trimmed = header_value.trim();
            if is_valid_ip(trimmed) {
                return trimmed.to_string();
            }
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Extract the client IP from an X-Forwarded-For chain
/// (`client, proxy1, proxy2, ...`).
///
/// With `trusted_proxy_count` N, the last N entries are trusted proxies and
/// the entry before them is the client.
fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> String {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if ips.is_empty() {
        return "unknown".to_string();
    }

    // With no trusted proxies the header cannot be trusted; use the last IP
    // in the chain (closest to us), validated.
    if trusted_proxy_count == 0 || ips.len() <= trusted_proxy_count {
        let last_ip = ips.last().unwrap_or(&"");
        if is_valid_ip(last_ip) {
            return last_ip.to_string();
        }
        return "unknown".to_string();
    }

    let client_ip_pos = ips.len().saturating_sub(trusted_proxy_count + 1);
    let client_ip = ips.get(client_ip_pos).unwrap_or(&"");

    if is_valid_ip(client_ip) {
        return client_ip.to_string();
    }

    "unknown".to_string()
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}

/// Extractor for the quota client identifier.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        Ok(ClientIp(extract_client_ip(
            &parts.headers,
            socket_addr.as_ref(),
            state.config.trusted_proxy_count(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn create_headers_with_xff(xff_value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(xff_value).unwrap());
        headers
    }

    #[test]
    fn test_extract_from_forwarded_for_single_ip() {
        assert_eq!(extract_from_forwarded_for("192.168.1.1", 0), "192.168.1.1");
        assert_eq!(extract_from_forwarded_for("192.168.1.1", 1), "192.168.1.1");
    }

    #[test]
    fn test_extract_from_forwarded_for_with_proxy() {
        // Client -> Proxy -> Server: "client, proxy"
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1, 10.0.0.1", 1),
            "192.168.1.1"
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_multiple_proxies() {
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1, 10.0.0.1, 10.0.0.2", 2),
            "192.168.1.1"
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_no_trusted_proxies() {
        // Trust count 0: use the IP closest to us
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1, 10.0.0.1", 0),
            "10.0.0.1"
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_invalid_ip() {
        assert_eq!(
            extract_from_forwarded_for("not.an.ip.address", 0),
            "unknown"
        );
    }

    #[test]
    fn test_extract_client_ip_from_xff() {
        let headers = create_headers_with_xff("192.168.1.1");
        assert_eq!(extract_client_ip(&headers, None, 0), "192.168.1.1");
    }

    #[test]
    fn test_extract_client_ip_from_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.1.2.3"));
        assert_eq!(extract_client_ip(&headers, None, 1), "10.1.2.3");
    }

    #[test]
    fn test_extract_client_ip_fallback_to_socket() {
        let headers = HeaderMap::new();
        let socket = SocketAddr::from(([127, 0, 0, 1], 8080));
        assert_eq!(extract_client_ip(&headers, Some(&socket), 0), "127.0.0.1");
    }

    #[test]
    fn test_extract_client_ip_fallback_to_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers, None, 0), "unknown");
    }

    #[test]
    fn test_is_valid_ip() {
        assert!(is_valid_ip("192.168.1.1"));
        assert!(is_valid_ip("::1"));
        assert!(!is_valid_ip("not.an.ip"));
        assert!(!is_valid_ip(""));
        assert!(!is_valid_ip("999.999.999.999"));
    }
}
