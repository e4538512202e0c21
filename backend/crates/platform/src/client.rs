//! Client identification utilities
//!
//! Derives the identity used to key per-client counters from the peer address,
//! optionally honouring a reverse proxy's `X-Forwarded-For` header.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Strip a port suffix from a textual address.
///
/// Accepts `1.2.3.4:80`, `[::1]:80`, bare IPv4/IPv6 and hostnames. IPv6 brackets
/// are removed so `[::1]:80` and `::1` yield the same identity.
///
/// ## Examples
/// ```
/// use platform::client::client_identity;
/// assert_eq!(client_identity("10.0.0.7:51234"), "10.0.0.7");
/// assert_eq!(client_identity("[::1]:8080"), "::1");
/// ```
pub fn client_identity(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return addr.ip().to_canonical().to_string();
    }
    if let Ok(ip) = raw.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        return ip.to_canonical().to_string();
    }
    // Hostname with a port, e.g. "gateway.local:443"
    match raw.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            host.trim_start_matches('[').trim_end_matches(']').to_string()
        }
        _ => raw.to_string(),
    }
}

/// Extract client IP address.
///
/// When `trust_forwarded_for` is set, the first hop of `X-Forwarded-For` wins.
/// Only enable it behind a proxy that overwrites the header, otherwise any
/// caller can pick its own identity.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `peer` - Direct connection address
/// * `trust_forwarded_for` - Whether to honour `X-Forwarded-For`
///
/// ## Returns
/// The client identity string, or `None` if not determinable
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> Option<String> {
    if trust_forwarded_for {
        let first_hop = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|xff| xff.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());

        if let Some(hop) = first_hop {
            return Some(client_identity(hop));
        }
    }
    peer.map(|addr| addr.ip().to_canonical().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_identity_strips_port() {
        assert_eq!(client_identity("192.168.1.1:4567"), "192.168.1.1");
        assert_eq!(client_identity("[2001:db8::1]:443"), "2001:db8::1");
        assert_eq!(client_identity("gateway.local:443"), "gateway.local");
    }

    #[test]
    fn test_client_identity_without_port() {
        assert_eq!(client_identity("192.168.1.1"), "192.168.1.1");
        assert_eq!(client_identity("2001:db8::1"), "2001:db8::1");
        assert_eq!(client_identity("[2001:db8::1]"), "2001:db8::1");
        assert_eq!(client_identity("localhost"), "localhost");
    }

    #[test]
    fn test_ipv4_mapped_ipv6_is_canonical() {
        assert_eq!(client_identity("[::ffff:10.0.0.1]:80"), "10.0.0.1");
    }

    #[test]
    fn test_extract_client_ip_peer() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();

        let ip = extract_client_ip(&headers, Some(peer), false);
        assert_eq!(ip, Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let peer: SocketAddr = "10.0.0.1:50000".parse().unwrap();

        assert_eq!(
            extract_client_ip(&headers, Some(peer), false),
            Some("10.0.0.1".to_string())
        );
        assert_eq!(
            extract_client_ip(&headers, Some(peer), true),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn test_forwarded_for_with_port() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.9:7000"));

        assert_eq!(
            extract_client_ip(&headers, None, true),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn test_no_peer_no_header() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None, true), None);
    }
}
