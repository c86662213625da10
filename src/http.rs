//! Client-IP resolution shared by the `/connect/` handshake and the node
//! registry.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Pull the first hop out of `X-Forwarded-For`, the way the original
/// implementation's `get_client_ip` reads `request.META['HTTP_X_FORWARDED_FOR']`.
pub fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<IpAddr>().ok())
}

/// Resolve the address a storage node is registering from: the forwarded
/// header if present (reverse proxy in front of the coordinator), otherwise
/// the TCP peer address axum observed directly.
pub fn resolve_client_ip(headers: &HeaderMap, connect_ip: Option<IpAddr>) -> Option<IpAddr> {
    extract_forwarded_ip(headers).or(connect_ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", value.parse().unwrap());
        headers
    }

    #[test]
    fn extracts_first_hop() {
        let headers = headers_with("10.0.0.1, 10.0.0.2");
        assert_eq!(extract_forwarded_ip(&headers), Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn falls_back_to_connect_ip() {
        let headers = HeaderMap::new();
        let connect_ip = Some("127.0.0.1".parse().unwrap());
        assert_eq!(resolve_client_ip(&headers, connect_ip), connect_ip);
    }
}
