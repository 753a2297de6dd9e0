use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Proxy headers consulted in order before the transport address.
pub const CLIENT_IP_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "x-client-ip"];

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves the rate-limit key for a client: `X-Forwarded-For` (first hop),
/// then `X-Real-IP`, then `X-Client-IP`, then the socket peer address.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .find_map(|name| header_ip(headers, name))
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let map = headers(&[("x-forwarded-for", "1.1.1.1"), ("x-real-ip", "2.2.2.2")]);
        assert_eq!(client_ip(&map, None), "1.1.1.1");
    }

    #[test]
    fn forwarded_for_uses_first_hop() {
        let map = headers(&[("x-forwarded-for", " 9.9.9.9 , 10.0.0.1")]);
        assert_eq!(client_ip(&map, None), "9.9.9.9");
    }

    #[test]
    fn falls_through_header_precedence() {
        let map = headers(&[("x-client-ip", "3.3.3.3"), ("x-real-ip", "2.2.2.2")]);
        assert_eq!(client_ip(&map, None), "2.2.2.2");
        let map = headers(&[("x-client-ip", "3.3.3.3")]);
        assert_eq!(client_ip(&map, None), "3.3.3.3");
    }

    #[test]
    fn empty_header_is_skipped() {
        let map = headers(&[("x-forwarded-for", ""), ("x-real-ip", "2.2.2.2")]);
        assert_eq!(client_ip(&map, None), "2.2.2.2");
    }

    #[test]
    fn uses_remote_address_last() {
        let remote: SocketAddr = "192.0.2.7:4431".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(remote)), "192.0.2.7");
        assert_eq!(client_ip(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }
}
