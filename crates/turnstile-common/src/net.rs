//! Network address helpers
//!
//! Compose `host:port` style addresses and websocket URLs. IPv6 literals are
//! bracketed, so the output always splits back cleanly with [`split_host_port`].

use crate::error::CommonError;

/// Compose a `host:port` address.
///
/// # Examples
///
/// ```
/// use turnstile_common::host_address;
///
/// assert_eq!(host_address("127.0.0.1", 2181), "127.0.0.1:2181");
/// assert_eq!(host_address("::1", 2181), "[::1]:2181");
/// ```
pub fn host_address(host: &str, port: impl std::fmt::Display) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Compose a `ws://host:port/path` URL.
pub fn ws_host_address(host: &str, port: impl std::fmt::Display, path: &str) -> String {
    format!("ws://{}{}", host_address(host, port), path)
}

/// Compose a `wss://host:port/path` URL.
pub fn wss_host_address(host: &str, port: impl std::fmt::Display, path: &str) -> String {
    format!("wss://{}{}", host_address(host, port), path)
}

/// Split a `host:port` address into host and port.
///
/// The inverse of [`host_address`]: brackets around IPv6 hosts are removed.
pub fn split_host_port(addr: &str) -> Result<(String, String), CommonError> {
    let invalid = |reason: &str| CommonError::InvalidAddress(addr.to_string(), reason.to_string());

    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| invalid("missing ']'"))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| invalid("missing port"))?;
        return Ok((host.to_string(), port.to_string()));
    }

    let (host, port) = addr.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    if host.contains(':') {
        return Err(invalid("too many colons"));
    }
    Ok((host.to_string(), port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_address() {
        assert_eq!(host_address("10.0.0.1", 8080), "10.0.0.1:8080");
        assert_eq!(host_address("zk1", "2181"), "zk1:2181");
        assert_eq!(host_address("fe80::1", 80), "[fe80::1]:80");
    }

    #[test]
    fn test_websocket_addresses() {
        assert_eq!(
            ws_host_address("127.0.0.1", 8080, "/echo"),
            "ws://127.0.0.1:8080/echo"
        );
        assert_eq!(
            wss_host_address("example.com", 443, "/ws"),
            "wss://example.com:443/ws"
        );
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("127.0.0.1:2181").unwrap(),
            ("127.0.0.1".to_string(), "2181".to_string())
        );
        assert_eq!(
            split_host_port("[::1]:2181").unwrap(),
            ("::1".to_string(), "2181".to_string())
        );
        assert!(split_host_port("no-port").is_err());
        assert!(split_host_port("::1:2181").is_err());
        assert!(split_host_port("[::1]2181").is_err());
    }

    #[test]
    fn test_split_inverts_host_address() {
        for (host, port) in [("zk.local", "2181"), ("::1", "80"), ("192.168.1.2", "8848")] {
            let addr = host_address(host, port);
            assert_eq!(
                split_host_port(&addr).unwrap(),
                (host.to_string(), port.to_string())
            );
        }
    }
}
