//! Utility functions for Turnstile

use std::sync::LazyLock;

use if_addrs::IfAddr;

/// Characters allowed in a single node name (service keys are percent-encoded first)
static VALID_NODE_NAME: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:%=&+-]+$").expect("Invalid regex pattern"));

/// Validate a single node name (one path component)
///
/// # Examples
///
/// ```
/// use turnstile_common::is_valid_node_name;
///
/// assert!(is_valid_node_name("lock-0000000001"));
/// assert!(is_valid_node_name("group%3Dbj%26service%3DEcho"));
/// assert!(!is_valid_node_name("with/slash"));
/// assert!(!is_valid_node_name(""));
/// ```
pub fn is_valid_node_name(name: &str) -> bool {
    name != "." && name != ".." && VALID_NODE_NAME.is_match(name)
}

/// Get the local IP address
///
/// Returns the first non-loopback IPv4 address found,
/// or "127.0.0.1" as fallback.
pub fn local_ip() -> String {
    if_addrs::get_if_addrs()
        .ok()
        .and_then(|addrs| {
            addrs
                .into_iter()
                .find(|iface| !iface.is_loopback() && matches!(iface.addr, IfAddr::V4(_)))
                .and_then(|iface| match iface.addr {
                    IfAddr::V4(addr) => Some(addr.ip.to_string()),
                    _ => None,
                })
        })
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_node_names() {
        assert!(is_valid_node_name("svr-node1"));
        assert!(is_valid_node_name("lock--000000001"));
        assert!(is_valid_node_name("candidate-0000000042"));
    }

    #[test]
    fn test_invalid_node_names() {
        assert!(!is_valid_node_name(""));
        assert!(!is_valid_node_name("."));
        assert!(!is_valid_node_name(".."));
        assert!(!is_valid_node_name("a b"));
        assert!(!is_valid_node_name("a/b"));
    }

    #[test]
    fn test_local_ip_returns_valid_ip() {
        let ip = local_ip();
        assert!(
            ip == "127.0.0.1" || ip.split('.').filter_map(|s| s.parse::<u8>().ok()).count() == 4
        );
    }
}
