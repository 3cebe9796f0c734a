//! SSRF guard. Validates every outbound URL before the first
//! byte is sent: scheme allowlist, hostname presence, then DNS-resolve every
//! candidate address and reject if any of them land in a private/loopback/
//! link-local range.
//!
//! Grounded in `ClaudeHydra-v4`'s `is_ssrf_target`/`validate_and_check_url`
//! IPv4/IPv6 classification, generalized here to resolve the hostname via
//! `tokio::net::lookup_host` first rather than only rejecting literal-IP
//! hosts — a bare hostname that resolves to a private address must be
//! blocked too.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use eventscout_core::EventscoutError;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Scheme,
    NoHost,
    PrivateIp,
    DnsFailure,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BlockReason::Scheme => "scheme",
            BlockReason::NoHost => "no_host",
            BlockReason::PrivateIp => "private_ip",
            BlockReason::DnsFailure => "dns_failure",
        };
        write!(f, "{s}")
    }
}

/// Validates a URL string is safe to fetch. On success returns the parsed
/// `Url`; the caller still owns issuing the actual request.
pub async fn guard(raw: &str) -> Result<Url, EventscoutError> {
    let url = Url::parse(raw).map_err(|e| EventscoutError::InvalidUrl(e.to_string()))?;
    guard_url(&url).await?;
    Ok(url)
}

pub async fn guard_url(url: &Url) -> Result<(), EventscoutError> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(blocked(BlockReason::Scheme, other));
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| blocked(BlockReason::NoHost, ""))?;

    // Literal IP host: classify directly, no DNS round trip needed.
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_unsafe_ip(&ip) {
            return Err(blocked(BlockReason::PrivateIp, host));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let lookup_target = format!("{host}:{port}");

    // tokio's resolver already runs on its own blocking pool internally,
    // so `lookup_host` is the async-native call here.
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&lookup_target)
        .await
        .map_err(|_| blocked(BlockReason::DnsFailure, host))?
        .collect();

    if addrs.is_empty() {
        return Err(blocked(BlockReason::DnsFailure, host));
    }

    for addr in &addrs {
        if is_unsafe_ip(&addr.ip()) {
            return Err(blocked(BlockReason::PrivateIp, host));
        }
    }

    Ok(())
}

fn blocked(reason: BlockReason, detail: &str) -> EventscoutError {
    if detail.is_empty() {
        EventscoutError::Blocked(format!("URL blocked: {reason}"))
    } else {
        EventscoutError::Blocked(format!("URL blocked: {reason} ({detail})"))
    }
}

fn is_unsafe_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_unsafe_v4(v4),
        IpAddr::V6(v6) => is_unsafe_v6(v6),
    }
}

fn is_unsafe_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
        // 100.64.0.0/10 carrier-grade NAT, also commonly used for internal metadata services
        || (ip.octets()[0] == 100 && (64..=127).contains(&ip.octets()[1]))
}

fn is_unsafe_v6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // IPv4-mapped addresses inherit the v4 rules.
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_unsafe_v4(&v4);
    }
    let seg = ip.segments();
    // fc00::/7 unique-local
    if (seg[0] & 0xfe00) == 0xfc00 {
        return true;
    }
    // fe80::/10 link-local
    if (seg[0] & 0xffc0) == 0xfe80 {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let err = guard("ftp://example.com/x").await.unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[tokio::test]
    async fn rejects_loopback_literal() {
        let err = guard("http://127.0.0.1/x").await.unwrap_err();
        assert!(err.to_string().contains("private_ip"));
    }

    #[tokio::test]
    async fn rejects_private_v4_literal() {
        for host in ["10.0.0.1", "172.16.0.5", "192.168.1.1", "169.254.1.1"] {
            let raw = format!("http://{host}/x");
            let err = guard(&raw).await.unwrap_err();
            assert!(err.to_string().contains("private_ip"), "{host}");
        }
    }

    #[tokio::test]
    async fn rejects_ipv6_loopback_and_unique_local() {
        for host in ["[::1]", "[fc00::1]", "[fe80::1]"] {
            let raw = format!("http://{host}/x");
            let err = guard(&raw).await.unwrap_err();
            assert!(err.to_string().contains("private_ip"), "{host}");
        }
    }

    #[test]
    fn classifies_v4_ranges() {
        assert!(is_unsafe_v4(&"10.1.2.3".parse().unwrap()));
        assert!(is_unsafe_v4(&"172.31.0.1".parse().unwrap()));
        assert!(!is_unsafe_v4(&"8.8.8.8".parse().unwrap()));
    }
}
