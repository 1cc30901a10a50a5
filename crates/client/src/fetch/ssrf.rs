//! Guard for pass-through requests that leave the configured origin.
//!
//! A cross-origin target is forwarded only when its scheme is http(s) and
//! every address it resolves to is public.

use std::net::IpAddr;

use ipnet::IpNet;
use url::{Host, Url};
use waypost_core::Error;

/// Reserved ranges the standard library does not classify.
const RESERVED_RANGES: &[&str] = &[
    "100.64.0.0/10",
    "192.0.0.0/24",
    "198.18.0.0/15",
    "240.0.0.0/4",
    "fc00::/7",
    "fe80::/10",
];

/// Error type for SSRF validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked scheme: {0}")]
    BlockedScheme(String),

    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("no host in {0}")]
    MissingHost(String),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),
}

impl From<SsrfError> for Error {
    fn from(err: SsrfError) -> Self {
        match err {
            SsrfError::DnsError(msg) => Error::NetworkUnavailable(format!("DNS resolution failed: {msg}")),
            blocked => Error::TargetBlocked(blocked.to_string()),
        }
    }
}

/// Check if an IP address is private, reserved, or otherwise blocked.
///
/// This covers:
/// - Loopback addresses (127.0.0.0/8, ::1)
/// - RFC 1918 private ranges (10/8, 172.16/12, 192.168/16)
/// - Link-local addresses (169.254/16, fe80::/10)
/// - Multicast, broadcast and unspecified addresses
/// - Shared (100.64/10), benchmarking (198.18/15) and future-use (240/4) space
/// - IPv6 unique local (fc00::/7)
/// - IPv4-mapped IPv6 addresses of any of the above
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        v4 => v4,
    };

    let builtin = match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_multicast() || v6.is_unspecified(),
    };

    builtin
        || RESERVED_RANGES
            .iter()
            .filter_map(|range| range.parse::<IpNet>().ok())
            .any(|net| net.contains(&ip))
}

/// Validate that an IP address is not private or reserved.
pub fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// Validate a cross-origin target before it is fetched.
///
/// Domain names are resolved and every returned address must be public.
pub async fn validate_target(url: &Url) -> Result<(), SsrfError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(SsrfError::BlockedScheme(scheme.to_string())),
    }

    match url.host() {
        Some(Host::Ipv4(v4)) => validate_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => validate_ip(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => {
            let port = url.port_or_known_default().unwrap_or(80);
            let addrs = tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| SsrfError::DnsError(format!("{domain}: {e}")))?;

            let mut resolved = 0;
            for addr in addrs {
                validate_ip(addr.ip())?;
                resolved += 1;
            }
            if resolved == 0 {
                return Err(SsrfError::DnsError(format!("{domain} resolved to no addresses")));
            }
            Ok(())
        }
        None => Err(SsrfError::MissingHost(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_is_private_or_reserved_v4() {
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
    }

    #[test]
    fn test_is_private_or_reserved_extra_ranges() {
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(100, 64, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(198, 19, 255, 255))));
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(250, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 1))));
        assert!(is_private_or_reserved(IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1))));
    }

    #[test]
    fn test_is_private_or_reserved_v4_mapped_v6() {
        let mapped = Ipv4Addr::new(127, 0, 0, 1).to_ipv6_mapped();
        assert!(is_private_or_reserved(IpAddr::V6(mapped)));
    }

    #[test]
    fn test_is_private_or_reserved_public() {
        assert!(!is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))));
        assert!(!is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))));
        assert!(!is_private_or_reserved(IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 1))));
    }

    #[tokio::test]
    async fn test_validate_target_ip_literals() {
        let public = Url::parse("http://93.184.216.34/static/lib.js").unwrap();
        assert!(validate_target(&public).await.is_ok());

        let loopback = Url::parse("http://127.0.0.1:6379/").unwrap();
        assert!(matches!(validate_target(&loopback).await, Err(SsrfError::BlockedIp(_))));

        let metadata = Url::parse("http://169.254.169.254/latest/meta-data/").unwrap();
        assert!(matches!(validate_target(&metadata).await, Err(SsrfError::BlockedIp(_))));

        let v6 = Url::parse("http://[::1]:8080/").unwrap();
        assert!(matches!(validate_target(&v6).await, Err(SsrfError::BlockedIp(_))));
    }

    #[tokio::test]
    async fn test_validate_target_localhost_name() {
        let url = Url::parse("http://localhost:8000/admin").unwrap();
        assert!(matches!(validate_target(&url).await, Err(SsrfError::BlockedIp(_))));
    }

    #[tokio::test]
    async fn test_validate_target_scheme() {
        let url = Url::parse("ftp://93.184.216.34/file").unwrap();
        assert!(matches!(validate_target(&url).await, Err(SsrfError::BlockedScheme(_))));
    }

    #[test]
    fn test_error_conversion() {
        let blocked: Error = SsrfError::BlockedIp(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))).into();
        assert!(matches!(blocked, Error::TargetBlocked(_)));

        let dns: Error = SsrfError::DnsError("nxdomain".into()).into();
        assert!(dns.is_network_failure());
    }
}
