use std::net::IpAddr;

/// Key for a link: the host alone when no IP is pinned, otherwise the host
/// plus the IP's first two IPv4 octets (`ipv4-<host>-a-b`) or first four
/// IPv6 groups (`ipv6-<host>-g0-g1-g2-g3`).
pub fn link_type(ip: Option<IpAddr>, host: &str) -> String {
    match ip {
        None => host.to_string(),
        Some(IpAddr::V4(v4)) => {
            let o = v4.octets();
            format!("ipv4-{}-{}-{}", host, o[0], o[1])
        }
        Some(IpAddr::V6(v6)) => {
            let s = v6.segments();
            format!("ipv6-{}-{:x}-{:x}-{:x}-{:x}", host, s[0], s[1], s[2], s[3])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_only_without_ip() {
        assert_eq!(link_type(None, "up.example.com"), "up.example.com");
    }

    #[test]
    fn ipv4_uses_two_octets() {
        let ip = "10.20.30.40".parse().ok();
        assert_eq!(link_type(ip, "up.example.com"), "ipv4-up.example.com-10-20");
    }

    #[test]
    fn ipv6_uses_four_groups() {
        let ip = "2001:db8:85a3:1::8a2e:370:7334".parse().ok();
        assert_eq!(
            link_type(ip, "up.example.com"),
            "ipv6-up.example.com-2001-db8-85a3-1"
        );
    }
}
