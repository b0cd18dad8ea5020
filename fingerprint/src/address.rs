use std::net::Ipv6Addr;

const IPV4_KEEP_OCTETS: usize = 3;
const IPV6_KEEP_GROUPS: usize = 3;

/// Drops the host portion of a client address.
///
/// IPv4 keeps the first three octets (`203.0.113.42` -> `203.0.113`). IPv6
/// keeps the first three groups, i.e. the /48 network
/// (`2001:db8:85a3::8a2e:370:7334` -> `2001:db8:85a3`). IPv4-mapped IPv6
/// (`::ffff:203.0.113.42`) is treated as the IPv4 address it carries.
/// Anything else is split on `.` best-effort, so malformed input still maps to
/// a stable value.
pub fn coarsen(address: &str) -> String {
    if let Ok(v6) = address.parse::<Ipv6Addr>() {
        if let Some(v4) = v6.to_ipv4_mapped() {
            return coarsen(&v4.to_string());
        }
        return v6.segments()[..IPV6_KEEP_GROUPS]
            .iter()
            .map(|group| format!("{group:x}"))
            .collect::<Vec<_>>()
            .join(":");
    }

    address
        .split('.')
        .take(IPV4_KEEP_OCTETS)
        .collect::<Vec<_>>()
        .join(".")
}
