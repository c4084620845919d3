//! IPv4 address literal validation.

use std::net::Ipv4Addr;

/// Parse a dotted-quad literal, rejecting leading zeros and out-of-range octets.
///
/// `"0"` is a valid octet, `"00"` and `"01"` are not.
pub fn parse_ipv4(text: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');

    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if part.len() > 1 && part.starts_with('0') {
            return None;
        }
        *octet = part.parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(Ipv4Addr::from(octets))
}

/// Whether the address sits in a range that can never be a device's
/// management address: loopback, link-local, multicast, or the reserved
/// 240.0.0.0/4 block (which includes the broadcast address).
pub fn is_restricted(addr: Ipv4Addr) -> bool {
    let first = addr.octets()[0];
    addr.is_loopback() || addr.is_link_local() || addr.is_multicast() || first >= 240
}

/// True iff `text` is a well-formed IPv4 literal outside the restricted ranges.
///
/// Never fails: malformed input is simply `false`.
pub fn validate_ip(text: &str) -> bool {
    parse_ipv4(text).is_some_and(|addr| !is_restricted(addr))
}
