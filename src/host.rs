//! Host classifiers: IPv6 literals, dotted-quad IPv4, DNS names, UNC
//! computer names and opaque hosts.
//!
//! Classifiers are tried in a fixed priority order; the first match wins
//! and yields the canonical label plus a loopback flag.

use crate::error::{err, UriError};
use crate::idn;
use crate::scheme::{SchemeDescriptor, SchemeFlags};
use std::fmt;

/// The kind of host a URI carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum HostType {
    /// No host is present.
    #[default]
    None,
    /// An opaque host for schemes without host structure.
    Basic,
    /// A DNS registered name.
    Dns,
    /// A dotted-quad IPv4 address.
    IPv4,
    /// A bracketed IPv6 literal address.
    IPv6,
    /// A UNC computer name.
    Unc,
    /// Present but unclassifiable; only reachable for registry-based schemes.
    Unknown,
}

/// The longest UNC computer name accepted.
const MAX_UNC_LEN: usize = 256;

/// The longest DNS label accepted.
const MAX_DNS_LABEL: usize = 63;

/// Classifier output: the canonical label and everything the flag word
/// needs to know about it.
#[derive(Clone, Debug)]
pub(crate) struct ClassifiedHost {
    pub kind: HostType,
    /// Canonical ASCII label; bracketed and compressed for IPv6,
    /// lowercase Punycode for IDN hosts.
    pub canonical: String,
    /// Unicode display form, present only when it differs from `canonical`.
    pub unicode: Option<String>,
    pub loopback: bool,
    pub is_idn: bool,
}

impl ClassifiedHost {
    fn plain(kind: HostType, canonical: String, loopback: bool) -> Self {
        Self {
            kind,
            canonical,
            unicode: None,
            loopback,
            is_idn: false,
        }
    }
}

/// Classifies the host substring of an authority.
///
/// `at` is the offset of the host in the full input, used for error indexes.
pub(crate) fn classify(
    raw: &str,
    desc: &SchemeDescriptor,
    at: usize,
) -> Result<ClassifiedHost, UriError> {
    if raw.is_empty() {
        if desc.has(SchemeFlags::ALLOW_EMPTY_HOST) {
            // An empty host means the local machine, whatever the scheme.
            return Ok(ClassifiedHost::plain(HostType::Basic, String::new(), true));
        }
        err!(at, BadHostName);
    }

    if raw.starts_with('[') {
        if !desc.has(SchemeFlags::ALLOW_IPV6) {
            err!(at, BadHostName);
        }
        let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
            err!(at, BadHostName);
        };
        let Some((segs, zone)) = parse_ipv6(inner) else {
            err!(at, BadHostName);
        };
        let mut canonical = String::with_capacity(raw.len());
        canonical.push('[');
        write_ipv6(&segs, &mut canonical);
        if let Some(zone) = zone {
            canonical.push('%');
            canonical.push_str(zone);
        }
        canonical.push(']');
        let loopback = segs == [0, 0, 0, 0, 0, 0, 0, 1] || segs == [0; 8];
        return Ok(ClassifiedHost::plain(HostType::IPv6, canonical, loopback));
    }

    if desc.has(SchemeFlags::ALLOW_IPV4) {
        if let Some(octets) = parse_ipv4(raw) {
            let loopback = octets[0] == 127 || octets == [0, 0, 0, 0];
            return Ok(ClassifiedHost::plain(
                HostType::IPv4,
                raw.to_owned(),
                loopback,
            ));
        }
    }

    if desc.has(SchemeFlags::ALLOW_DNS) {
        if let Some(host) = classify_dns(raw, desc, at)? {
            return Ok(host);
        }
    }

    if desc.has(SchemeFlags::ALLOW_UNC) && is_unc_name(raw) {
        return Ok(ClassifiedHost::plain(
            HostType::Unc,
            raw.to_ascii_lowercase(),
            false,
        ));
    }

    if desc.has(SchemeFlags::ALLOW_ANY_OTHER_HOST) {
        return Ok(ClassifiedHost::plain(
            HostType::Basic,
            raw.to_owned(),
            false,
        ));
    }

    if !desc.has(SchemeFlags::SIMPLE) {
        // Registry-based schemes may carry hosts we cannot make sense of.
        return Ok(ClassifiedHost::plain(
            HostType::Unknown,
            raw.to_owned(),
            false,
        ));
    }
    err!(at, BadHostName)
}

/// DNS name classification, with the IRI-aware variant for descriptors
/// that allow Unicode labels.
fn classify_dns(
    raw: &str,
    desc: &SchemeDescriptor,
    at: usize,
) -> Result<Option<ClassifiedHost>, UriError> {
    if raw.is_ascii() {
        if !is_dns_name(raw) {
            return Ok(None);
        }
        let canonical = raw.to_ascii_lowercase();
        let loopback = canonical == "localhost" || canonical == "loopback";
        // Punycode given directly is still an internationalized name and
        // gets the same Unicode display form as its non-ASCII spelling.
        if desc.has(SchemeFlags::ALLOW_IDN)
            && canonical.split('.').any(|label| label.starts_with("xn--"))
        {
            let unicode = idn::host_to_unicode(&canonical);
            if unicode != canonical {
                return Ok(Some(ClassifiedHost {
                    kind: HostType::Dns,
                    canonical,
                    unicode: Some(unicode),
                    loopback,
                    is_idn: true,
                }));
            }
        }
        return Ok(Some(ClassifiedHost::plain(
            HostType::Dns,
            canonical,
            loopback,
        )));
    }

    if !desc.has(SchemeFlags::ALLOW_IRI) || !is_iri_dns_name(raw) {
        return Ok(None);
    }
    if !desc.has(SchemeFlags::ALLOW_IDN) {
        err!(at, BadHostName);
    }
    let ascii = idn::host_to_ascii(raw).map_err(|mut e| {
        e.index = at as u16;
        e
    })?;
    if !is_dns_name(&ascii) {
        err!(at, BadHostName);
    }
    let is_idn = idn::is_idn_host(raw, &ascii);
    let unicode = idn::host_to_unicode(&ascii);
    let loopback = ascii == "localhost" || ascii == "loopback";
    Ok(Some(ClassifiedHost {
        kind: HostType::Dns,
        canonical: ascii,
        unicode: (is_idn).then_some(unicode),
        loopback,
        is_idn,
    }))
}

fn is_dns_label_byte(x: u8) -> bool {
    x.is_ascii_alphanumeric() || x == b'-' || x == b'_'
}

/// ASCII DNS name: dot-separated labels of letters, digits, hyphens and
/// underscores, each at most 63 octets. A single trailing dot is allowed.
fn is_dns_name(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= MAX_DNS_LABEL
                && label.bytes().all(is_dns_label_byte)
        })
}

/// The IRI-aware DNS grammar: ASCII label bytes plus `ucschar`.
fn is_iri_dns_name(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.split('.').all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii() && is_dns_label_byte(c as u8) || idn::is_ucschar(c))
        })
}

fn is_unc_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_UNC_LEN
        && s.bytes()
            .all(|x| x.is_ascii_alphanumeric() || matches!(x, b'-' | b'_' | b'.'))
}

/// Strict dotted-quad IPv4: exactly four octets, each 0-255 in decimal
/// with no leading zeros.
pub(crate) fn parse_ipv4(s: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for slot in &mut octets {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|x| x.is_ascii_digit()) {
            return None;
        }
        if part.len() > 1 && part.starts_with('0') {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    parts.next().is_none().then_some(octets)
}

/// Parses the address part of an IPv6 literal into its eight groups.
///
/// An address is a colon-separated group list, optionally cut in two by a
/// single `::` standing for a run of zero groups, with an optional
/// dotted-quad in place of the final two groups.
fn parse_v6_addr(addr: &str) -> Option<[u16; 8]> {
    let mut segs = [0u16; 8];
    match addr.find("::") {
        None => {
            let n = fill_v6_groups(addr, &mut segs)?;
            (n == 8).then_some(segs)
        }
        Some(i) => {
            let head_n = fill_v6_groups(&addr[..i], &mut segs)?;
            let mut tail = [0u16; 8];
            let tail_n = fill_v6_groups(&addr[i + 2..], &mut tail)?;
            // The `::` must stand for at least one group.
            if head_n + tail_n >= 8 {
                return None;
            }
            segs[8 - tail_n..].copy_from_slice(&tail[..tail_n]);
            Some(segs)
        }
    }
}

/// Decodes a colon-separated run of hex groups into the front of `segs`,
/// accepting a dotted-quad as the last entry. Returns the group count.
///
/// An empty input is zero groups; an empty group anywhere (which is how a
/// second `::` shows up here) is an error.
fn fill_v6_groups(s: &str, segs: &mut [u16; 8]) -> Option<usize> {
    if s.is_empty() {
        return Some(0);
    }
    let mut n = 0;
    let mut groups = s.split(':').peekable();
    while let Some(group) = groups.next() {
        if group.is_empty() || n == 8 {
            return None;
        }
        if groups.peek().is_none() && group.contains('.') {
            if n > 6 {
                return None;
            }
            let octets = parse_ipv4(group)?;
            segs[n] = u16::from_be_bytes([octets[0], octets[1]]);
            segs[n + 1] = u16::from_be_bytes([octets[2], octets[3]]);
            n += 2;
        } else {
            if group.len() > 4 {
                return None;
            }
            let mut x: u16 = 0;
            for b in group.bytes() {
                x = (x << 4) | u16::from(crate::encoding::hex_digit(b)?);
            }
            segs[n] = x;
            n += 1;
        }
    }
    Some(n)
}

/// Parses the inside of a bracketed IPv6 literal, with an optional
/// `%zone` suffix (the RFC 6874 `%25` prefix form is also accepted).
pub(crate) fn parse_ipv6(inner: &str) -> Option<([u16; 8], Option<&str>)> {
    let (addr, zone) = match inner.find('%') {
        Some(i) => {
            let raw_zone = &inner[i + 1..];
            let zone = raw_zone.strip_prefix("25").unwrap_or(raw_zone);
            if zone.is_empty() || !zone.bytes().all(|x| x.is_ascii_alphanumeric() || x == b'_') {
                return None;
            }
            (&inner[..i], Some(zone))
        }
        None => (inner, None),
    };
    let segs = parse_v6_addr(addr)?;
    Some((segs, zone))
}

/// Writes the RFC 5952 canonical text of an IPv6 address: lowercase hex,
/// longest zero run (of length at least two) compressed, leftmost run
/// preferred on a tie.
pub(crate) fn write_ipv6(segs: &[u16; 8], buf: &mut String) {
    use fmt::Write;

    let mut best = (0, 0); // (start, len)
    let mut cur = (0, 0);
    for (i, &seg) in segs.iter().enumerate() {
        if seg == 0 {
            if cur.1 == 0 {
                cur.0 = i;
            }
            cur.1 += 1;
            if cur.1 > best.1 {
                best = cur;
            }
        } else {
            cur.1 = 0;
        }
    }

    let mut i = 0;
    while i < 8 {
        if best.1 >= 2 && i == best.0 {
            buf.push_str("::");
            i += best.1;
            continue;
        }
        if i != 0 && !buf.ends_with(':') {
            buf.push(':');
        }
        let _ = write!(buf, "{:x}", segs[i]);
        i += 1;
    }
}

/// Classifies a bare host string, the way the parser would inside an
/// authority.
///
/// Accepts IPv6 literals with or without brackets. Returns
/// [`HostType::Unknown`] when nothing matches.
///
/// # Examples
///
/// ```
/// use canon_uri::{check_host_name, HostType};
///
/// assert_eq!(check_host_name("1.2.3.4"), HostType::IPv4);
/// assert_eq!(check_host_name("1.2.3.4.5"), HostType::Dns);
/// assert_eq!(check_host_name("[::1]"), HostType::IPv6);
/// assert_eq!(check_host_name("host name"), HostType::Unknown);
/// ```
#[must_use]
pub fn check_host_name(s: &str) -> HostType {
    if s.is_empty() {
        return HostType::Unknown;
    }
    if s.starts_with('[') {
        return match s
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .and_then(parse_ipv6)
        {
            Some(_) => HostType::IPv6,
            None => HostType::Unknown,
        };
    }
    if s.contains(':') {
        return match parse_ipv6(s) {
            Some(_) => HostType::IPv6,
            None => HostType::Unknown,
        };
    }
    if parse_ipv4(s).is_some() {
        return HostType::IPv4;
    }
    if s.is_ascii() && is_dns_name(s) {
        return HostType::Dns;
    }
    if is_unc_name(s) {
        return HostType::Unc;
    }
    HostType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v6(s: &str) -> String {
        let (segs, _) = parse_ipv6(s).unwrap();
        let mut buf = String::new();
        write_ipv6(&segs, &mut buf);
        buf
    }

    #[test]
    fn ipv4_strictness() {
        assert_eq!(parse_ipv4("1.2.3.4"), Some([1, 2, 3, 4]));
        assert_eq!(parse_ipv4("255.255.255.255"), Some([255; 4]));
        assert!(parse_ipv4("256.1.1.1").is_none());
        assert!(parse_ipv4("01.2.3.4").is_none());
        assert!(parse_ipv4("1.2.3").is_none());
        assert!(parse_ipv4("1.2.3.4.5").is_none());
        assert!(parse_ipv4("0x1.2.3.4").is_none());
    }

    #[test]
    fn ipv6_canonical_form() {
        assert_eq!(v6("::1"), "::1");
        assert_eq!(v6("0:0:0:0:0:0:0:0"), "::");
        assert_eq!(v6("2001:DB8:0:0:1:0:0:1"), "2001:db8::1:0:0:1");
        assert_eq!(v6("::ffff:192.0.2.1"), "::ffff:c000:201");
        assert!(parse_ipv6(":::1").is_none());
        assert!(parse_ipv6("1:2:3").is_none());
        assert!(parse_ipv6("1:2:3:4:5:6:7:8:9").is_none());
    }

    #[test]
    fn ipv6_zone_id() {
        let (_, zone) = parse_ipv6("fe80::1%eth0").unwrap();
        assert_eq!(zone, Some("eth0"));
        let (_, zone) = parse_ipv6("fe80::1%25eth0").unwrap();
        assert_eq!(zone, Some("eth0"));
        assert!(parse_ipv6("fe80::1%").is_none());
    }

    #[test]
    fn host_name_kinds() {
        assert_eq!(check_host_name("example.com"), HostType::Dns);
        assert_eq!(check_host_name("example.com."), HostType::Dns);
        assert_eq!(check_host_name("under_score.host"), HostType::Dns);
        assert_eq!(check_host_name("::1"), HostType::IPv6);
        assert_eq!(check_host_name("[::1"), HostType::Unknown);
        assert_eq!(check_host_name(""), HostType::Unknown);
        let long_label = "a".repeat(64);
        assert_eq!(check_host_name(&long_label), HostType::Unc);
    }
}
