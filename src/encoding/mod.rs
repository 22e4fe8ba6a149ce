//! Percent-encoding utilities.

pub mod table;

use ref_cast::{ref_cast_custom, RefCastCustom};
use std::fmt;
use table::{Table, DENY_UNESCAPE, HEXDIG, UNRESERVED};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// How much of a percent-encoded string to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnescapeMode {
    /// Decode every valid escape sequence.
    Full,
    /// Keep delimiters, control characters and other octets reserved for
    /// their position percent-encoded, decoding only what is safe to show.
    Safe,
    /// Like [`Safe`](Self::Safe), plus the private-use code points that
    /// only a query component may carry decoded.
    SafeInQuery,
}

#[inline]
pub(crate) const fn hex_digit(x: u8) -> Option<u8> {
    match x {
        b'0'..=b'9' => Some(x - b'0'),
        b'A'..=b'F' => Some(x - b'A' + 10),
        b'a'..=b'f' => Some(x - b'a' + 10),
        _ => None,
    }
}

#[inline]
pub(crate) const fn decode_octet(hi: u8, lo: u8) -> u8 {
    match (hex_digit(hi), hex_digit(lo)) {
        (Some(h), Some(l)) => (h << 4) | l,
        _ => 0,
    }
}

/// Returns the valid `%XX` octet starting at `s[i]`, if any.
#[inline]
pub(crate) fn pct_octet(s: &[u8], i: usize) -> Option<u8> {
    match s.get(i + 1..i + 3) {
        Some(&[hi, lo]) if HEXDIG.allows(hi) && HEXDIG.allows(lo) => Some(decode_octet(hi, lo)),
        _ => None,
    }
}

pub(crate) fn encode_byte(x: u8, buf: &mut String) {
    buf.push('%');
    buf.push(HEX_DIGITS[(x >> 4) as usize] as char);
    buf.push(HEX_DIGITS[(x & 0xf) as usize] as char);
}

/// Facts gathered by a single left-to-right scan over a component.
///
/// They decide whether the component can be copied to the canonical form
/// verbatim or has to be rebuilt through [`escape_canonical`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CanonFacts {
    /// A character outside the component's table was found.
    pub needs_escape: bool,
    /// A `%` was found, valid triplet or not.
    pub saw_pct: bool,
    /// A malformed `%` sequence or lowercase hex digits were found,
    /// so existing escapes have to be rewritten.
    pub needs_rebuild: bool,
    /// A backslash was found that a slash-converting scheme rewrites.
    pub saw_backslash: bool,
}

impl CanonFacts {
    /// The component is byte-identical to its escaped canonical form.
    pub fn is_canonical(&self) -> bool {
        !self.needs_escape && !self.needs_rebuild && !self.saw_backslash
    }

    /// The component is canonical for display: no escapes to normalize
    /// and nothing to re-encode.
    pub fn is_display_canonical(&self) -> bool {
        self.is_canonical() && !self.saw_pct
    }
}

/// Scans a component against its table without producing output.
pub(crate) fn scan(s: &str, allowed: &Table) -> CanonFacts {
    let bytes = s.as_bytes();
    let mut facts = CanonFacts::default();
    let mut i = 0;
    while i < bytes.len() {
        let x = bytes[i];
        if x == b'%' {
            facts.saw_pct = true;
            match bytes.get(i + 1..i + 3) {
                Some(&[hi, lo]) if HEXDIG.allows(hi) && HEXDIG.allows(lo) => {
                    if hi.is_ascii_lowercase() || lo.is_ascii_lowercase() {
                        facts.needs_rebuild = true;
                    }
                    i += 3;
                    continue;
                }
                _ => facts.needs_rebuild = true,
            }
        } else if x == b'\\' {
            facts.saw_backslash = true;
        } else if !x.is_ascii() || !allowed.allows(x) {
            facts.needs_escape = true;
        }
        i += 1;
    }
    facts
}

/// Escapes `s` into `buf`, keeping bytes allowed by `keep` and valid
/// `%XX` triplets (with hex digits uppercased) as they are.
///
/// Escaping an already canonical component through this function is the
/// identity, which makes canonicalization idempotent.
pub(crate) fn escape_canonical(s: &str, keep: &Table, buf: &mut String) {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let x = bytes[i];
        if x == b'%' {
            if let Some(&[hi, lo]) = bytes.get(i + 1..i + 3) {
                if HEXDIG.allows(hi) && HEXDIG.allows(lo) {
                    buf.push('%');
                    buf.push(hi.to_ascii_uppercase() as char);
                    buf.push(lo.to_ascii_uppercase() as char);
                    i += 3;
                    continue;
                }
            }
            encode_byte(x, buf);
        } else if x.is_ascii() && keep.allows(x) {
            buf.push(x as char);
        } else {
            encode_byte(x, buf);
        }
        i += 1;
    }
}

/// Escapes `s` from scratch: every byte not allowed by `keep` is encoded,
/// including `%` itself.
pub(crate) fn escape_raw(s: &str, keep: &Table, buf: &mut String) {
    for &x in s.as_bytes() {
        if x.is_ascii() && keep.allows(x) {
            buf.push(x as char);
        } else {
            encode_byte(x, buf);
        }
    }
}

/// Decodes `%XX` triplets in `s` into `buf`.
///
/// Escaped octets that do not form valid UTF-8 are re-emitted as uppercase
/// `%XX` triplets, so no input is ever lost and no replacement character is
/// ever produced. In [`UnescapeMode::Safe`], octets reserved for their
/// position stay encoded.
pub(crate) fn unescape_in(s: &str, mode: UnescapeMode, buf: &mut String) {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut pending = Vec::new();

    while i < bytes.len() {
        let x = bytes[i];
        if x != b'%' {
            flush_pending(&mut pending, mode, buf);
            // Copy the whole code point; the input is valid UTF-8.
            let len = utf8_len(x);
            buf.push_str(&s[i..i + len]);
            i += len;
            continue;
        }
        match pct_octet(bytes, i) {
            Some(octet) => {
                if mode != UnescapeMode::Full && DENY_UNESCAPE.allows(octet) {
                    flush_pending(&mut pending, mode, buf);
                    buf.push('%');
                    buf.push(bytes[i + 1].to_ascii_uppercase() as char);
                    buf.push(bytes[i + 2].to_ascii_uppercase() as char);
                } else if octet.is_ascii() {
                    flush_pending(&mut pending, mode, buf);
                    buf.push(octet as char);
                } else {
                    pending.push(octet);
                }
                i += 3;
            }
            None => {
                // A lone "%"; kept verbatim so decoding is lossless.
                flush_pending(&mut pending, mode, buf);
                buf.push('%');
                i += 1;
            }
        }
    }
    flush_pending(&mut pending, mode, buf);
}

/// Decodes the accumulated high-bit octets as UTF-8, re-escaping every
/// byte of an invalid or partial sequence.
fn flush_pending(pending: &mut Vec<u8>, mode: UnescapeMode, buf: &mut String) {
    let mut rest: &[u8] = pending;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                push_decoded(s, mode, buf);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if !valid.is_empty() {
                    // Validated just above.
                    push_decoded(std::str::from_utf8(valid).unwrap_or_default(), mode, buf);
                }
                let bad_len = e.error_len().unwrap_or(after.len()).max(1);
                for &x in &after[..bad_len] {
                    encode_byte(x, buf);
                }
                rest = &after[bad_len..];
            }
        }
    }
    pending.clear();
}

/// In the safe modes, decoded Unicode stays decoded only where the IRI
/// grammar has a place for it; bidi controls and unassigned ranges go
/// back to escaped triplets.
fn push_decoded(s: &str, mode: UnescapeMode, buf: &mut String) {
    for c in s.chars() {
        let keep = match mode {
            UnescapeMode::Full => true,
            UnescapeMode::Safe => crate::idn::iri_allows(c, false),
            UnescapeMode::SafeInQuery => crate::idn::iri_allows(c, true),
        };
        if keep {
            buf.push(c);
        } else {
            let mut utf8 = [0u8; 4];
            for &x in c.encode_utf8(&mut utf8).as_bytes() {
                encode_byte(x, buf);
            }
        }
    }
}

#[inline]
pub(crate) const fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

/// Percent-encodes a single character, expanding it to its UTF-8 bytes.
///
/// # Examples
///
/// ```
/// assert_eq!(canon_uri::hex_escape(' '), "%20");
/// assert_eq!(canon_uri::hex_escape('é'), "%C3%A9");
/// ```
#[must_use]
pub fn hex_escape(c: char) -> String {
    let mut buf = String::new();
    for x in c.encode_utf8(&mut [0; 4]).bytes() {
        encode_byte(x, &mut buf);
    }
    buf
}

/// Decodes the character at `*index` in `s`, advancing `*index` past it.
///
/// A valid `%XX` sequence (or a run of them forming one UTF-8 character)
/// is decoded; any other character is returned unchanged. Escaped octets
/// that do not form valid UTF-8 yield `'%'` and consume one byte, so the
/// caller always makes progress.
///
/// # Panics
///
/// Panics if `*index` is out of bounds or not on a character boundary.
pub fn hex_unescape(s: &str, index: &mut usize) -> char {
    let bytes = s.as_bytes();
    let i = *index;
    if bytes[i] != b'%' {
        let c = s[i..].chars().next().expect("index on char boundary");
        *index += c.len_utf8();
        return c;
    }
    let Some(first) = pct_octet(bytes, i) else {
        *index += 1;
        return '%';
    };
    if first.is_ascii() {
        *index += 3;
        return first as char;
    }
    let len = utf8_len(first);
    let mut seq = [0u8; 4];
    seq[0] = first;
    for (k, slot) in seq[1..len].iter_mut().enumerate() {
        match pct_octet(bytes, i + 3 * (k + 1)) {
            Some(octet) => *slot = octet,
            None => {
                *index += 1;
                return '%';
            }
        }
    }
    match std::str::from_utf8(&seq[..len]) {
        Ok(decoded) => {
            *index += 3 * len;
            decoded.chars().next().unwrap_or('%')
        }
        Err(_) => {
            *index += 1;
            '%'
        }
    }
}

/// A percent-encoded string slice.
///
/// The bytes of an `EStr` are guaranteed to be valid UTF-8 in which every
/// `%` begins a well-formed `%XX` triplet.
#[derive(RefCastCustom)]
#[repr(transparent)]
pub struct EStr {
    inner: str,
}

impl EStr {
    /// An empty `EStr`.
    pub const EMPTY: &'static EStr = EStr::new_validated("");

    #[ref_cast_custom]
    pub(crate) const fn new_validated(s: &str) -> &EStr;

    /// Yields the underlying string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Returns `true` if the slice is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Decodes the slice for display, keeping reserved octets encoded.
    #[must_use]
    pub fn decode(&self) -> String {
        let mut buf = String::with_capacity(self.inner.len());
        unescape_in(&self.inner, UnescapeMode::Safe, &mut buf);
        buf
    }

    /// Fully decodes the slice, including reserved octets.
    #[must_use]
    pub fn decode_data(&self) -> String {
        let mut buf = String::with_capacity(self.inner.len());
        unescape_in(&self.inner, UnescapeMode::Full, &mut buf);
        buf
    }
}

impl AsRef<str> for EStr {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl PartialEq for EStr {
    #[inline]
    fn eq(&self, other: &EStr) -> bool {
        self.inner == other.inner
    }
}

impl PartialEq<str> for EStr {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        &self.inner == other
    }
}

impl PartialEq<&str> for EStr {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &self.inner == *other
    }
}

impl Eq for EStr {}

impl fmt::Debug for EStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for EStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl Default for &EStr {
    fn default() -> Self {
        EStr::EMPTY
    }
}

/// Escapes a full URI string, keeping reserved delimiters intact.
///
/// Every character that may not appear literally in a URI is replaced by
/// its percent-encoded UTF-8 bytes. `%` itself is escaped, so the result
/// of escaping an unescaped string never aliases an escape sequence.
///
/// # Examples
///
/// ```
/// assert_eq!(
///     canon_uri::escape_uri_string("http://e.com/a b?q=1"),
///     "http://e.com/a%20b?q=1",
/// );
/// ```
#[must_use]
pub fn escape_uri_string(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    escape_raw(s, table::URI_TEXT, &mut buf);
    buf
}

/// Escapes a string for use as a URI component, keeping only unreserved
/// characters intact.
///
/// # Examples
///
/// ```
/// assert_eq!(canon_uri::escape_data_string("a/b c"), "a%2Fb%20c");
/// ```
#[must_use]
pub fn escape_data_string(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    escape_raw(s, UNRESERVED, &mut buf);
    buf
}

/// Fully decodes every `%XX` sequence in a string.
///
/// Escaped octets that do not form valid UTF-8 are left percent-encoded
/// rather than replaced, so the operation never loses information.
///
/// # Examples
///
/// ```
/// assert_eq!(canon_uri::unescape_data_string("a%2Fb%20c"), "a/b c");
/// ```
#[must_use]
pub fn unescape_data_string(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    unescape_in(s, UnescapeMode::Full, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_then_unescape_is_identity_on_safe_subset() {
        let x = "hello world-._~中文";
        assert_eq!(unescape_data_string(&escape_data_string(x)), x);
    }

    #[test]
    fn escape_is_idempotent_on_canonical_input() {
        let canonical = "a%20b%C3%A9c";
        let mut buf = String::new();
        escape_canonical(canonical, table::PATH, &mut buf);
        assert_eq!(buf, canonical);
    }

    #[test]
    fn invalid_utf8_reescaped_not_lost() {
        // "%C3" alone is a truncated UTF-8 sequence.
        assert_eq!(unescape_data_string("a%C3b"), "a%C3b");
        // Bad continuation byte.
        assert_eq!(unescape_data_string("%C3%28"), "%C3(");
    }

    #[test]
    fn safe_mode_keeps_delimiters_encoded() {
        let mut buf = String::new();
        unescape_in("a%2Fb%20c", UnescapeMode::Safe, &mut buf);
        assert_eq!(buf, "a%2Fb c");
    }

    #[test]
    fn private_use_only_decodes_in_queries() {
        // U+E000 is a private-use code point.
        let mut buf = String::new();
        unescape_in("%EE%80%80", UnescapeMode::Safe, &mut buf);
        assert_eq!(buf, "%EE%80%80");
        buf.clear();
        unescape_in("%EE%80%80", UnescapeMode::SafeInQuery, &mut buf);
        assert_eq!(buf, "\u{e000}");
    }

    #[test]
    fn hex_escape_unescape_round_trip() {
        assert_eq!(hex_escape('A'), "%41");
        let s = "%E6%B5%8B";
        let mut i = 0;
        assert_eq!(hex_unescape(s, &mut i), '测');
        assert_eq!(i, s.len());
    }

    #[test]
    fn hex_unescape_passes_plain_chars() {
        let mut i = 0;
        assert_eq!(hex_unescape("ab", &mut i), 'a');
        assert_eq!(i, 1);
    }

    #[test]
    fn scanner_flags() {
        let facts = scan("a%2fb", table::PATH);
        assert!(facts.saw_pct && facts.needs_rebuild);
        let facts = scan("a b", table::PATH);
        assert!(facts.needs_escape);
        let facts = scan("a/b", table::PATH);
        assert!(facts.is_display_canonical());
    }
}
