//! Internationalized hostnames (IDN) and IRI character validation.
//!
//! Host labels are converted between their Unicode and ASCII-compatible
//! forms through UTS 46 (the `idna` crate). Non-host components are
//! validated character by character against the `ucschar` / `iprivate`
//! ranges of RFC 3987.

use crate::error::{err, UriError};
use std::borrow::Cow;

/// Bidi control characters never meaningful in a hostname.
const BIDI_CONTROLS: [char; 7] = [
    '\u{200e}', '\u{200f}', '\u{202a}', '\u{202b}', '\u{202c}', '\u{202d}', '\u{202e}',
];

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{200e}' | '\u{200f}' | '\u{202a}'..='\u{202e}')
}

/// Strips bidi formatting characters from a hostname.
pub(crate) fn strip_bidi(s: &str) -> Cow<'_, str> {
    if s.contains(is_bidi_control) {
        Cow::Owned(s.chars().filter(|&c| !is_bidi_control(c)).collect())
    } else {
        Cow::Borrowed(s)
    }
}

/// Converts a hostname to its ASCII-compatible (Punycode) form.
///
/// Bidi controls are stripped before conversion. The result is lowercase
/// ASCII or an error.
pub(crate) fn host_to_ascii(host: &str) -> Result<String, UriError> {
    let host = strip_bidi(host);
    match idna::domain_to_ascii(&host) {
        Ok(ascii) if !ascii.is_empty() => Ok(ascii),
        _ => err!(0, BadHostName),
    }
}

/// Computes the Unicode display form of an ASCII hostname.
///
/// Labels that fail conversion are kept in their ASCII form.
pub(crate) fn host_to_unicode(host: &str) -> String {
    let (unicode, _) = idna::domain_to_unicode(host);
    unicode
}

/// Returns `true` if ASCII conversion actually rewrote at least one label,
/// i.e., the host is a real internationalized domain name.
pub(crate) fn is_idn_host(original: &str, ascii: &str) -> bool {
    let original = strip_bidi(original);
    original
        .split('.')
        .zip(ascii.split('.'))
        .any(|(orig, conv)| !orig.eq_ignore_ascii_case(conv))
}

/// `ucschar` from RFC 3987: code points an IRI may carry unescaped
/// outside the query component.
pub(crate) fn is_ucschar(c: char) -> bool {
    if is_bidi_control(c) {
        return false;
    }
    matches!(c,
        '\u{a0}'..='\u{d7ff}'
        | '\u{f900}'..='\u{fdcf}'
        | '\u{fdf0}'..='\u{ffef}'
        | '\u{10000}'..='\u{1fffd}'
        | '\u{20000}'..='\u{2fffd}'
        | '\u{30000}'..='\u{3fffd}'
        | '\u{40000}'..='\u{4fffd}'
        | '\u{50000}'..='\u{5fffd}'
        | '\u{60000}'..='\u{6fffd}'
        | '\u{70000}'..='\u{7fffd}'
        | '\u{80000}'..='\u{8fffd}'
        | '\u{90000}'..='\u{9fffd}'
        | '\u{a0000}'..='\u{afffd}'
        | '\u{b0000}'..='\u{bfffd}'
        | '\u{c0000}'..='\u{cfffd}'
        | '\u{d0000}'..='\u{dfffd}'
        | '\u{e1000}'..='\u{efffd}'
    )
}

/// `iprivate` from RFC 3987: additionally allowed in the query component.
pub(crate) fn is_iprivate(c: char) -> bool {
    matches!(c,
        '\u{e000}'..='\u{f8ff}' | '\u{f0000}'..='\u{ffffd}' | '\u{100000}'..='\u{10fffd}'
    )
}

/// Returns `true` if `c` may stay unescaped in the given component of an
/// IRI. Characters outside these ranges remain percent-encoded even when
/// the rest of the component is left as readable Unicode.
pub(crate) fn iri_allows(c: char, in_query: bool) -> bool {
    is_ucschar(c) || (in_query && is_iprivate(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punycode_round_trip() {
        let ascii = host_to_ascii("пример.рф").unwrap();
        assert_eq!(ascii, "xn--e1afmkfd.xn--p1ai");
        assert_eq!(host_to_unicode(&ascii), "пример.рф");
    }

    #[test]
    fn ascii_host_is_not_idn() {
        let ascii = host_to_ascii("Example.COM").unwrap();
        assert_eq!(ascii, "example.com");
        assert!(!is_idn_host("Example.COM", &ascii));
        assert!(is_idn_host("пример.рф", "xn--e1afmkfd.xn--p1ai"));
    }

    #[test]
    fn bidi_stripped_from_hostnames() {
        let stripped = strip_bidi("exa\u{200e}mple.com");
        assert_eq!(stripped, "example.com");
        for c in BIDI_CONTROLS {
            assert!(!is_ucschar(c));
        }
    }

    #[test]
    fn ucschar_boundaries() {
        assert!(is_ucschar('\u{a0}'));
        assert!(is_ucschar('é'));
        assert!(!is_ucschar('\u{fffe}'));
        assert!(!is_ucschar('e'));
        assert!(is_iprivate('\u{e000}'));
        assert!(iri_allows('\u{e000}', true));
        assert!(!iri_allows('\u{e000}', false));
    }
}
