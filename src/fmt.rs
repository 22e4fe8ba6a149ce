//! `Display` and `Debug` implementations.

use crate::error::{UriError, UriErrorKind};
use crate::uri::{Components, Uri, UriFormat};
use std::fmt;

impl fmt::Display for Uri {
    /// Formats the URI the way a person would read it: safe-unescaped,
    /// with internationalized hosts shown in Unicode. Relative references
    /// print verbatim.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(plain) = self.display_fast_path() {
            return f.write_str(plain);
        }
        match self.components(Components::ABSOLUTE_URI, UriFormat::SafeUnescaped) {
            Some(s) => f.write_str(&s),
            None => f.write_str(self.original_str()),
        }
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uri")
            .field("scheme", &self.scheme())
            .field("host", &self.host())
            .field("port", &self.explicit_port())
            .field("original", &self.original_str())
            .finish()
    }
}

impl fmt::Display for UriErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UriErrorKind::EmptyInput => "empty input",
            UriErrorKind::BadFormat => "invalid URI format",
            UriErrorKind::BadScheme => "invalid scheme name",
            UriErrorKind::SchemeLimit => "scheme name too long",
            UriErrorKind::SizeLimit => "input too long",
            UriErrorKind::BadAuthority => "invalid authority",
            UriErrorKind::BadAuthorityTerminator => "unexpected character after authority",
            UriErrorKind::BadHostName => "invalid hostname",
            UriErrorKind::BadPort => "invalid port",
            UriErrorKind::MustRootedPath => "drive reference requires a rooted path",
            UriErrorKind::CannotCreateRelative => "expected a relative reference",
            UriErrorKind::NonEmptyHost => "scheme does not allow a host",
        })
    }
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at index {}", self.kind, self.index)
    }
}

impl fmt::Debug for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UriError")
            .field("index", &self.index)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Uri;

    #[test]
    fn display_is_human_readable() {
        let u = Uri::parse("http://h/a%20b?q#f").unwrap();
        assert_eq!(u.to_string(), "http://h/a b?q#f");
        let u = Uri::parse("http://пример.рф/p").unwrap();
        assert_eq!(u.to_string(), "http://пример.рф/p");
    }

    #[test]
    fn error_display_names_position() {
        let e = Uri::parse("http://example.com:bad/").unwrap_err();
        assert_eq!(e.to_string(), "invalid port at index 19");
    }
}
