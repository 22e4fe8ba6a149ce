//! Error types returned by the parsing and resolution entry points.

/// Detailed cause of a [`UriError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum UriErrorKind {
    /// The input string is empty where an absolute URI was required.
    EmptyInput,
    /// The input does not match the URI syntax at all, e.g., it contains
    /// a control character or lacks a scheme where one is required.
    BadFormat,
    /// The scheme name does not match the scheme grammar
    /// (a letter followed by letters, digits, `+`, `-` or `.`).
    BadScheme,
    /// The scheme name is longer than 1024 characters.
    SchemeLimit,
    /// The input is too long to be indexed with 16-bit offsets.
    SizeLimit,
    /// The authority component is malformed, e.g., userinfo appears in a
    /// scheme that forbids it.
    BadAuthority,
    /// The authority is terminated by an unexpected character.
    BadAuthorityTerminator,
    /// The host does not match any of the recognized host grammars.
    BadHostName,
    /// The port is not a decimal number in the range 0..=65535.
    BadPort,
    /// A DOS drive reference was given without a rooted path.
    MustRootedPath,
    /// An absolute URI was parsed where a relative reference was required.
    CannotCreateRelative,
    /// A host was present where the scheme requires the host to be empty.
    NonEmptyHost,
}

/// An error occurred when parsing or resolving a URI reference.
///
/// The error records the byte index in the input at which parsing failed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UriError {
    pub(crate) index: u16,
    pub(crate) kind: UriErrorKind,
}

impl UriError {
    /// Returns the index in the input string at which the error occurred.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Returns the detailed cause of the error.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> UriErrorKind {
        self.kind
    }
}

impl std::error::Error for UriError {}

/// Returns immediately with an error.
macro_rules! err {
    ($index:expr, $kind:ident) => {
        return Err(crate::error::UriError {
            index: $index as u16,
            kind: crate::error::UriErrorKind::$kind,
        })
    };
}

pub(crate) use err;
