//! Scheme descriptors and the scheme registry.

use crate::error::{err, UriError};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::{Arc, OnceLock, RwLock};

/// The longest scheme name accepted by [`SchemeRegistry`].
pub const MAX_SCHEME_LEN: usize = 1024;

/// Capability set of a scheme.
///
/// Each flag answers one question the parser or canonicalizer asks about
/// a scheme, so a descriptor is nothing but a name, a default port and
/// one of these sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SchemeFlags(u32);

impl SchemeFlags {
    pub const NONE: Self = Self(0);
    pub const REQUIRES_AUTHORITY: Self = Self(1);
    pub const AUTHORITY_OPTIONAL: Self = Self(1 << 1);
    pub const ALLOW_USER_INFO: Self = Self(1 << 2);
    pub const ALLOW_PORT: Self = Self(1 << 3);
    pub const ALLOW_QUERY: Self = Self(1 << 4);
    pub const ALLOW_FRAGMENT: Self = Self(1 << 5);
    pub const FILE_LIKE: Self = Self(1 << 6);
    pub const PATH_IS_ROOTED: Self = Self(1 << 7);
    pub const CONVERT_BACKSLASHES: Self = Self(1 << 8);
    pub const COMPRESS_PATH: Self = Self(1 << 9);
    pub const UNESCAPE_PATH_DOTS_AND_SLASHES: Self = Self(1 << 10);
    pub const ALLOW_IPV6: Self = Self(1 << 11);
    pub const ALLOW_IPV4: Self = Self(1 << 12);
    pub const ALLOW_DNS: Self = Self(1 << 13);
    pub const ALLOW_UNC: Self = Self(1 << 14);
    pub const ALLOW_ANY_OTHER_HOST: Self = Self(1 << 15);
    pub const ALLOW_IDN: Self = Self(1 << 16);
    pub const ALLOW_IRI: Self = Self(1 << 17);
    pub const ALLOW_EMPTY_HOST: Self = Self(1 << 18);
    /// Built-in fast path; not synthesized from the generic grammar.
    pub const SIMPLE: Self = Self(1 << 19);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SchemeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// What a scheme allows and how its URIs canonicalize.
///
/// Descriptors are immutable and shared; the parser holds one per parsed
/// URI. Well-known schemes get a fixed descriptor, anything else gets a
/// generic one synthesized on first sight.
pub struct SchemeDescriptor {
    name: Cow<'static, str>,
    default_port: Option<u16>,
    flags: SchemeFlags,
}

impl SchemeDescriptor {
    const fn well_known(
        name: &'static str,
        default_port: Option<u16>,
        flags: SchemeFlags,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            default_port,
            flags: flags.union(SchemeFlags::SIMPLE),
        }
    }

    /// Returns the scheme name in lowercase.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scheme's default port, if it has one.
    #[inline]
    #[must_use]
    pub fn default_port(&self) -> Option<u16> {
        self.default_port
    }

    /// Returns `true` for `file` and other filesystem-dialect schemes.
    #[inline]
    #[must_use]
    pub fn is_file_like(&self) -> bool {
        self.has(SchemeFlags::FILE_LIKE)
    }

    #[inline]
    pub(crate) fn has(&self, flags: SchemeFlags) -> bool {
        self.flags.contains(flags)
    }
}

impl fmt::Debug for SchemeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeDescriptor")
            .field("name", &self.name)
            .field("default_port", &self.default_port)
            .finish_non_exhaustive()
    }
}

const WEB: SchemeFlags = SchemeFlags::REQUIRES_AUTHORITY
    .union(SchemeFlags::ALLOW_USER_INFO)
    .union(SchemeFlags::ALLOW_PORT)
    .union(SchemeFlags::ALLOW_QUERY)
    .union(SchemeFlags::ALLOW_FRAGMENT)
    .union(SchemeFlags::PATH_IS_ROOTED)
    .union(SchemeFlags::CONVERT_BACKSLASHES)
    .union(SchemeFlags::COMPRESS_PATH)
    .union(SchemeFlags::ALLOW_IPV6)
    .union(SchemeFlags::ALLOW_IPV4)
    .union(SchemeFlags::ALLOW_DNS)
    .union(SchemeFlags::ALLOW_IDN)
    .union(SchemeFlags::ALLOW_IRI);

const HOSTED: SchemeFlags = SchemeFlags::REQUIRES_AUTHORITY
    .union(SchemeFlags::ALLOW_PORT)
    .union(SchemeFlags::PATH_IS_ROOTED)
    .union(SchemeFlags::ALLOW_IPV6)
    .union(SchemeFlags::ALLOW_IPV4)
    .union(SchemeFlags::ALLOW_DNS)
    .union(SchemeFlags::ALLOW_IDN)
    .union(SchemeFlags::ALLOW_IRI);

const FILE: SchemeFlags = SchemeFlags::AUTHORITY_OPTIONAL
    .union(SchemeFlags::ALLOW_EMPTY_HOST)
    .union(SchemeFlags::FILE_LIKE)
    .union(SchemeFlags::ALLOW_FRAGMENT)
    .union(SchemeFlags::PATH_IS_ROOTED)
    .union(SchemeFlags::CONVERT_BACKSLASHES)
    .union(SchemeFlags::COMPRESS_PATH)
    .union(SchemeFlags::UNESCAPE_PATH_DOTS_AND_SLASHES)
    .union(SchemeFlags::ALLOW_IPV6)
    .union(SchemeFlags::ALLOW_IPV4)
    .union(SchemeFlags::ALLOW_DNS)
    .union(SchemeFlags::ALLOW_UNC)
    .union(SchemeFlags::ALLOW_IDN)
    .union(SchemeFlags::ALLOW_IRI);

const OPAQUE: SchemeFlags = SchemeFlags::ALLOW_FRAGMENT;

/// Descriptor synthesized for schemes absent from the well-known table.
const GENERIC: SchemeFlags = SchemeFlags::AUTHORITY_OPTIONAL
    .union(SchemeFlags::ALLOW_USER_INFO)
    .union(SchemeFlags::ALLOW_PORT)
    .union(SchemeFlags::ALLOW_QUERY)
    .union(SchemeFlags::ALLOW_FRAGMENT)
    .union(SchemeFlags::ALLOW_IPV6)
    .union(SchemeFlags::ALLOW_IPV4)
    .union(SchemeFlags::ALLOW_DNS)
    .union(SchemeFlags::ALLOW_ANY_OTHER_HOST)
    .union(SchemeFlags::ALLOW_EMPTY_HOST)
    .union(SchemeFlags::ALLOW_IDN)
    .union(SchemeFlags::ALLOW_IRI);

static WELL_KNOWN: &[SchemeDescriptor] = &[
    SchemeDescriptor::well_known("http", Some(80), WEB),
    SchemeDescriptor::well_known("https", Some(443), WEB),
    SchemeDescriptor::well_known("ws", Some(80), WEB),
    SchemeDescriptor::well_known("wss", Some(443), WEB),
    SchemeDescriptor::well_known(
        "ftp",
        Some(21),
        WEB.sub_query().union(SchemeFlags::ALLOW_USER_INFO),
    ),
    SchemeDescriptor::well_known("file", None, FILE),
    SchemeDescriptor::well_known(
        "mailto",
        Some(25),
        OPAQUE.union(SchemeFlags::ALLOW_QUERY),
    ),
    SchemeDescriptor::well_known("news", None, OPAQUE),
    SchemeDescriptor::well_known("nntp", Some(119), HOSTED),
    SchemeDescriptor::well_known("gopher", Some(70), HOSTED),
    SchemeDescriptor::well_known(
        "net.tcp",
        Some(808),
        HOSTED.union(SchemeFlags::COMPRESS_PATH),
    ),
    SchemeDescriptor::well_known(
        "net.pipe",
        None,
        SchemeFlags::REQUIRES_AUTHORITY
            .union(SchemeFlags::PATH_IS_ROOTED)
            .union(SchemeFlags::COMPRESS_PATH)
            .union(SchemeFlags::ALLOW_DNS)
            .union(SchemeFlags::ALLOW_IDN)
            .union(SchemeFlags::ALLOW_IRI),
    ),
    SchemeDescriptor::well_known(
        "ldap",
        Some(389),
        HOSTED
            .union(SchemeFlags::ALLOW_EMPTY_HOST)
            .union(SchemeFlags::ALLOW_QUERY)
            .union(SchemeFlags::ALLOW_FRAGMENT),
    ),
    SchemeDescriptor::well_known(
        "telnet",
        Some(23),
        HOSTED.union(SchemeFlags::ALLOW_USER_INFO),
    ),
    SchemeDescriptor::well_known("uuid", None, OPAQUE),
];

impl SchemeFlags {
    const fn sub_query(self) -> Self {
        Self(self.0 & !Self::ALLOW_QUERY.0)
    }
}

fn find_well_known(name: &str) -> Option<&'static Arc<SchemeDescriptor>> {
    static ARCS: OnceLock<Vec<Arc<SchemeDescriptor>>> = OnceLock::new();
    let arcs = ARCS.get_or_init(|| {
        WELL_KNOWN
            .iter()
            .map(|d| {
                Arc::new(SchemeDescriptor {
                    name: d.name.clone(),
                    default_port: d.default_port,
                    flags: d.flags,
                })
            })
            .collect()
    });
    // Compare lengths first; name contents only on a length match.
    arcs.iter()
        .find(|d| d.name.len() == name.len() && d.name == name)
}

/// Checks whether a string is a syntactically valid scheme name.
///
/// # Examples
///
/// ```
/// assert!(canon_uri::check_scheme_name("svn+ssh"));
/// assert!(!canon_uri::check_scheme_name("1http"));
/// assert!(!canon_uri::check_scheme_name(""));
/// ```
#[must_use]
pub fn check_scheme_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(x) if x.is_ascii_alphabetic() => bytes[1..]
            .iter()
            .all(|&x| x.is_ascii_alphanumeric() || matches!(x, b'+' | b'-' | b'.')),
        _ => false,
    }
}

/// A registry mapping scheme names to shared [`SchemeDescriptor`]s.
///
/// Well-known schemes are served from a fixed table. A descriptor for any
/// other syntactically valid scheme is synthesized on first lookup and
/// cached with insert-if-absent discipline: once a name maps to a
/// descriptor, that mapping never changes.
pub struct SchemeRegistry {
    synthesized: RwLock<HashMap<String, Arc<SchemeDescriptor>>>,
}

impl SchemeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            synthesized: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the process-wide registry used by [`Uri::parse`].
    ///
    /// [`Uri::parse`]: crate::Uri::parse
    pub fn global() -> &'static SchemeRegistry {
        static GLOBAL: OnceLock<SchemeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SchemeRegistry::new)
    }

    /// Looks up a descriptor without synthesizing one.
    ///
    /// `name` must already be lowercase.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<SchemeDescriptor>> {
        if let Some(d) = find_well_known(name) {
            return Some(Arc::clone(d));
        }
        self.synthesized
            .read()
            .ok()
            .and_then(|map| map.get(name).cloned())
    }

    /// Returns the descriptor for `name`, synthesizing and caching a
    /// generic one when the scheme is not well-known.
    ///
    /// # Errors
    ///
    /// Returns `BadScheme` when the name fails the scheme grammar and
    /// `SchemeLimit` when it is longer than [`MAX_SCHEME_LEN`].
    pub fn lookup_or_synthesize(&self, name: &str) -> Result<Arc<SchemeDescriptor>, UriError> {
        if name.is_empty() || !check_scheme_name(name) {
            err!(0, BadScheme);
        }
        if name.len() > MAX_SCHEME_LEN {
            err!(0, SchemeLimit);
        }
        debug_assert!(name.bytes().all(|x| !x.is_ascii_uppercase()));
        if let Some(d) = self.lookup(name) {
            return Ok(d);
        }

        let mut map = match self.synthesized.write() {
            Ok(map) => map,
            // A poisoned lock still holds valid insert-if-absent data.
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = map.entry(name.to_owned()).or_insert_with(|| {
            Arc::new(SchemeDescriptor {
                name: Cow::Owned(name.to_owned()),
                default_port: None,
                flags: GENERIC,
            })
        });
        Ok(Arc::clone(entry))
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UriErrorKind;

    #[test]
    fn well_known_ports() {
        let reg = SchemeRegistry::new();
        assert_eq!(reg.lookup("http").unwrap().default_port(), Some(80));
        assert_eq!(reg.lookup("wss").unwrap().default_port(), Some(443));
        assert_eq!(reg.lookup("file").unwrap().default_port(), None);
        assert!(reg.lookup("http").unwrap().has(SchemeFlags::SIMPLE));
    }

    #[test]
    fn synthesized_descriptor_is_interned() {
        let reg = SchemeRegistry::new();
        let a = reg.lookup_or_synthesize("zzz").unwrap();
        let b = reg.lookup_or_synthesize("zzz").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.has(SchemeFlags::SIMPLE));
    }

    #[test]
    fn bad_scheme_names() {
        let reg = SchemeRegistry::new();
        assert_eq!(
            reg.lookup_or_synthesize("9abc").unwrap_err().kind(),
            UriErrorKind::BadScheme
        );
        let long = "a".repeat(MAX_SCHEME_LEN + 1);
        assert_eq!(
            reg.lookup_or_synthesize(&long).unwrap_err().kind(),
            UriErrorKind::SchemeLimit
        );
    }
}
