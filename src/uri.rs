//! The [`Uri`] type: an owned, parsed and canonicalizable URI reference.

use crate::encoding::{self, table, EStr, UnescapeMode};
use crate::error::{err, UriError};
use crate::host::HostType;
use crate::parser::{self, FullInfo, Parsed, PathDialect, UriKind};
use crate::path;
use crate::resolver;
use crate::scheme::{SchemeDescriptor, SchemeFlags, SchemeRegistry};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

/// Selects URI parts for [`Uri::components`] and [`Uri::compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Components(u16);

impl Components {
    /// The scheme name.
    pub const SCHEME: Self = Self(1);
    /// The userinfo subcomponent.
    pub const USER_INFO: Self = Self(1 << 1);
    /// The host.
    pub const HOST: Self = Self(1 << 2);
    /// The port, elided when it equals the scheme's default.
    pub const PORT: Self = Self(1 << 3);
    /// The path.
    pub const PATH: Self = Self(1 << 4);
    /// The query, without the `?`.
    pub const QUERY: Self = Self(1 << 5);
    /// The fragment, without the `#`.
    pub const FRAGMENT: Self = Self(1 << 6);

    /// Host and port together.
    pub const HOST_AND_PORT: Self = Self(Self::HOST.0 | Self::PORT.0);
    /// Scheme, host and port: the origin of the URI.
    pub const SCHEME_AND_SERVER: Self = Self(Self::SCHEME.0 | Self::HOST_AND_PORT.0);
    /// Path and query: the request target.
    pub const PATH_AND_QUERY: Self = Self(Self::PATH.0 | Self::QUERY.0);
    /// Every component.
    pub const ABSOLUTE_URI: Self = Self(0x7f);

    const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for Components {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Case handling for [`Uri::compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseMode {
    /// Byte-wise comparison.
    Ordinal,
    /// ASCII case-insensitive comparison.
    OrdinalIgnoreCase,
}

/// How extracted components are escaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UriFormat {
    /// Fully escaped canonical form.
    UriEscaped,
    /// Every escape sequence decoded.
    Unescaped,
    /// Decoded except for octets that are reserved in their position.
    SafeUnescaped,
}

/// The canonical rendition of a URI and the spans of its parts.
#[derive(Clone, Debug)]
struct Canonical {
    text: String,
    user: Option<(usize, usize)>,
    /// Everything between the `//` and the path.
    authority: Option<(usize, usize)>,
    host: (usize, usize),
    path: (usize, usize),
    query: Option<(usize, usize)>,
    fragment: Option<usize>,
    /// Length of the path prefix `..` may not climb past.
    floor: usize,
}

/// An owned URI reference, absolute or relative.
///
/// Parsing is two-phase: constructing a `Uri` establishes the scheme,
/// authority bounds, host classification and port. The remaining
/// components and the canonical form are computed on first use and cached.
///
/// The original input is kept verbatim and is never mutated; every
/// accessor derives its answer from it.
#[derive(Clone)]
pub struct Uri {
    original: String,
    info: Parsed,
    full: OnceLock<FullInfo>,
    canonical: OnceLock<Canonical>,
    hash: OnceLock<u64>,
}

impl Uri {
    /// Parses an absolute URI using the global scheme registry.
    ///
    /// # Errors
    ///
    /// Returns a [`UriError`] when the input does not parse as an
    /// absolute URI.
    pub fn parse(s: &str) -> Result<Uri, UriError> {
        Self::parse_kind(s, UriKind::Absolute)
    }

    /// Parses a URI reference with the given interpretation.
    ///
    /// # Errors
    ///
    /// Returns a [`UriError`] when the input does not match `kind`:
    /// an absolute string under [`UriKind::Relative`] fails with
    /// `CannotCreateRelative`, a relative one under [`UriKind::Absolute`]
    /// with `BadFormat`.
    pub fn parse_kind(s: &str, kind: UriKind) -> Result<Uri, UriError> {
        Self::parse_with(s, kind, SchemeRegistry::global())
    }

    /// Parses a URI reference against a caller-owned scheme registry.
    ///
    /// # Errors
    ///
    /// Same as [`Uri::parse_kind`].
    pub fn parse_with(
        s: &str,
        kind: UriKind,
        registry: &SchemeRegistry,
    ) -> Result<Uri, UriError> {
        let info = match kind {
            UriKind::Absolute => parser::parse_absolute(s, registry)?,
            UriKind::Relative => {
                if parser::looks_absolute(s) && parser::parse_absolute(s, registry).is_ok() {
                    err!(0, CannotCreateRelative);
                }
                parser::parse_relative(s)?
            }
            UriKind::RelativeOrAbsolute => {
                if parser::looks_absolute(s) {
                    // A failed absolute parse falls back to a bare
                    // relative reference.
                    match parser::parse_absolute(s, registry) {
                        Ok(info) => info,
                        Err(_) => parser::parse_relative(s)?,
                    }
                } else {
                    parser::parse_relative(s)?
                }
            }
        };
        Ok(Uri {
            original: s.to_owned(),
            info,
            full: OnceLock::new(),
            canonical: OnceLock::new(),
            hash: OnceLock::new(),
        })
    }

    /// Parses a URI reference, returning `None` on failure.
    #[must_use]
    pub fn try_parse(s: &str, kind: UriKind) -> Option<Uri> {
        Self::parse_kind(s, kind).ok()
    }

    /// Returns `true` if `text` parses as `kind` and is already in its
    /// fully escaped canonical form.
    #[must_use]
    pub fn is_well_formed(text: &str, kind: UriKind) -> bool {
        let Ok(uri) = Self::parse_kind(text, kind) else {
            return false;
        };
        // A well-formed URI string is ASCII; IRI input needs conversion.
        if uri.info.flags.unicode_present {
            return false;
        }
        let full = uri.full();
        let escaped = full.user_canon.escaped
            && full.path_canon.escaped
            && full.query_canon.escaped
            && full.fragment_canon.escaped;
        if !escaped {
            return false;
        }
        let Some(desc) = &uri.info.scheme else {
            return true;
        };
        if uri.info.flags.implicit_file || uri.info.flags.port_not_canonical {
            return false;
        }
        let offsets = &uri.info.offsets;
        if !text.starts_with(desc.name()) {
            return false;
        }
        match &uri.info.host {
            Some(host) => {
                uri.info.text[offsets.host_start as usize..offsets.host_end as usize]
                    == host.canonical
            }
            None => true,
        }
    }

    fn full(&self) -> &FullInfo {
        self.full.get_or_init(|| parser::parse_full(&self.info))
    }

    fn canonical(&self) -> &Canonical {
        self.canonical.get_or_init(|| self.build_canonical())
    }

    fn build_canonical(&self) -> Canonical {
        let info = &self.info;
        let full = *self.full();
        let text = &info.text;
        let Some(desc) = &info.scheme else {
            // A relative reference canonicalizes to itself; only the
            // component spans are recorded.
            return Canonical {
                text: text.clone(),
                user: None,
                authority: None,
                host: (0, 0),
                path: (0, full.path_end as usize),
                query: full.query.map(|(s, e)| (s as usize, e as usize)),
                fragment: full.fragment_start.map(|s| s as usize),
                floor: 0,
            };
        };

        let mut out = String::with_capacity(text.len() + 16);
        out.push_str(desc.name());
        out.push(':');

        let mut user = None;
        let mut authority = None;
        let mut host_span = (out.len(), out.len());
        if info.flags.authority_found || desc.is_file_like() {
            out.push_str("//");
            let a0 = out.len();
            if info.flags.has_user_info {
                let u0 = out.len();
                let raw = &text
                    [info.offsets.auth_start as usize..info.offsets.host_start as usize - 1];
                encoding::escape_canonical(raw, table::USERINFO, &mut out);
                user = Some((u0, out.len()));
                out.push('@');
            }
            let h0 = out.len();
            if let Some(host) = &info.host {
                out.push_str(&host.canonical);
            }
            host_span = (h0, out.len());
            if info.flags.not_default_port {
                if let Some(port) = info.port {
                    out.push(':');
                    let _ = write!(out, "{port}");
                }
            }
            authority = Some((a0, out.len()));
        }

        let p0 = out.len();
        let raw = &text[info.offsets.path_start as usize..full.path_end as usize];
        let raw = if desc.has(SchemeFlags::CONVERT_BACKSLASHES) {
            path::convert_slashes(raw)
        } else {
            Cow::Borrowed(raw)
        };
        let mut escaped = String::with_capacity(raw.len() + 1);
        if desc.has(SchemeFlags::PATH_IS_ROOTED) && authority.is_some() && !raw.starts_with('/')
        {
            escaped.push('/');
        }
        encoding::escape_canonical(&raw, table::PATH, &mut escaped);
        let escaped = if desc.has(SchemeFlags::UNESCAPE_PATH_DOTS_AND_SLASHES) {
            path::unescape_separators(&escaped).into_owned()
        } else {
            escaped
        };
        let floor = if info.flags.dialect == PathDialect::Dos && escaped.len() >= 3 {
            // "/c:" stays put no matter how many `..` follow.
            3
        } else {
            0
        };
        if desc.has(SchemeFlags::COMPRESS_PATH) && escaped.len() > floor {
            out.push_str(&path::compress(&escaped[floor..], &escaped[..floor], false));
        } else {
            out.push_str(&escaped);
        }
        let path_span = (p0, out.len());

        let query = full.query.map(|(s, e)| {
            out.push('?');
            let q0 = out.len();
            encoding::escape_canonical(&text[s as usize..e as usize], table::QUERY, &mut out);
            (q0, out.len())
        });
        let fragment = full.fragment_start.map(|s| {
            out.push('#');
            let f0 = out.len();
            encoding::escape_canonical(&text[s as usize..], table::FRAGMENT, &mut out);
            f0
        });

        Canonical {
            text: out,
            user,
            authority,
            host: host_span,
            path: path_span,
            query,
            fragment,
            floor,
        }
    }

    /// Returns `true` for an absolute URI, `false` for a relative
    /// reference.
    #[inline]
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.info.scheme.is_some()
    }

    /// The input string this URI was parsed from, unchanged.
    #[inline]
    #[must_use]
    pub fn original_str(&self) -> &str {
        &self.original
    }

    /// The scheme name in lowercase, or `None` for a relative reference.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.info.scheme.as_deref().map(SchemeDescriptor::name)
    }

    /// The descriptor of this URI's scheme.
    #[must_use]
    pub fn scheme_descriptor(&self) -> Option<&SchemeDescriptor> {
        self.info.scheme.as_deref()
    }

    /// The host in its display form: Unicode for internationalized
    /// domain names, canonical ASCII otherwise. IPv6 hosts keep their
    /// brackets.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        let host = self.info.host.as_ref()?;
        if self.info.flags.idn_host {
            if let Some(unicode) = &host.unicode {
                return Some(unicode);
            }
        }
        Some(&host.canonical)
    }

    /// The host in a form safe to hand to a resolver: canonical ASCII,
    /// IPv6 without brackets but with any zone identifier.
    #[must_use]
    pub fn dns_safe_host(&self) -> Option<&str> {
        let host = self.info.host.as_ref()?;
        Some(unbracket(&host.canonical))
    }

    /// The host in its ASCII-compatible (Punycode) form, unbracketed.
    #[must_use]
    pub fn idn_host(&self) -> Option<&str> {
        self.dns_safe_host()
    }

    /// How the host was classified.
    #[inline]
    #[must_use]
    pub fn host_type(&self) -> HostType {
        self.info.flags.host_type
    }

    /// The effective port: the explicit port if present, otherwise the
    /// scheme's default.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        if !self.is_absolute() {
            return None;
        }
        self.info
            .port
            .or_else(|| self.info.scheme.as_deref().and_then(SchemeDescriptor::default_port))
    }

    /// The port exactly as written, `None` when omitted.
    #[inline]
    #[must_use]
    pub fn explicit_port(&self) -> Option<u16> {
        self.info.port
    }

    /// Returns `true` when no port was written or the written port equals
    /// the scheme's default.
    #[must_use]
    pub fn is_default_port(&self) -> bool {
        !self.info.flags.not_default_port
    }

    /// The userinfo component in canonical escaped form.
    #[must_use]
    pub fn user_info(&self) -> Option<&EStr> {
        let (s, e) = self.canonical().user?;
        Some(EStr::new_validated(&self.canonical().text[s..e]))
    }

    /// The canonical absolute path, escaped, compressed and rooted as the
    /// scheme prescribes. `None` for a relative reference.
    #[must_use]
    pub fn path(&self) -> Option<&EStr> {
        if !self.is_absolute() {
            return None;
        }
        let c = self.canonical();
        Some(EStr::new_validated(&c.text[c.path.0..c.path.1]))
    }

    /// The query in canonical escaped form, without the `?`.
    #[must_use]
    pub fn query(&self) -> Option<&EStr> {
        if !self.is_absolute() {
            return None;
        }
        let c = self.canonical();
        let (s, e) = c.query?;
        Some(EStr::new_validated(&c.text[s..e]))
    }

    /// The fragment in canonical escaped form, without the `#`.
    #[must_use]
    pub fn fragment(&self) -> Option<&EStr> {
        if !self.is_absolute() {
            return None;
        }
        let c = self.canonical();
        let s = c.fragment?;
        Some(EStr::new_validated(&c.text[s..]))
    }

    /// The fully escaped canonical URI string. `None` for a relative
    /// reference, which has no canonical form of its own.
    #[must_use]
    pub fn absolute_uri(&self) -> Option<&str> {
        if !self.is_absolute() {
            return None;
        }
        Some(&self.canonical().text)
    }

    /// Iterates over the canonical path segments, each keeping its
    /// trailing slash.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let path = match self.path() {
            Some(p) => p.as_str(),
            None => "",
        };
        path.split_inclusive('/')
    }

    /// Returns `true` when the host names the local machine.
    #[inline]
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        self.info.flags.loopback
    }

    /// Returns `true` for a UNC filesystem path.
    #[inline]
    #[must_use]
    pub fn is_unc(&self) -> bool {
        self.info.flags.dialect == PathDialect::Unc
    }

    /// Returns `true` for `file` and other filesystem schemes.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.info
            .scheme
            .as_deref()
            .is_some_and(SchemeDescriptor::is_file_like)
    }

    /// Extracts the selected components, joined with their natural
    /// delimiters, in the requested escape format.
    ///
    /// Returns `None` for a relative reference.
    #[must_use]
    pub fn components(&self, which: Components, format: UriFormat) -> Option<String> {
        if !self.is_absolute() {
            return None;
        }
        let c = self.canonical();
        let more_than_scheme = which.intersects(
            Components::USER_INFO
                | Components::HOST
                | Components::PORT
                | Components::PATH
                | Components::QUERY
                | Components::FRAGMENT,
        );

        let mut out = String::new();
        if which.contains(Components::SCHEME) {
            out.push_str(self.scheme().unwrap_or_default());
            if more_than_scheme {
                out.push(':');
            }
        }
        if which.contains(Components::HOST) && c.authority.is_some() {
            if which.contains(Components::SCHEME) {
                out.push_str("//");
            }
            if which.contains(Components::USER_INFO) {
                if let Some((s, e)) = c.user {
                    push_formatted(&mut out, &c.text[s..e], format, false);
                    out.push('@');
                }
            }
            match format {
                UriFormat::UriEscaped => out.push_str(&c.text[c.host.0..c.host.1]),
                _ => out.push_str(self.host().unwrap_or_default()),
            }
            if which.contains(Components::PORT) {
                if let (true, Some(port)) = (self.info.flags.not_default_port, self.info.port) {
                    let _ = write!(out, ":{port}");
                }
            }
        } else if which.contains(Components::PORT) && !which.intersects(Components::HOST) {
            if let Some(port) = self.info.port {
                let _ = write!(out, "{port}");
            }
        }
        if which.contains(Components::PATH) {
            push_formatted(&mut out, &c.text[c.path.0..c.path.1], format, false);
        }
        if which.contains(Components::QUERY) {
            if let Some((s, e)) = c.query {
                if which.0 != Components::QUERY.0 {
                    out.push('?');
                }
                push_formatted(&mut out, &c.text[s..e], format, true);
            }
        }
        if which.contains(Components::FRAGMENT) {
            if let Some(s) = c.fragment {
                if which.0 != Components::FRAGMENT.0 {
                    out.push('#');
                }
                push_formatted(&mut out, &c.text[s..], format, false);
            }
        }
        Some(out)
    }

    /// Compares two URIs over the selected components in the given
    /// format and case mode. Two relative references compare by their
    /// original strings; a relative reference orders before an absolute
    /// URI.
    #[must_use]
    pub fn compare(
        a: &Uri,
        b: &Uri,
        which: Components,
        format: UriFormat,
        case: CaseMode,
    ) -> Ordering {
        match (a.components(which, format), b.components(which, format)) {
            (Some(x), Some(y)) => cmp_strings(&x, &y, case),
            (None, None) => cmp_strings(&a.original, &b.original, case),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
        }
    }

    /// Resolves a reference against this base URI.
    ///
    /// An absolute reference replaces the base entirely; a relative one
    /// is merged per the generic URI algorithm, with backslash conversion
    /// and drive-floor rules applied for schemes that use them.
    ///
    /// # Errors
    ///
    /// Fails when the base is relative or the resolved target does not
    /// parse.
    pub fn resolve(&self, reference: &str) -> Result<Uri, UriError> {
        let Some(desc) = &self.info.scheme else {
            err!(0, BadFormat);
        };
        if parser::looks_absolute(reference) {
            return Uri::parse(reference);
        }
        let c = self.canonical();
        let parts = resolver::BaseParts {
            scheme: desc.name(),
            authority: c.authority.map(|(s, e)| &c.text[s..e]),
            path: &c.text[c.path.0..c.path.1],
            query: c.query.map(|(s, e)| &c.text[s..e]),
            convert_backslashes: desc.has(SchemeFlags::CONVERT_BACKSLASHES),
            floor: c.floor,
        };
        let target = resolver::resolve(&parts, reference);
        Uri::parse(&target)
    }

    /// Resolves a previously parsed reference against this base URI.
    ///
    /// # Errors
    ///
    /// Same as [`Uri::resolve`].
    pub fn resolve_uri(&self, reference: &Uri) -> Result<Uri, UriError> {
        if reference.is_absolute() {
            return Ok(reference.clone());
        }
        self.resolve(&reference.original)
    }

    /// Resolves a reference, returning `None` on failure.
    #[must_use]
    pub fn try_resolve(&self, reference: &str) -> Option<Uri> {
        self.resolve(reference).ok()
    }

    /// Returns `true` when `other` lives in or below the directory of
    /// this URI. Scheme, host and effective port must match.
    #[must_use]
    pub fn is_base_of(&self, other: &Uri) -> bool {
        if !self.same_origin(other) {
            return false;
        }
        let base = self.canonical();
        let base_path = &base.text[base.path.0..base.path.1];
        let base_dir = match base_path.rfind('/') {
            Some(i) => &base_path[..i + 1],
            None => base_path,
        };
        let target = other.canonical();
        let target_path = &target.text[target.path.0..target.path.1];
        if self.ignore_path_case() {
            target_path.len() >= base_dir.len()
                && target_path[..base_dir.len()].eq_ignore_ascii_case(base_dir)
        } else {
            target_path.starts_with(base_dir)
        }
    }

    /// Computes the relative reference that resolves to `target` against
    /// this URI, the inverse of [`Uri::resolve`].
    ///
    /// When the two URIs differ in scheme, host or port, no relative form
    /// exists and the target's canonical string is returned instead.
    /// Returns `None` when either URI is relative.
    #[must_use]
    pub fn make_relative(&self, target: &Uri) -> Option<String> {
        if !self.is_absolute() || !target.is_absolute() {
            return None;
        }
        if !self.same_origin(target) {
            return Some(target.canonical().text.clone());
        }
        let base = self.canonical();
        let tc = target.canonical();
        let diff = resolver::path_difference(
            &base.text[base.path.0..base.path.1],
            &tc.text[tc.path.0..tc.path.1],
            !self.ignore_path_case(),
        );
        let mut rel = match diff {
            Some(d) => d,
            None => return Some(tc.text.clone()),
        };
        if let Some((s, e)) = tc.query {
            rel.push('?');
            rel.push_str(&tc.text[s..e]);
        }
        if let Some(s) = tc.fragment {
            rel.push('#');
            rel.push_str(&tc.text[s..]);
        }
        Some(rel)
    }

    fn same_origin(&self, other: &Uri) -> bool {
        let (Some(a), Some(b)) = (self.scheme(), other.scheme()) else {
            return false;
        };
        if a != b {
            return false;
        }
        let (ca, cb) = (self.canonical(), other.canonical());
        ca.text[ca.host.0..ca.host.1] == cb.text[cb.host.0..cb.host.1]
            && self.port() == other.port()
    }

    /// DOS and UNC paths compare without case.
    fn ignore_path_case(&self) -> bool {
        matches!(self.info.flags.dialect, PathDialect::Dos | PathDialect::Unc)
    }

    fn request_key(&self) -> Option<String> {
        self.components(Components::PATH_AND_QUERY, UriFormat::SafeUnescaped)
    }

    /// When every component is already canonical for display, the
    /// canonical string doubles as the display string.
    pub(crate) fn display_fast_path(&self) -> Option<&str> {
        if !self.is_absolute() || self.info.flags.idn_host {
            return None;
        }
        let full = self.full();
        let plain = full.user_canon.display
            && full.path_canon.display
            && full.query_canon.display
            && full.fragment_canon.display;
        plain.then(|| self.canonical().text.as_str())
    }
}

fn cmp_strings(a: &str, b: &str, case: CaseMode) -> Ordering {
    match case {
        CaseMode::Ordinal => a.cmp(b),
        CaseMode::OrdinalIgnoreCase => {
            let lower = |x: u8| x.to_ascii_lowercase();
            a.bytes().map(lower).cmp(b.bytes().map(lower))
        }
    }
}

fn unbracket(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(host)
}

fn push_formatted(out: &mut String, canonical: &str, format: UriFormat, in_query: bool) {
    let safe = if in_query {
        UnescapeMode::SafeInQuery
    } else {
        UnescapeMode::Safe
    };
    match format {
        UriFormat::UriEscaped => out.push_str(canonical),
        UriFormat::Unescaped => encoding::unescape_in(canonical, UnescapeMode::Full, out),
        UriFormat::SafeUnescaped => encoding::unescape_in(canonical, safe, out),
    }
}

/// Equality follows lookup semantics: scheme, host and effective port
/// must match exactly, path and query match after safe unescaping, and
/// the fragment and userinfo are ignored. Filesystem paths compare
/// without case. Two relative references are equal only when their
/// original strings are.
impl PartialEq for Uri {
    fn eq(&self, other: &Uri) -> bool {
        if !self.is_absolute() || !other.is_absolute() {
            return self.is_absolute() == other.is_absolute() && self.original == other.original;
        }
        if !self.same_origin(other) {
            return false;
        }
        let (Some(a), Some(b)) = (self.request_key(), other.request_key()) else {
            return false;
        };
        if self.ignore_path_case() {
            a.eq_ignore_ascii_case(&b)
        } else {
            a == b
        }
    }
}

impl Eq for Uri {}

impl Hash for Uri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let hash = self.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            if self.is_absolute() {
                self.scheme().hash(&mut hasher);
                let c = self.canonical();
                c.text[c.host.0..c.host.1].hash(&mut hasher);
                self.port().hash(&mut hasher);
                // Lowercased so it agrees with case-insensitive equality.
                self.request_key()
                    .unwrap_or_default()
                    .to_ascii_lowercase()
                    .hash(&mut hasher);
            } else {
                self.original.hash(&mut hasher);
            }
            hasher.finish()
        });
        state.write_u64(*hash);
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = UriError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Uri::parse(s)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::{Uri, UriKind};
    use serde::de::{Deserialize, Deserializer, Error, Unexpected, Visitor};
    use serde::ser::{Serialize, Serializer};
    use std::fmt;

    /// Serialized as the canonical string for an absolute URI and as the
    /// original string for a relative reference.
    impl Serialize for Uri {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self.absolute_uri() {
                Some(canonical) => serializer.serialize_str(canonical),
                None => serializer.serialize_str(self.original_str()),
            }
        }
    }

    impl<'de> Deserialize<'de> for Uri {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct UriVisitor;

            impl Visitor<'_> for UriVisitor {
                type Value = Uri;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a URI reference string")
                }

                fn visit_str<E: Error>(self, v: &str) -> Result<Uri, E> {
                    Uri::parse_kind(v, UriKind::RelativeOrAbsolute)
                        .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
                }
            }

            deserializer.deserialize_str(UriVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    fn canon(s: &str) -> String {
        uri(s).absolute_uri().unwrap().to_owned()
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(canon("HTTP://Example.COM"), "http://example.com/");
        assert_eq!(canon("http://example.com:80/a"), "http://example.com/a");
        assert_eq!(canon("http://example.com:8080/a"), "http://example.com:8080/a");
        assert_eq!(canon("http://h/a/../b/./c"), "http://h/b/c");
        assert_eq!(canon("http://h/a%2fb"), "http://h/a%2Fb");
        assert_eq!(canon("http:\\\\h\\a\\b"), "http://h/a/b");
    }

    #[test]
    fn file_canonical_forms() {
        assert_eq!(canon("C:\\dir\\file.txt"), "file:///C:/dir/file.txt");
        assert_eq!(canon("file://C:/dir/x"), "file:///C:/dir/x");
        assert_eq!(canon("\\\\Server\\Share\\x"), "file://server/Share/x");
        assert_eq!(canon("file:///C:/a/../../x"), "file:///C:/x");
    }

    #[test]
    fn ipv6_and_idn_hosts() {
        assert_eq!(
            canon("http://[2001:DB8:0:0:0:0:0:1]/x"),
            "http://[2001:db8::1]/x"
        );
        let u = uri("http://пример.рф/p");
        assert_eq!(u.host(), Some("пример.рф"));
        assert_eq!(u.dns_safe_host(), Some("xn--e1afmkfd.xn--p1ai"));
        assert_eq!(
            u.absolute_uri(),
            Some("http://xn--e1afmkfd.xn--p1ai/p")
        );
    }

    #[test]
    fn port_accessors() {
        let u = uri("http://host:80/p");
        assert_eq!(u.port(), Some(80));
        assert_eq!(u.explicit_port(), Some(80));
        assert!(u.is_default_port());
        assert_eq!(u.absolute_uri(), Some("http://host/p"));

        let u = uri("http://host/p");
        assert_eq!(u.port(), Some(80));
        assert_eq!(u.explicit_port(), None);
    }

    #[test]
    fn equality_ignores_fragment_and_incidental_escaping() {
        assert_eq!(uri("http://h/%68ello"), uri("http://h/hello"));
        assert_eq!(uri("http://h/p#a"), uri("http://h/p#b"));
        assert_eq!(uri("http://h:80/p"), uri("http://h/p"));
        assert_ne!(uri("http://h/A"), uri("http://h/a"));
        assert_eq!(uri("file:///C:/X"), uri("file:///c:/x"));
        assert_ne!(uri("http://h/p?a"), uri("http://h/p?b"));
    }

    #[test]
    fn equal_uris_hash_alike() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(u: &Uri) -> u64 {
            let mut h = DefaultHasher::new();
            u.hash(&mut h);
            h.finish()
        }
        assert_eq!(
            hash_of(&uri("http://h/%68ello#x")),
            hash_of(&uri("http://h/hello"))
        );
        assert_eq!(
            hash_of(&uri("file:///C:/X")),
            hash_of(&uri("file:///c:/x"))
        );
    }

    #[test]
    fn components_extraction() {
        let u = uri("http://user@h:8080/a%20b?q=1#f");
        assert_eq!(
            u.components(Components::SCHEME_AND_SERVER, UriFormat::UriEscaped)
                .unwrap(),
            "http://h:8080"
        );
        assert_eq!(
            u.components(Components::PATH_AND_QUERY, UriFormat::SafeUnescaped)
                .unwrap(),
            "/a b?q=1"
        );
        assert_eq!(
            u.components(Components::QUERY, UriFormat::UriEscaped).unwrap(),
            "q=1"
        );
        assert_eq!(
            u.components(Components::ABSOLUTE_URI, UriFormat::UriEscaped)
                .unwrap(),
            "http://user@h:8080/a%20b?q=1#f"
        );
    }

    #[test]
    fn compare_honors_the_case_mode() {
        let a = uri("http://h/A");
        let b = uri("http://h/a");
        let all = Components::ABSOLUTE_URI;
        assert_ne!(
            Uri::compare(&a, &b, all, UriFormat::UriEscaped, CaseMode::Ordinal),
            Ordering::Equal
        );
        assert_eq!(
            Uri::compare(&a, &b, all, UriFormat::UriEscaped, CaseMode::OrdinalIgnoreCase),
            Ordering::Equal
        );
        // Unselected components do not take part.
        assert_eq!(
            Uri::compare(
                &uri("http://h/p?x"),
                &uri("http://h/p?y"),
                Components::PATH,
                UriFormat::UriEscaped,
                CaseMode::Ordinal,
            ),
            Ordering::Equal
        );
    }

    #[test]
    fn segment_iteration() {
        let u = uri("http://h/a/b/c");
        let segs: Vec<_> = u.segments().collect();
        assert_eq!(segs, ["/", "a/", "b/", "c"]);
    }

    #[test]
    fn base_and_relative() {
        let base = uri("http://h/a/b/c");
        assert!(base.is_base_of(&uri("http://h/a/b/d")));
        assert!(base.is_base_of(&uri("http://h/a/b/c/d")));
        assert!(!base.is_base_of(&uri("http://h/a/x")));
        assert!(!base.is_base_of(&uri("https://h/a/b/d")));

        let target = uri("http://h/a/x/y?q");
        let rel = base.make_relative(&target).unwrap();
        assert_eq!(rel, "../x/y?q");
        assert_eq!(base.resolve(&rel).unwrap(), target);
    }

    #[test]
    fn resolve_cases() {
        let base = uri("http://a/b/c/d;p?q");
        assert_eq!(
            base.resolve("g").unwrap().absolute_uri(),
            Some("http://a/b/c/g")
        );
        assert_eq!(
            base.resolve("ftp://x/y").unwrap().scheme(),
            Some("ftp")
        );
        assert!(uri("http://h/").resolve("http://[bad").is_err());
    }

    #[test]
    fn relative_references() {
        let r = Uri::parse_kind("a/b?q", UriKind::Relative).unwrap();
        assert!(!r.is_absolute());
        assert_eq!(r.scheme(), None);
        assert_eq!(r.path(), None);
        assert_eq!(
            Uri::parse_kind("http://h/", UriKind::Relative).unwrap_err().kind(),
            crate::error::UriErrorKind::CannotCreateRelative
        );
        let either = Uri::parse_kind("http://[bad", UriKind::RelativeOrAbsolute).unwrap();
        assert!(!either.is_absolute());
    }

    #[test]
    fn well_formedness() {
        assert!(Uri::is_well_formed("http://example.com/a%20b", UriKind::Absolute));
        assert!(!Uri::is_well_formed("http://example.com/a b", UriKind::Absolute));
        assert!(!Uri::is_well_formed("HTTP://example.com/", UriKind::Absolute));
        assert!(!Uri::is_well_formed("C:\\x", UriKind::Absolute));
        assert!(Uri::is_well_formed("a/b/c", UriKind::Relative));
        assert!(!Uri::is_well_formed("a b", UriKind::Relative));
    }
}
