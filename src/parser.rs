//! The core parser: scheme detection, minimal authority parse and the
//! deferred full component parse.

use crate::encoding::{self, table};
use crate::error::{err, UriError};
use crate::host::{self, ClassifiedHost, HostType};
use crate::idn;
use crate::scheme::{SchemeDescriptor, SchemeFlags, SchemeRegistry};
use std::sync::Arc;

/// Inputs at least this long cannot be indexed with 16-bit offsets.
pub(crate) const MAX_INPUT_LEN: usize = 65520;

/// How a string should be interpreted when parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UriKind {
    /// The string must be an absolute URI.
    Absolute,
    /// The string must be a relative reference.
    Relative,
    /// Absolute if it looks absolute, relative otherwise.
    RelativeOrAbsolute,
}

/// The filesystem path dialect a URI carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PathDialect {
    /// Not a filesystem path.
    #[default]
    None,
    /// A DOS drive path such as `C:\dir\file`.
    Dos,
    /// A UNC path such as `\\server\share`.
    Unc,
    /// A rooted Unix-style file path.
    Unix,
}

/// Orthogonal facts established by the minimal parse.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Flags {
    pub host_type: HostType,
    pub dialect: PathDialect,
    pub authority_found: bool,
    pub has_user_info: bool,
    pub not_default_port: bool,
    pub loopback: bool,
    pub unicode_present: bool,
    pub idn_host: bool,
    pub implicit_file: bool,
    /// The port delimiter was present with no digits; the canonical form
    /// drops it.
    pub port_not_canonical: bool,
}

/// Byte offsets into the working text, written once by the minimal parse.
///
/// Offsets are monotonically non-decreasing:
/// `scheme_end <= auth_start <= host_start <= host_end <= port_start <= path_start`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Offsets {
    pub scheme_end: u16,
    pub auth_start: u16,
    pub host_start: u16,
    pub host_end: u16,
    pub port_start: u16,
    pub path_start: u16,
}

impl Offsets {
    fn is_monotone(&self, len: usize) -> bool {
        self.scheme_end <= self.auth_start
            && self.auth_start <= self.host_start
            && self.host_start <= self.host_end
            && self.host_end <= self.port_start
            && self.port_start <= self.path_start
            && (self.path_start as usize) <= len
    }
}

/// Output of the minimal parse; enough to answer scheme, authority and
/// host questions without touching path, query or fragment.
#[derive(Clone, Debug)]
pub(crate) struct Parsed {
    /// Working text. Differs from the input only when bidi controls were
    /// stripped from the host.
    pub text: String,
    pub scheme: Option<Arc<SchemeDescriptor>>,
    pub flags: Flags,
    pub offsets: Offsets,
    pub host: Option<ClassifiedHost>,
    pub port: Option<u16>,
}

/// Canonical-state bits for one component.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ComponentCanon {
    /// Byte-identical to its escaped canonical form.
    pub escaped: bool,
    /// Also free of escapes: canonical for display.
    pub display: bool,
}

impl Default for ComponentCanon {
    /// An absent component has nothing to normalize.
    fn default() -> Self {
        ComponentCanon {
            escaped: true,
            display: true,
        }
    }
}

impl From<encoding::CanonFacts> for ComponentCanon {
    fn from(facts: encoding::CanonFacts) -> Self {
        ComponentCanon {
            escaped: facts.is_canonical(),
            display: facts.is_display_canonical(),
        }
    }
}

/// Output of the deferred full parse.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FullInfo {
    pub path_end: u16,
    /// Bounds of the query text, excluding the `?`.
    pub query: Option<(u16, u16)>,
    /// Start of the fragment text, excluding the `#`.
    pub fragment_start: Option<u16>,
    pub user_canon: ComponentCanon,
    pub path_canon: ComponentCanon,
    pub query_canon: ComponentCanon,
    pub fragment_canon: ComponentCanon,
}

/// Rejects inputs the parser never accepts in any component.
fn reject_controls(text: &str) -> Result<(), UriError> {
    if let Some(i) = text.bytes().position(|x| x < 0x20 || x == 0x7f) {
        err!(i, BadFormat);
    }
    Ok(())
}

fn check_len(text: &str) -> Result<(), UriError> {
    if text.len() >= MAX_INPUT_LEN {
        err!(0, SizeLimit);
    }
    Ok(())
}

fn is_drive(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Locates the scheme delimiter: the first `:` before any of `/ \ ? #`.
fn scheme_delim(text: &str) -> Option<usize> {
    text.bytes()
        .position(|x| matches!(x, b':' | b'/' | b'\\' | b'?' | b'#'))
        .filter(|&i| text.as_bytes()[i] == b':')
}

/// Returns `true` if the text can only be read as an absolute URI:
/// it has a scheme delimiter or an implicit filesystem-path prefix.
pub(crate) fn looks_absolute(text: &str) -> bool {
    text.starts_with("\\\\") || scheme_delim(text).is_some()
}

/// Minimal parse of a relative reference: no scheme, no authority.
pub(crate) fn parse_relative(text: &str) -> Result<Parsed, UriError> {
    check_len(text)?;
    reject_controls(text)?;
    let flags = Flags {
        unicode_present: !text.is_ascii(),
        ..Flags::default()
    };
    Ok(Parsed {
        text: text.to_owned(),
        scheme: None,
        flags,
        offsets: Offsets::default(),
        host: None,
        port: None,
    })
}

/// Minimal parse of an absolute URI: scheme, authority bounds, host
/// classification and port. Path, query and fragment are bounded but not
/// yet split; that is the job of [`parse_full`].
pub(crate) fn parse_absolute(text: &str, registry: &SchemeRegistry) -> Result<Parsed, UriError> {
    check_len(text)?;
    if text.is_empty() {
        err!(0, EmptyInput);
    }
    reject_controls(text)?;

    let mut p = Parser {
        registry,
        flags: Flags {
            unicode_present: !text.is_ascii(),
            ..Flags::default()
        },
        offsets: Offsets::default(),
        host: None,
        port: None,
    };

    // Implicit filesystem paths synthesize the `file` scheme.
    if text.starts_with("\\\\") {
        return p.parse_implicit_unc(text);
    }
    let Some(colon) = scheme_delim(text) else {
        err!(0, BadFormat);
    };
    if colon == 1 && is_drive(text) {
        return p.parse_implicit_dos(text);
    }
    if colon == 1 && text.as_bytes()[0].is_ascii_alphabetic() {
        // A one-letter scheme is always read as a DOS drive.
        err!(2, MustRootedPath);
    }

    let name = text[..colon].to_ascii_lowercase();
    let desc = registry.lookup_or_synthesize(&name)?;
    p.offsets.scheme_end = colon as u16;
    p.parse_after_scheme(text, colon + 1, desc)
}

struct Parser<'a> {
    registry: &'a SchemeRegistry,
    flags: Flags,
    offsets: Offsets,
    host: Option<ClassifiedHost>,
    port: Option<u16>,
}

impl Parser<'_> {
    fn file_scheme(&self) -> Arc<SchemeDescriptor> {
        // `file` is in the well-known table; lookup cannot fail.
        self.registry
            .lookup_or_synthesize("file")
            .unwrap_or_else(|_| unreachable!("file scheme is well-known"))
    }

    fn parse_implicit_dos(mut self, text: &str) -> Result<Parsed, UriError> {
        let desc = self.file_scheme();
        self.flags.implicit_file = true;
        self.flags.dialect = PathDialect::Dos;
        self.flags.host_type = HostType::None;
        // The whole text is the path; all other offsets stay at zero.
        self.finish(text.to_owned(), Some(desc))
    }

    fn parse_implicit_unc(mut self, text: &str) -> Result<Parsed, UriError> {
        let desc = self.file_scheme();
        self.flags.implicit_file = true;
        self.flags.dialect = PathDialect::Unc;
        self.offsets.auth_start = 2;
        self.parse_authority(text, 2, desc)
    }

    fn parse_after_scheme(
        mut self,
        text: &str,
        pos: usize,
        desc: Arc<SchemeDescriptor>,
    ) -> Result<Parsed, UriError> {
        let rest = &text.as_bytes()[pos..];
        let marker = matches!(rest, [b'/' | b'\\', b'/' | b'\\', ..]);
        let backslash_marker = marker && (rest[0] == b'\\' || rest[1] == b'\\');

        if marker && !desc.has(SchemeFlags::REQUIRES_AUTHORITY)
            && !desc.has(SchemeFlags::AUTHORITY_OPTIONAL)
        {
            // Opaque schemes have no authority to put a host in.
            err!(pos, NonEmptyHost);
        }
        if marker && backslash_marker && !desc.has(SchemeFlags::CONVERT_BACKSLASHES) {
            err!(pos, BadAuthorityTerminator);
        }
        if !marker {
            if desc.has(SchemeFlags::REQUIRES_AUTHORITY) {
                err!(pos, BadAuthority);
            }
            if desc.is_file_like() {
                let trimmed = text[pos..].trim_start_matches(['/', '\\']);
                self.flags.dialect = if is_drive(trimmed) {
                    PathDialect::Dos
                } else {
                    PathDialect::Unix
                };
            }
            // No authority; everything from here is path/query/fragment.
            self.set_no_authority(pos as u16);
            return self.finish(text.to_owned(), Some(desc));
        }

        let auth_start = pos + 2;
        if desc.is_file_like() {
            if is_drive(&text[auth_start..]) {
                // `file://C:/x` carries a drive, not a host.
                self.flags.dialect = PathDialect::Dos;
                self.set_no_authority(auth_start as u16);
                return self.finish(text.to_owned(), Some(desc));
            }
            if self.flags.dialect == PathDialect::None {
                self.flags.dialect = PathDialect::Unix;
            }
        }
        self.offsets.auth_start = auth_start as u16;
        self.parse_authority(text, auth_start, desc)
    }

    fn set_no_authority(&mut self, path_start: u16) {
        self.offsets.auth_start = path_start;
        self.offsets.host_start = path_start;
        self.offsets.host_end = path_start;
        self.offsets.port_start = path_start;
        self.offsets.path_start = path_start;
        self.flags.host_type = HostType::None;
    }

    fn parse_authority(
        mut self,
        text: &str,
        auth_start: usize,
        desc: Arc<SchemeDescriptor>,
    ) -> Result<Parsed, UriError> {
        let convert = desc.has(SchemeFlags::CONVERT_BACKSLASHES);
        let bytes = text.as_bytes();

        let auth_end = bytes[auth_start..]
            .iter()
            .position(|&x| x == b'/' || x == b'?' || x == b'#' || (convert && x == b'\\'))
            .map_or(text.len(), |i| auth_start + i);

        // Userinfo ends at the last `@` in the authority.
        let host_start = match text[auth_start..auth_end].rfind('@') {
            Some(i) => {
                if !desc.has(SchemeFlags::ALLOW_USER_INFO) {
                    err!(auth_start + i, BadAuthority);
                }
                self.flags.has_user_info = true;
                auth_start + i + 1
            }
            None => auth_start,
        };

        let host_end;
        let mut port_start = auth_end;
        if bytes.get(host_start) == Some(&b'[') {
            match text[host_start..auth_end].find(']') {
                Some(i) => host_end = host_start + i + 1,
                None => err!(host_start, BadHostName),
            }
            match bytes.get(host_end) {
                None => {}
                Some(&b':') => port_start = host_end + 1,
                Some(_) if host_end == auth_end => {}
                Some(_) => err!(host_end, BadAuthorityTerminator),
            }
        } else {
            match text[host_start..auth_end].rfind(':') {
                Some(i) => {
                    host_end = host_start + i;
                    port_start = host_end + 1;
                }
                None => host_end = auth_end,
            }
        }

        // Port digits.
        if port_start < auth_end {
            if !desc.has(SchemeFlags::ALLOW_PORT) {
                err!(port_start, BadPort);
            }
            let digits = &text[port_start..auth_end];
            if let Some(i) = digits.bytes().position(|x| !x.is_ascii_digit()) {
                err!(port_start + i, BadPort);
            }
            match digits.parse::<u16>() {
                Ok(port) => {
                    self.port = Some(port);
                    self.flags.not_default_port = desc.default_port() != Some(port);
                }
                Err(_) => err!(port_start, BadPort),
            }
        } else if port_start == auth_end && host_end < auth_end {
            // Trailing `:` with no digits.
            if host_start == host_end
                && !(desc.has(SchemeFlags::ALLOW_ANY_OTHER_HOST)
                    || !desc.has(SchemeFlags::SIMPLE))
            {
                err!(port_start, BadPort);
            }
            self.flags.port_not_canonical = true;
        }

        // Classify the host, stripping bidi controls from the working text
        // if any are present.
        let raw_host = &text[host_start..host_end];
        let mut working = text.to_owned();
        let mut host_end = host_end;
        let mut auth_end = auth_end;
        if !raw_host.is_ascii() {
            let stripped = idn::strip_bidi(raw_host);
            if stripped.len() != raw_host.len() {
                let delta = raw_host.len() - stripped.len();
                working = format!("{}{}{}", &text[..host_start], stripped, &text[host_end..]);
                host_end -= delta;
                auth_end -= delta;
                if port_start > host_end {
                    port_start -= delta;
                }
            }
        }
        let classified = host::classify(&working[host_start..host_end], &desc, host_start)?;
        self.flags.host_type = classified.kind;
        self.flags.loopback = classified.loopback;
        self.flags.idn_host = classified.is_idn;
        self.flags.authority_found = true;
        if desc.is_file_like() && self.flags.dialect != PathDialect::Unc {
            self.flags.dialect = if classified.canonical.is_empty() {
                PathDialect::Unix
            } else {
                PathDialect::Unc
            };
        }
        self.host = Some(classified);

        self.offsets.host_start = host_start as u16;
        self.offsets.host_end = host_end as u16;
        self.offsets.port_start = port_start.min(auth_end) as u16;
        self.offsets.path_start = auth_end as u16;

        // A drive letter may still follow the authority: `file://host/C:/x`
        // keeps the UNC dialect, but an empty host demotes to DOS.
        if desc.is_file_like()
            && self.flags.host_type == HostType::Basic
            && working[auth_end..].len() >= 3
            && is_drive(&working[auth_end + 1..])
        {
            self.flags.dialect = PathDialect::Dos;
        }

        self.finish(working, Some(desc))
    }

    fn finish(
        self,
        text: String,
        scheme: Option<Arc<SchemeDescriptor>>,
    ) -> Result<Parsed, UriError> {
        debug_assert!(self.offsets.is_monotone(text.len()));
        Ok(Parsed {
            text,
            scheme,
            flags: self.flags,
            offsets: self.offsets,
            host: self.host,
            port: self.port,
        })
    }
}

/// The deferred full parse: locate `?` and `#` honoring the scheme's
/// capabilities and compute per-component canonical bits.
pub(crate) fn parse_full(parsed: &Parsed) -> FullInfo {
    let text = &parsed.text;
    let bytes = text.as_bytes();
    let path_start = parsed.offsets.path_start as usize;

    let (allow_query, allow_fragment) = match &parsed.scheme {
        Some(desc) => (
            desc.has(SchemeFlags::ALLOW_QUERY),
            desc.has(SchemeFlags::ALLOW_FRAGMENT),
        ),
        // A relative reference cannot know its scheme yet; both allowed.
        None => (true, true),
    };

    let mut query_pos = None;
    let mut fragment_pos = None;
    for (i, &x) in bytes.iter().enumerate().skip(path_start) {
        match x {
            b'?' if allow_query && query_pos.is_none() && fragment_pos.is_none() => {
                query_pos = Some(i);
            }
            b'#' if allow_fragment && fragment_pos.is_none() => {
                fragment_pos = Some(i);
            }
            _ => {}
        }
    }

    let path_end = query_pos.or(fragment_pos).unwrap_or(text.len());
    let query = query_pos.map(|q| {
        let end = fragment_pos.unwrap_or(text.len());
        (q as u16 + 1, end as u16)
    });
    let fragment_start = fragment_pos.map(|f| f as u16 + 1);

    let user_end = (parsed.offsets.host_start as usize).saturating_sub(1);
    let user = if parsed.flags.has_user_info {
        &text[parsed.offsets.auth_start as usize..user_end]
    } else {
        ""
    };

    FullInfo {
        path_end: path_end as u16,
        query,
        fragment_start,
        user_canon: encoding::scan(user, table::USERINFO).into(),
        path_canon: encoding::scan(&text[path_start..path_end], table::PATH).into(),
        query_canon: query
            .map(|(s, e)| encoding::scan(&text[s as usize..e as usize], table::QUERY).into())
            .unwrap_or_default(),
        fragment_canon: fragment_start
            .map(|s| encoding::scan(&text[s as usize..], table::FRAGMENT).into())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Parsed {
        parse_absolute(s, SchemeRegistry::global()).unwrap()
    }

    #[test]
    fn minimal_offsets() {
        let p = parse("http://user@example.com:8080/a/b?q#f");
        assert_eq!(p.offsets.scheme_end, 4);
        assert_eq!(p.offsets.auth_start, 7);
        assert_eq!(p.offsets.host_start, 12);
        assert_eq!(p.offsets.host_end, 23);
        assert_eq!(&p.text[p.offsets.port_start as usize..p.offsets.path_start as usize], "8080");
        assert_eq!(p.port, Some(8080));
        assert!(p.flags.not_default_port);
        assert!(p.flags.has_user_info);
    }

    #[test]
    fn full_parse_splits_query_and_fragment() {
        let p = parse("http://h/p?q=1#frag");
        let full = parse_full(&p);
        assert_eq!(&p.text[p.offsets.path_start as usize..full.path_end as usize], "/p");
        let (qs, qe) = full.query.unwrap();
        assert_eq!(&p.text[qs as usize..qe as usize], "q=1");
        assert_eq!(&p.text[full.fragment_start.unwrap() as usize..], "frag");
    }

    #[test]
    fn absent_components_count_as_canonical() {
        let p = parse("http://h/a%20b");
        let full = parse_full(&p);
        assert!(full.query_canon.escaped && full.query_canon.display);
        assert!(full.fragment_canon.escaped && full.fragment_canon.display);
        assert!(full.path_canon.escaped && !full.path_canon.display);
    }

    #[test]
    fn fragment_disallowed_stays_in_path() {
        // nntp allows neither query nor fragment delimiters.
        let p = parse("nntp://h/group#frag");
        let full = parse_full(&p);
        assert_eq!(full.fragment_start, None);
        assert_eq!(full.query, None);
        assert_eq!(
            &p.text[p.offsets.path_start as usize..full.path_end as usize],
            "/group#frag"
        );
    }

    #[test]
    fn implicit_file_paths() {
        let p = parse("C:\\dir\\file.txt");
        assert!(p.flags.implicit_file);
        assert_eq!(p.flags.dialect, PathDialect::Dos);
        assert_eq!(p.scheme.as_ref().unwrap().name(), "file");

        let p = parse("\\\\server\\share\\x");
        assert!(p.flags.implicit_file);
        assert_eq!(p.flags.dialect, PathDialect::Unc);
        assert_eq!(p.host.as_ref().unwrap().canonical, "server");
    }

    #[test]
    fn size_limit() {
        let long = "http://h/".to_owned() + &"a".repeat(70_000);
        let e = parse_absolute(&long, SchemeRegistry::global()).unwrap_err();
        assert_eq!(e.kind(), crate::error::UriErrorKind::SizeLimit);
    }
}
