//! An owned URI reference type with scheme-aware parsing,
//! canonicalization and reference resolution.
//!
//! Parsing is driven by a [`SchemeRegistry`] of [`SchemeDescriptor`]s:
//! well-known schemes (`http`, `file`, `mailto`, ...) carry fixed
//! capability sets that decide what their URIs may contain and how they
//! canonicalize, and any other syntactically valid scheme gets a generic
//! descriptor synthesized on first sight. Windows filesystem paths are
//! first-class inputs: `C:\dir\file` and `\\server\share` parse as
//! implicit `file` URIs.
//!
//! Parsing is two-phase. Constructing a [`Uri`] validates the scheme and
//! authority and classifies the host; the path, query, fragment and the
//! canonical string are computed lazily and cached.
//!
//! # Examples
//!
//! ```
//! use canon_uri::Uri;
//!
//! let uri = Uri::parse("HTTP://Example.COM:80/a/../b%2dc?q#f")?;
//! assert_eq!(uri.absolute_uri(), Some("http://example.com/b%2Dc?q#f"));
//! assert_eq!(uri.host(), Some("example.com"));
//! assert_eq!(uri.port(), Some(80));
//! assert!(uri.is_default_port());
//!
//! let base = Uri::parse("http://example.com/a/b/c")?;
//! let target = base.resolve("../d")?;
//! assert_eq!(target.absolute_uri(), Some("http://example.com/a/d"));
//! # Ok::<_, canon_uri::UriError>(())
//! ```
//!
//! # Crate features
//!
//! - `serde`: `Serialize` and `Deserialize` for [`Uri`] as its canonical
//!   string form.

#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod encoding;
mod error;
mod fmt;
mod host;
mod idn;
mod parser;
mod path;
mod resolver;
mod scheme;
mod uri;

pub use encoding::{
    escape_data_string, escape_uri_string, hex_escape, hex_unescape, unescape_data_string, EStr,
};
pub use error::{UriError, UriErrorKind};
pub use host::{check_host_name, HostType};
pub use parser::UriKind;
pub use scheme::{check_scheme_name, SchemeDescriptor, SchemeRegistry, MAX_SCHEME_LEN};
pub use uri::{CaseMode, Components, Uri, UriFormat};
