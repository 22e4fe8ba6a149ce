//! Reference resolution against a base URI and its inverse,
//! relative-path computation.

use crate::path;
use std::borrow::Cow;

/// The slices of a base URI that resolution reads.
///
/// All parts are canonical; the resolver never has to re-escape them.
pub(crate) struct BaseParts<'a> {
    pub scheme: &'a str,
    /// Canonical authority including userinfo and port, without the `//`.
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    /// Backslashes in the reference count as slashes.
    pub convert_backslashes: bool,
    /// Length of the path prefix `..` may not climb past, e.g. `/c:`
    /// for a DOS drive.
    pub floor: usize,
}

/// Splits a relative reference into path, query and fragment.
fn split_reference(reference: &str) -> (&str, Option<&str>, Option<&str>) {
    let (without_fragment, fragment) = match reference.find('#') {
        Some(i) => (&reference[..i], Some(&reference[i + 1..])),
        None => (reference, None),
    };
    let (path, query) = match without_fragment.find('?') {
        Some(i) => (&without_fragment[..i], Some(&without_fragment[i + 1..])),
        None => (without_fragment, None),
    };
    (path, query, fragment)
}

/// Resolves a relative reference against base parts, producing the target
/// URI string.
///
/// The reference must not be an absolute URI; the caller short-circuits
/// that case. The output still goes through the parser, so it need not be
/// canonical, only well-formed.
pub(crate) fn resolve(base: &BaseParts<'_>, reference: &str) -> String {
    let (ref_path, ref_query, fragment) = split_reference(reference);
    let ref_path: Cow<'_, str> = if base.convert_backslashes {
        path::convert_slashes(ref_path)
    } else {
        Cow::Borrowed(ref_path)
    };

    let mut out = String::with_capacity(
        base.scheme.len() + base.path.len() + reference.len() + 8,
    );
    out.push_str(base.scheme);
    out.push(':');

    if let Some(rest) = ref_path.strip_prefix("//") {
        // The reference carries its own authority.
        out.push_str("//");
        out.push_str(rest);
        push_query(&mut out, ref_query);
    } else {
        if let Some(auth) = base.authority {
            out.push_str("//");
            out.push_str(auth);
        }
        if ref_path.is_empty() {
            out.push_str(base.path);
            push_query(&mut out, ref_query.or(base.query));
        } else if ref_path.starts_with('/') {
            out.push_str(&path::compress(&ref_path, "", false));
            push_query(&mut out, ref_query);
        } else {
            merge(&mut out, base, &ref_path);
            push_query(&mut out, ref_query);
        }
    }

    if let Some(f) = fragment {
        out.push('#');
        out.push_str(f);
    }
    out
}

/// RFC 3986 path merge: the reference is appended to the base path with
/// its last segment removed, then dot segments are compressed.
fn merge(out: &mut String, base: &BaseParts<'_>, ref_path: &str) {
    let base_dir = match base.path.rfind('/') {
        Some(i) => &base.path[..i + 1],
        None if base.authority.is_some() => "/",
        None => "",
    };
    let start = out.len();
    out.push_str(base_dir);
    let floor = start + base.floor.min(base_dir.len());
    path::remove_dot_segments(out, ref_path, floor, false);
}

fn push_query(out: &mut String, query: Option<&str>) {
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
}

/// Computes the relative path that leads from `base_path` to
/// `target_path`: one `../` per segment left in the base after their
/// common directory, then the target's remainder.
///
/// Returns `None` when the paths share no common prefix at all, in which
/// case no useful relative form exists.
pub(crate) fn path_difference(
    base_path: &str,
    target_path: &str,
    compare_case: bool,
) -> Option<String> {
    let b1 = base_path.as_bytes();
    let b2 = target_path.as_bytes();

    // Position just past the last `/` both paths agree on.
    let mut last_slash = None;
    let mut i = 0;
    while i < b1.len() && i < b2.len() {
        let same = if compare_case {
            b1[i] == b2[i]
        } else {
            b1[i].eq_ignore_ascii_case(&b2[i])
        };
        if !same {
            break;
        }
        if b1[i] == b'/' {
            last_slash = Some(i);
        }
        i += 1;
    }

    if i == 0 {
        return None;
    }
    if i == b1.len() && i == b2.len() {
        return Some(String::new());
    }

    let mut rel = String::new();
    for &x in &b1[i..] {
        if x == b'/' {
            rel.push_str("../");
        }
    }
    rel.push_str(&target_path[last_slash.map_or(0, |s| s + 1)..]);
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseParts<'static> {
        BaseParts {
            scheme: "http",
            authority: Some("a"),
            path: "/b/c/d;p",
            query: Some("q"),
            convert_backslashes: true,
            floor: 0,
        }
    }

    #[test]
    fn merge_cases() {
        let b = base();
        assert_eq!(resolve(&b, "g"), "http://a/b/c/g");
        assert_eq!(resolve(&b, "../g"), "http://a/b/g");
        assert_eq!(resolve(&b, "../../../g"), "http://a/g");
        assert_eq!(resolve(&b, "./g/."), "http://a/b/c/g/");
    }

    #[test]
    fn query_and_fragment_cases() {
        let b = base();
        assert_eq!(resolve(&b, ""), "http://a/b/c/d;p?q");
        assert_eq!(resolve(&b, "?y"), "http://a/b/c/d;p?y");
        assert_eq!(resolve(&b, "#s"), "http://a/b/c/d;p?q#s");
        assert_eq!(resolve(&b, "g?y#s"), "http://a/b/c/g?y#s");
    }

    #[test]
    fn authority_and_rooted_cases() {
        let b = base();
        assert_eq!(resolve(&b, "//g"), "http://g");
        assert_eq!(resolve(&b, "/g"), "http://a/g");
        assert_eq!(resolve(&b, "/../g"), "http://a/g");
    }

    #[test]
    fn backslash_references_convert() {
        let b = base();
        assert_eq!(resolve(&b, "\\g\\h"), "http://a/g/h");
    }

    #[test]
    fn floor_keeps_the_drive() {
        let b = BaseParts {
            scheme: "file",
            authority: Some(""),
            path: "/c:/dir/file.txt",
            query: None,
            convert_backslashes: true,
            floor: 3,
        };
        assert_eq!(resolve(&b, "../../../other"), "file:///c:/other");
    }

    #[test]
    fn path_differences() {
        assert_eq!(
            path_difference("/a/b/c", "/a/b/d", true).unwrap(),
            "d"
        );
        assert_eq!(
            path_difference("/a/b/c/", "/a/x", true).unwrap(),
            "../../x"
        );
        assert_eq!(path_difference("/a/b", "/a/b", true).unwrap(), "");
        assert_eq!(
            path_difference("/A/b", "/a/x", false).unwrap(),
            "x"
        );
        assert_eq!(path_difference("x/y", "z", true), None);
    }
}
