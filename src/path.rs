//! Dot-segment compression and slash normalization.

use std::borrow::Cow;

/// Rewrites backslashes to forward slashes for slash-converting schemes.
pub(crate) fn convert_slashes(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Decodes `%2F` and `%5C` into `/` so they take part in path structure,
/// the way filesystem schemes read them.
pub(crate) fn unescape_separators(path: &str) -> Cow<'_, str> {
    if !path.contains('%') {
        return Cow::Borrowed(path);
    }
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(octet) = crate::encoding::pct_octet(bytes, i) {
                if octet == b'/' || octet == b'\\' {
                    out.push('/');
                    i += 3;
                    continue;
                }
            }
            out.push('%');
            i += 1;
        } else {
            let len = crate::encoding::utf8_len(bytes[i]);
            out.push_str(&path[i..i + len]);
            i += len;
        }
    }
    Cow::Owned(out)
}

fn is_dot(seg: &str) -> bool {
    matches!(seg, "." | "./" | "%2E" | "%2E/" | "%2e" | "%2e/")
}

fn is_dot_dot(seg: &str) -> bool {
    let seg = seg.strip_suffix('/').unwrap_or(seg);
    let Some(first) = strip_dot(seg) else {
        return false;
    };
    matches!(strip_dot(first), Some("")) && !seg.is_empty()
}

fn strip_dot(seg: &str) -> Option<&str> {
    seg.strip_prefix('.')
        .or_else(|| seg.strip_prefix("%2E"))
        .or_else(|| seg.strip_prefix("%2e"))
}

/// Appends `path` to `buf` with dot segments removed.
///
/// `floor` is the length of the prefix of `buf` that compression must not
/// touch; `..` segments that would climb above it are dropped rather than
/// treated as errors. Percent-encoded dots count as dots so that the
/// output does not change on a second pass.
///
/// When `collapse_slashes` is set, empty segments (from `//` or converted
/// `\\`) are collapsed to a single slash.
pub(crate) fn remove_dot_segments(
    buf: &mut String,
    path: &str,
    floor: usize,
    collapse_slashes: bool,
) {
    debug_assert!(buf.len() >= floor);
    for seg in path.split_inclusive('/') {
        if collapse_slashes && seg == "/" && buf.ends_with('/') {
            continue;
        }
        if is_dot(seg) {
            truncate_to_slash(buf, floor);
        } else if is_dot_dot(seg) {
            // Drop the trailing slash, then the segment before it. A `..`
            // with nothing left to remove is dropped, never an error.
            if buf.len() > floor + 1 && buf.ends_with('/') {
                buf.pop();
            }
            truncate_to_slash(buf, floor);
        } else {
            buf.push_str(seg);
        }
    }
}

fn truncate_to_slash(buf: &mut String, floor: usize) {
    match buf[floor..].rfind('/') {
        Some(i) => buf.truncate(floor + i + 1),
        None => buf.truncate(floor),
    }
}

/// Compresses a rooted path in place of a fresh buffer.
///
/// Running this twice produces the same output as running it once.
pub(crate) fn compress(path: &str, floor_prefix: &str, collapse_slashes: bool) -> String {
    let mut buf = String::with_capacity(floor_prefix.len() + path.len());
    buf.push_str(floor_prefix);
    let floor = buf.len();
    remove_dot_segments(&mut buf, path, floor, collapse_slashes);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(path: &str) -> String {
        compress(path, "", false)
    }

    #[test]
    fn removes_dot_segments() {
        assert_eq!(c("/a/./b"), "/a/b");
        assert_eq!(c("/a/b/../c"), "/a/c");
        assert_eq!(c("/a/b/.."), "/a/");
        assert_eq!(c("/a/b/."), "/a/b/");
        assert_eq!(c("/./"), "/");
    }

    #[test]
    fn excess_dot_dot_clamped_at_root() {
        assert_eq!(c("/../../a"), "/a");
        assert_eq!(c("/.."), "/");
    }

    #[test]
    fn encoded_dots_count_as_dots() {
        assert_eq!(c("/a/%2E%2E/b"), "/b");
        assert_eq!(c("/a/.%2e/b"), "/b");
        assert_eq!(c("/a/%2E/b"), "/a/b");
    }

    #[test]
    fn floor_protects_drive_prefix() {
        assert_eq!(compress("/../../x", "/C:", false), "/C:/x");
    }

    #[test]
    fn collapses_double_slashes_when_asked() {
        assert_eq!(compress("/a//b", "", true), "/a/b");
        assert_eq!(compress("/a//b", "", false), "/a//b");
    }

    #[test]
    fn encoded_separators_decode_for_file_paths() {
        assert_eq!(unescape_separators("/a%2Fb%5Cc"), "/a/b/c");
        assert_eq!(unescape_separators("/a%20b"), "/a%20b");
        assert_eq!(unescape_separators("/a%"), "/a%");
    }

    #[test]
    fn idempotent() {
        for p in ["/a/../b/./c//d", "/..//../x/", "/%2E%2E/a"] {
            let once = c(p);
            assert_eq!(c(&once), once);
        }
    }
}
