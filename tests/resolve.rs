use canon_uri::Uri;

#[track_caller]
fn check(base: &Uri, reference: &str, expected: &str) {
    let target = base.resolve(reference).unwrap();
    assert_eq!(
        target.absolute_uri(),
        Some(expected),
        "resolving {reference:?}"
    );
}

// The reference resolution examples of RFC 3986, section 5.4, except that
// an empty path canonicalizes to "/" for hosted schemes.
#[test]
fn rfc_normal_examples() {
    let base = Uri::parse("http://a/b/c/d;p?q").unwrap();

    check(&base, "g", "http://a/b/c/g");
    check(&base, "./g", "http://a/b/c/g");
    check(&base, "g/", "http://a/b/c/g/");
    check(&base, "/g", "http://a/g");
    check(&base, "//g", "http://g/");
    check(&base, "?y", "http://a/b/c/d;p?y");
    check(&base, "g?y", "http://a/b/c/g?y");
    check(&base, "#s", "http://a/b/c/d;p?q#s");
    check(&base, "g#s", "http://a/b/c/g#s");
    check(&base, "g?y#s", "http://a/b/c/g?y#s");
    check(&base, ";x", "http://a/b/c/;x");
    check(&base, "g;x", "http://a/b/c/g;x");
    check(&base, "g;x?y#s", "http://a/b/c/g;x?y#s");
    check(&base, "", "http://a/b/c/d;p?q");
    check(&base, ".", "http://a/b/c/");
    check(&base, "./", "http://a/b/c/");
    check(&base, "..", "http://a/b/");
    check(&base, "../", "http://a/b/");
    check(&base, "../g", "http://a/b/g");
    check(&base, "../..", "http://a/");
    check(&base, "../../", "http://a/");
    check(&base, "../../g", "http://a/g");
}

#[test]
fn rfc_abnormal_examples() {
    let base = Uri::parse("http://a/b/c/d;p?q").unwrap();

    check(&base, "../../../g", "http://a/g");
    check(&base, "../../../../g", "http://a/g");
    check(&base, "/./g", "http://a/g");
    check(&base, "/../g", "http://a/g");
    check(&base, "g.", "http://a/b/c/g.");
    check(&base, ".g", "http://a/b/c/.g");
    check(&base, "g..", "http://a/b/c/g..");
    check(&base, "..g", "http://a/b/c/..g");
    check(&base, "./../g", "http://a/b/g");
    check(&base, "./g/.", "http://a/b/c/g/");
    check(&base, "g/./h", "http://a/b/c/g/h");
    check(&base, "g/../h", "http://a/b/h");
    check(&base, "g;x=1/./y", "http://a/b/c/g;x=1/y");
    check(&base, "g;x=1/../y", "http://a/b/c/y");
    check(&base, "g?y/./x", "http://a/b/c/g?y/./x");
    check(&base, "g?y/../x", "http://a/b/c/g?y/../x");
    check(&base, "g#s/./x", "http://a/b/c/g#s/./x");
    check(&base, "g#s/../x", "http://a/b/c/g#s/../x");
}

#[test]
fn absolute_references_replace_the_base() {
    let base = Uri::parse("http://a/b/c/d;p?q").unwrap();
    check(&base, "ftp://other/x", "ftp://other/x");
    // An implicit filesystem path is an absolute reference.
    check(&base, "C:\\dir\\x", "file:///C:/dir/x");
    check(&base, "\\\\server\\share", "file://server/share");
}

#[test]
fn backslash_references_convert_for_web_schemes() {
    let base = Uri::parse("http://a/b/c/d;p?q").unwrap();
    check(&base, "\\g\\h", "http://a/g/h");
    check(&base, "g\\h", "http://a/b/c/g/h");
}

#[test]
fn file_base_keeps_its_drive() {
    let base = Uri::parse("file:///C:/dir/sub/leaf.txt").unwrap();
    check(&base, "other.txt", "file:///C:/dir/sub/other.txt");
    check(&base, "..\\x", "file:///C:/dir/x");
    check(&base, "../../../../x", "file:///C:/x");
}

#[test]
fn resolving_against_a_relative_base_fails() {
    let base = Uri::parse_kind("a/b", canon_uri::UriKind::Relative).unwrap();
    assert!(base.resolve("c").is_err());
    assert!(base.try_resolve("c").is_none());
}

#[test]
fn make_relative_inverts_resolve() {
    let cases = [
        ("http://h/a/b/c", "http://h/a/b/d"),
        ("http://h/a/b/c", "http://h/x/y"),
        ("http://h/a/", "http://h/a/b/c?q=1#f"),
        ("file:///C:/a/b", "file:///C:/a/c/d"),
    ];
    for (base, target) in cases {
        let base = Uri::parse(base).unwrap();
        let target = Uri::parse(target).unwrap();
        let rel = base.make_relative(&target).unwrap();
        assert_eq!(
            base.resolve(&rel).unwrap(),
            target,
            "{} -> {rel:?}",
            base.original_str()
        );
    }
}

#[test]
fn make_relative_across_origins_is_absolute() {
    let base = Uri::parse("http://h/a").unwrap();
    let target = Uri::parse("https://h/b").unwrap();
    assert_eq!(base.make_relative(&target).unwrap(), "https://h/b");
}
