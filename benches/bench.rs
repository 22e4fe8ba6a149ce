use canon_uri::Uri;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_minimal", |b| {
        b.iter(|| Uri::parse(black_box("http://user@example.com:8080/a/b/c?q=1#f")).unwrap());
    });
    c.bench_function("parse_and_canonicalize", |b| {
        b.iter(|| {
            let uri = Uri::parse(black_box("HTTP://Example.COM/a/../b%2fc?q")).unwrap();
            uri.absolute_uri().map(str::len)
        });
    });
    c.bench_function("parse_dos_path", |b| {
        b.iter(|| Uri::parse(black_box("C:\\Program Files\\App\\binary.exe")).unwrap());
    });
}

fn bench_resolve(c: &mut Criterion) {
    let base = Uri::parse("http://a/b/c/d;p?q").unwrap();
    c.bench_function("resolve_relative", |b| {
        b.iter(|| base.resolve(black_box("../../g?x")).unwrap());
    });
}

criterion_group!(benches, bench_parse, bench_resolve);
criterion_main!(benches);
