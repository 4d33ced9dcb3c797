use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slimnet::http::orderedheaders::OrderedHeaderMap;
use slimnet::HeaderSet;

fn hop(status: &str, extra: &[(&str, &str)]) -> String {
    let mut blob = format!("{}\r\n", status);
    for (k, v) in [
        ("date", "Tue, 12 Oct 2021 08:00:00 GMT"),
        ("server", "nginx/1.21.3"),
        ("cache-control", "private, max-age=0"),
        ("set-cookie", "session=0123456789abcdef; Path=/; HttpOnly"),
        ("set-cookie", "tracking=fedcba9876543210; Path=/; Secure"),
    ]
    .iter()
    .chain(extra)
    {
        blob.push_str(&format!("{}: {}\r\n", k, v));
    }
    blob.push_str("\r\n");
    blob
}

fn benchmark_from_raw_single_hop(c: &mut Criterion) {
    let blob = hop(
        "HTTP/2 200 OK",
        &[("content-type", "text/html; charset=utf-8"), ("content-length", "51234")],
    );

    c.bench_function("headerset_from_raw_single_hop", |b| {
        b.iter(|| HeaderSet::from_raw(black_box(&blob)))
    });
}

fn benchmark_from_raw_redirect_chain(c: &mut Criterion) {
    let mut blob = String::new();
    for _ in 0..3 {
        blob.push_str(&hop(
            "HTTP/1.1 301 Moved Permanently",
            &[("location", "https://example.com/next")],
        ));
    }
    blob.push_str(&hop(
        "HTTP/1.1 200 OK",
        &[("content-type", "application/json"), ("x-final", "yes")],
    ));

    c.bench_function("headerset_from_raw_redirect_chain", |b| {
        b.iter(|| HeaderSet::from_raw(black_box(&blob)))
    });
}

fn benchmark_request_headers(c: &mut Criterion) {
    let pairs = [
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-GB,en;q=0.9"),
        ("Cache-Control", "max-age=0"),
        ("User-Agent", "curl/7.78.0"),
        ("X-Requested-With", "slimnet"),
    ];

    // Per-call cost: build from pairs, then convert for the wire.
    c.bench_function("ordered_headers_from_pairs", |b| {
        b.iter(|| {
            OrderedHeaderMap::from_pairs(black_box(&pairs))
                .unwrap()
                .to_header_map()
        })
    });
}

criterion_group!(
    benches,
    benchmark_from_raw_single_hop,
    benchmark_from_raw_redirect_chain,
    benchmark_request_headers
);
criterion_main!(benches);
