use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use webcore::{
    parse_content_header, parse_cookie_string, parse_multipart, parse_query_string,
    parse_url_encoded_form, ParseCache,
};

const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

fn multipart_body(fields: usize, file_size: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for i in 0..fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"field{}\"\r\n\r\nvalue {}\r\n",
                BOUNDARY, i, i
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"data.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            BOUNDARY
        )
        .as_bytes(),
    );
    body.extend(std::iter::repeat(b'x').take(file_size));
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_field_count_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("multipart_fields");

    for fields in [1, 10, 100, 500].iter() {
        let body = multipart_body(*fields, 16);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &body, |b, body| {
            b.iter(|| {
                let _ = parse_multipart(black_box(body), BOUNDARY, 1000).unwrap();
            });
        });
    }

    group.finish();
}

fn multipart_file_size_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("multipart_file_size");

    for size in [1024, 64 * 1024, 512 * 1024].iter() {
        let body = multipart_body(2, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| {
                let _ = parse_multipart(black_box(body), BOUNDARY, 1000).unwrap();
            });
        });
    }

    group.finish();
}

fn query_string_benchmark(c: &mut Criterion) {
    let query = "value=10&rating=10&is_active=True&animal=cat&animal=wolf&name=%E4%BD%A0%E5%A5%BD+world";

    c.bench_function("query_string_cached", |b| {
        b.iter(|| {
            let _ = parse_query_string(black_box(query));
        });
    });

    c.bench_function("query_string_unique", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let _ = parse_query_string(black_box(&format!("{}&n={}", query, i)));
        });
    });
}

fn cookie_and_header_benchmark(c: &mut Criterion) {
    let cookie = "sessionid=38afes7a8; csrftoken=\"abc\\054def\"; theme=dark; lang=zh-CN";
    let content_type = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW; charset=utf-8";

    c.bench_function("cookie_string", |b| {
        b.iter(|| {
            let _ = parse_cookie_string(black_box(cookie));
        });
    });

    c.bench_function("content_header", |b| {
        b.iter(|| {
            let _ = parse_content_header(black_box(content_type));
        });
    });

    c.bench_function("url_encoded_form", |b| {
        b.iter(|| {
            let _ = parse_url_encoded_form(black_box(b"a=1&b=2&b=3&c=hello+world"));
        });
    });
}

fn parse_cache_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_cache_hit");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let cache: ParseCache<String, usize> = ParseCache::from_capacity(size);
            for i in 0..size {
                cache.get_or_insert_with(format!("key{}", i), || i);
            }

            b.iter(|| {
                for i in 0..size {
                    let _ = cache.get_or_insert_with(black_box(format!("key{}", i)), || 0);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    multipart_field_count_benchmark,
    multipart_file_size_benchmark,
    query_string_benchmark,
    cookie_and_header_benchmark,
    parse_cache_benchmark
);
criterion_main!(benches);
