use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sqlinject::{detect_sqli, tokenize, SqliFlags};

const CASES: &[(&str, &str)] = &[
    ("simple_select", "SELECT * FROM users WHERE id = 1"),
    ("union_injection", "1 UNION SELECT password FROM users"),
    ("boolean_injection", "1' OR '1'='1"),
    ("comment_injection", "admin'--"),
    ("time_based", "1' AND SLEEP(5)--"),
    ("hash_comment", "2022#hashtag"),
    ("plain_text", "the quick brown fox jumps over the lazy dog"),
];

fn bench_sqli_simple(c: &mut Criterion) {
    c.bench_function("sqli_detection", |b| {
        b.iter(|| {
            for (_, case) in CASES {
                let _ = black_box(detect_sqli(case.as_bytes()));
            }
        })
    });
}

fn bench_sqli_individual(c: &mut Criterion) {
    let mut group = c.benchmark_group("sqli_individual");
    for (name, input) in CASES {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(detect_sqli(black_box(input.as_bytes()))))
        });
    }
    group.finish();
}

fn bench_sqli_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("sqli_input_sizes");
    for size in [10usize, 100, 1000, 10_000] {
        let mut input = String::from("1' OR '1'='1");
        while input.len() < size {
            input.push_str(" AND col='val'");
        }
        input.truncate(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("size_{size}"), |b| {
            b.iter(|| black_box(detect_sqli(black_box(input.as_bytes()))))
        });
    }
    group.finish();
}

fn bench_tokenize(c: &mut Criterion) {
    let input = "SELECT a, b, c FROM t WHERE x = 'y' AND z IN (1, 2, 3) -- done".repeat(16);
    c.bench_function("tokenize_ansi", |b| {
        b.iter(|| tokenize(black_box(input.as_bytes()), SqliFlags::SQL_ANSI).count())
    });
}

criterion_group!(
    benches,
    bench_sqli_simple,
    bench_sqli_individual,
    bench_sqli_sizes,
    bench_tokenize
);
criterion_main!(benches);
