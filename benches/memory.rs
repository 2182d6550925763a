//! Benchmarks for allocation patterns and dataset memory/lookup behavior.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gedcom7::GedcomBuilder;

/// Benchmark building and holding a typed dataset of varying size.
fn bench_build_and_hold(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_hold");

    let sizes = [10, 100, 500, 1000];
    for &count in &sizes {
        let content = generate_individuals(count);
        group.bench_with_input(BenchmarkId::new("individuals", count), &content, |b, content| {
            b.iter(|| {
                let report = GedcomBuilder::new().build_from_str(black_box(content)).unwrap();
                black_box(&report);
                report
            });
        });
    }

    group.finish();
}

/// Benchmark common small/medium/long string allocation shapes that appear throughout payload
/// parsing (tags, names, notes).
fn bench_string_allocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_allocations");

    let small_strings: Vec<&str> = vec!["HEAD", "INDI", "FAM", "SOUR", "NAME", "DATE", "PLAC"];
    group.bench_function("small_string_clone", |b| {
        b.iter(|| {
            for s in &small_strings {
                black_box(s.to_string());
            }
        });
    });

    let medium_strings: Vec<&str> = vec![
        "John Jacob Jingleheimer Schmidt",
        "New York City, New York, USA",
        "Marriage Certificate #12345",
    ];
    group.bench_function("medium_string_clone", |b| {
        b.iter(|| {
            for s in &medium_strings {
                black_box(s.to_string());
            }
        });
    });

    let long_string = "A".repeat(1000);
    group.bench_function("long_string_clone", |b| b.iter(|| black_box(long_string.clone())));

    group.finish();
}

/// Benchmark `by_xref_id` lookup cost against dataset size.
fn bench_xref_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("xref_lookup");

    let sizes = [10, 100, 1000];
    for &count in &sizes {
        let content = generate_individuals(count);
        let report = GedcomBuilder::new().build_from_str(&content).unwrap();
        let xrefs: Vec<String> = (1..=count.min(50)).map(|i| format!("I{i}")).collect();

        group.bench_with_input(BenchmarkId::new("individuals", count), &xrefs, |b, xrefs| {
            b.iter(|| {
                for xref in xrefs {
                    black_box(report.dataset.by_xref_id(black_box(xref)));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark round-trip memory/allocation cost: parse, serialize back to tag-layer text, parse
/// again.
fn bench_round_trip(c: &mut Criterion) {
    use gedcom7::dialect::Dialect;

    let mut group = c.benchmark_group("round_trip");

    let sizes = [10, 100, 500];
    for &count in &sizes {
        let content = generate_individuals(count);
        group.bench_with_input(BenchmarkId::new("individuals", count), &content, |b, content| {
            b.iter(|| {
                let report = GedcomBuilder::new().build_from_str(black_box(content)).unwrap();
                let mut dataset = report.dataset;
                let forest = dataset.to_forest();
                let text = gedcom7::tag::write::write(&forest, &Dialect::gedcom_7());
                let report2 = GedcomBuilder::new().build_from_str(&text).unwrap();
                black_box(report2)
            });
        });
    }

    group.finish();
}

fn generate_individuals(count: usize) -> String {
    let mut gedcom = String::with_capacity(count * 150);
    gedcom.push_str("0 HEAD\n1 GEDC\n2 VERS 7.0\n");

    for i in 1..=count {
        gedcom.push_str(&format!("0 @I{i}@ INDI\n"));
        gedcom.push_str(&format!("1 NAME Person{i} /Family{}/\n", i % 100));
        gedcom.push_str(if i % 2 == 0 { "1 SEX F\n" } else { "1 SEX M\n" });
        gedcom.push_str("1 BIRT\n");
        gedcom.push_str(&format!("2 DATE {} JAN {}\n", (i % 28) + 1, 1900 + (i % 100)));
    }

    gedcom.push_str("0 TRLR\n");
    gedcom
}

criterion_group!(
    benches,
    bench_build_and_hold,
    bench_string_allocations,
    bench_xref_lookup,
    bench_round_trip,
);

criterion_main!(benches);
