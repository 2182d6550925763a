//! Benchmarks for end-to-end GEDCOM parsing performance.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gedcom7::dialect::Dialect;
use gedcom7::tag::parse::parse as tag_parse;
use gedcom7::GedcomBuilder;

/// Benchmark the tag-layer-only parse (no typed resolution, no validation).
fn bench_parse_tag_layer(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_tag_layer");

    let sizes = [10, 100, 500, 1000];
    for &count in &sizes {
        let content = generate_synthetic_gedcom(count);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("individuals", count), &content, |b, content| {
            b.iter(|| tag_parse(black_box(content), &Dialect::gedcom_7()).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the full builder pipeline: tag parse, typed construction, validation.
fn bench_parse_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_builder");

    let sizes = [10, 100, 500, 1000];
    for &count in &sizes {
        let content = generate_synthetic_gedcom(count);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("individuals", count), &content, |b, content| {
            b.iter(|| GedcomBuilder::new().build_from_str(black_box(content)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the builder with references validated versus not.
fn bench_parse_with_and_without_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_validation_toggle");

    let content = generate_synthetic_gedcom(500);
    group.throughput(Throughput::Bytes(content.len() as u64));

    group.bench_with_input(BenchmarkId::new("validate_references", "on"), &content, |b, content| {
        b.iter(|| {
            GedcomBuilder::new()
                .validate_references(true)
                .build_from_str(black_box(content))
                .unwrap()
        });
    });

    group.bench_with_input(BenchmarkId::new("validate_references", "off"), &content, |b, content| {
        b.iter(|| {
            GedcomBuilder::new()
                .validate_references(false)
                .build_from_str(black_box(content))
                .unwrap()
        });
    });

    group.finish();
}

/// Benchmark parsing speed per line.
fn bench_parse_lines_per_second(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_lines_per_second");

    let sizes = [100, 1000, 5000];
    for &count in &sizes {
        let content = generate_synthetic_gedcom(count);
        let line_count = content.lines().count();
        group.throughput(Throughput::Elements(line_count as u64));
        group.bench_with_input(BenchmarkId::new("lines", count), &content, |b, content| {
            b.iter(|| GedcomBuilder::new().build_from_str(black_box(content)).unwrap());
        });
    }

    group.finish();
}

/// Generates synthetic GEDCOM 7 text with the given number of individuals plus a quarter as many
/// families, mirroring a realistic mix of record kinds.
fn generate_synthetic_gedcom(individual_count: usize) -> String {
    let mut gedcom = String::with_capacity(individual_count * 200);

    gedcom.push_str("0 HEAD\n1 GEDC\n2 VERS 7.0\n");

    for i in 1..=individual_count {
        gedcom.push_str(&format!("0 @I{i}@ INDI\n"));
        gedcom.push_str(&format!("1 NAME Person{i} /Family{}/\n", i % 100));
        gedcom.push_str(if i % 2 == 0 { "1 SEX F\n" } else { "1 SEX M\n" });
        gedcom.push_str("1 BIRT\n");
        gedcom.push_str(&format!("2 DATE {} JAN {}\n", (i % 28) + 1, 1900 + (i % 100)));
        gedcom.push_str(&format!("2 PLAC City{}, State{}, Country{}\n", i % 50, i % 10, i % 5));
    }

    let family_count = individual_count / 4;
    for i in 1..=family_count {
        let husb = i * 2 - 1;
        let wife = i * 2;
        gedcom.push_str(&format!("0 @F{i}@ FAM\n"));
        if husb <= individual_count {
            gedcom.push_str(&format!("1 HUSB @I{husb}@\n"));
        }
        if wife <= individual_count {
            gedcom.push_str(&format!("1 WIFE @I{wife}@\n"));
        }
        let child = individual_count / 2 + i;
        if child <= individual_count {
            gedcom.push_str(&format!("1 CHIL @I{child}@\n"));
        }
    }

    gedcom.push_str("0 TRLR\n");
    gedcom
}

criterion_group!(
    benches,
    bench_parse_tag_layer,
    bench_parse_builder,
    bench_parse_with_and_without_validation,
    bench_parse_lines_per_second,
);

criterion_main!(benches);
