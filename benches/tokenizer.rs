//! Benchmarks for the line-grammar tokenizer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gedcom7::tokenizer::{Token, Tokenizer};

fn drain(content: &str) {
    let mut tokenizer = Tokenizer::new(content.chars());
    while !tokenizer.done() {
        tokenizer.next_token().unwrap();
    }
}

/// Benchmark tokenizing individual line shapes.
fn bench_tokenize_line_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize_line_shapes");

    let simple_line = "0 HEAD\n";
    group.bench_function("simple_tag", |b| b.iter(|| drain(black_box(simple_line))));

    let pointer_line = "0 @I1@ INDI\n";
    group.bench_function("with_pointer", |b| b.iter(|| drain(black_box(pointer_line))));

    let value_line = "1 NAME John /Doe/\n";
    group.bench_function("with_value", |b| b.iter(|| drain(black_box(value_line))));

    let long_value = format!("1 NOTE {}\n", "A".repeat(1000));
    group.bench_function("long_value", |b| b.iter(|| drain(black_box(&long_value))));

    let custom_tag_line = "1 _CUSTOM Some custom value\n";
    group.bench_function("custom_tag", |b| b.iter(|| drain(black_box(custom_tag_line))));

    group.finish();
}

/// Benchmark `take_line_value` across payload lengths.
fn bench_take_line_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("take_line_value");

    let long_note = format!("1 NOTE {}\n", "This is a long note. ".repeat(50));
    let values = [
        ("short", "1 NAME John\n"),
        ("medium", "1 NAME John Jacob Jingleheimer Schmidt\n"),
        ("long", long_note.as_str()),
    ];

    for (name, content) in values {
        group.bench_with_input(BenchmarkId::new("value_length", name), &content, |b, content| {
            b.iter(|| {
                let mut tokenizer = Tokenizer::new(black_box(content.chars()));
                tokenizer.next_token().unwrap(); // Level
                tokenizer.next_token().unwrap(); // Tag
                tokenizer.take_line_value().unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark token-kind extraction across a small multi-line document.
fn bench_token_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_extraction");

    let levels = "0 HEAD\n1 GEDC\n2 VERS 7.0\n3 FORM LINEAGE-LINKED\n";
    group.bench_function("extract_levels", |b| {
        b.iter(|| {
            let mut tokenizer = Tokenizer::new(black_box(levels.chars()));
            let mut count = 0;
            while !tokenizer.done() {
                tokenizer.next_token().unwrap();
                if matches!(tokenizer.current_token, Token::Level(_)) {
                    count += 1;
                }
            }
            count
        });
    });

    let pointers = "0 @I1@ INDI\n0 @I2@ INDI\n0 @F1@ FAM\n0 @S1@ SOUR\n";
    group.bench_function("extract_pointers", |b| {
        b.iter(|| {
            let mut tokenizer = Tokenizer::new(black_box(pointers.chars()));
            let mut count = 0;
            while !tokenizer.done() {
                tokenizer.next_token().unwrap();
                if matches!(tokenizer.current_token, Token::Pointer(_)) {
                    count += 1;
                }
            }
            count
        });
    });

    group.finish();
}

/// Benchmark tokenizing synthetic documents of varying size.
fn bench_tokenize_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize_synthetic");

    let sizes = [100, 500, 1000, 5000];
    for &line_count in &sizes {
        let content = generate_synthetic_lines(line_count);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", line_count), &content, |b, content| {
            b.iter(|| drain(black_box(content)));
        });
    }

    group.finish();
}

fn generate_synthetic_lines(line_count: usize) -> String {
    let mut content = String::with_capacity(line_count * 30);
    content.push_str("0 HEAD\n1 GEDC\n2 VERS 7.0\n");

    let mut current_line = 3;
    let mut individual_id = 1;
    while current_line < line_count - 1 {
        content.push_str(&format!("0 @I{individual_id}@ INDI\n"));
        current_line += 1;
        if current_line < line_count - 1 {
            content.push_str(&format!("1 NAME Person{individual_id} /Family/\n"));
            current_line += 1;
        }
        if current_line < line_count - 1 {
            content.push_str("1 SEX M\n");
            current_line += 1;
        }
        individual_id += 1;
    }

    content.push_str("0 TRLR\n");
    content
}

criterion_group!(
    benches,
    bench_tokenize_line_shapes,
    bench_take_line_value,
    bench_token_extraction,
    bench_tokenize_synthetic,
);

criterion_main!(benches);
