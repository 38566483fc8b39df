use std::fmt::Write as _;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use csv_weaver::{
    distribution::analyze,
    parser::parse,
    pipeline::{self, PipelineOptions},
    sql::SqlLayout,
    transform::{TransformMode, transform},
};

fn generate_people(rows: usize) -> String {
    let mut text = String::from("name.full,age,address.city,address.zip,team,score,notes.source\n");
    for i in 0..rows {
        let team = match i % 3 {
            0 => "blue",
            1 => "red",
            _ => "green",
        };
        let age = 18 + (i * 7) % 70;
        let score = (i * 13) % 100;
        let _ = writeln!(
            text,
            "Person {i},{age},City {},{},{team},{score},import-{}",
            i % 40,
            1000 + i % 9000,
            i % 5
        );
    }
    text
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");
    for rows in [1_000usize, 10_000] {
        let text = generate_people(rows);
        for layout in [SqlLayout::Users, SqlLayout::Flexible] {
            let options = PipelineOptions {
                sql_layout: layout,
                ..PipelineOptions::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{layout:?}"), rows),
                &text,
                |b, text| {
                    b.iter(|| pipeline::prepare(black_box(text), &options).expect("prepare"));
                },
            );
        }
    }
    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let text = generate_people(10_000);
    let parsed = parse(&text).expect("parse");
    let records = transform(&parsed.records, TransformMode::Lenient).expect("transform");
    let mut group = c.benchmark_group("analyze");
    for column in ["age", "score", "address.zip"] {
        group.bench_function(column, |b| {
            b.iter(|| analyze(black_box(&records), column));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_prepare, bench_analyze);
criterion_main!(benches);
