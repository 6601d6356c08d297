use std::{path::PathBuf, time::Duration};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vimsyn::{ConversionOptions, ScriptParserBuilder, VimRegexConverter};

const VIM_REGEXES: &[&str] = &[
    r"\<\d\+\>",
    r#"\\[nt\\"]"#,
    r"\%(\<\h\w*\)\@<=\s*(\ze",
    r"\v<(if|else|while)>",
    r"^\s*#\s*\%(define\|undef\)\>",
    r"\(['\x22]\)\%(\\.\|[^\\]\)\{-}\1",
];

fn main_script() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/main.vim"))
}

fn parser_benchmark(c: &mut Criterion) {
    let path = main_script();
    c.bench_function("parser_benchmark", |b| {
        b.iter(|| {
            black_box(
                ScriptParserBuilder::new()
                    .build(&path)
                    .unwrap()
                    .parse()
                    .unwrap(),
            );
        });
    });
}

fn verifying_parser_benchmark(c: &mut Criterion) {
    let path = main_script();
    c.bench_function("verifying_parser_benchmark", |b| {
        b.iter(|| {
            black_box(
                ScriptParserBuilder::new()
                    .verify_regexes(true)
                    .build(&path)
                    .unwrap()
                    .parse()
                    .unwrap(),
            );
        });
    });
}

fn converter_benchmark(c: &mut Criterion) {
    let converter = VimRegexConverter::new(ConversionOptions::default_multiline());
    c.bench_function("converter_benchmark", |b| {
        b.iter(|| {
            for regex in VIM_REGEXES {
                black_box(converter.convert(regex).unwrap());
            }
        });
    });
}

criterion_group! {
    name = benchesparser;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = parser_benchmark, verifying_parser_benchmark
}

criterion_group! {
    name = benchesconverter;
    config = Criterion::default();
    targets = converter_benchmark
}

criterion_main!(benchesparser, benchesconverter);
