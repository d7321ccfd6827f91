use criterion::{criterion_group, criterion_main, Criterion};
use eqv_engine::{check_equivalence, CheckOptions, SymbolicForm};
use std::hint::black_box;

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let options = CheckOptions::default();

    group.bench_function("parse_nested_fraction", |b| {
        b.iter(|| {
            black_box(SymbolicForm::parse(
                "\\frac{\\sqrt{x^2+1}}{\\frac{1}{2}x+\\sin{\\pi}}",
                &options,
            ))
        })
    });

    group.finish();
}

fn benchmark_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("verdict");

    group.bench_function("exact_text", |b| {
        b.iter(|| black_box(check_equivalence("$\\frac{1}{2}$", "\\frac{1}{2}")))
    });

    group.bench_function("numeric", |b| {
        b.iter(|| black_box(check_equivalence("0.5", "\\frac{1}{2}")))
    });

    group.bench_function("symbolic", |b| {
        b.iter(|| black_box(check_equivalence("x \\cdot 2 + 1", "1+2x")))
    });

    group.bench_function("algebraic_expand", |b| {
        b.iter(|| black_box(check_equivalence("(x+1)^5", "x^5+5x^4+10x^3+10x^2+5x+1")))
    });

    group.bench_function("algebraic_cancel", |b| {
        b.iter(|| black_box(check_equivalence("\\frac{x^3-1}{x-1}", "x^2+x+1")))
    });

    group.bench_function("incorrect_falls_through", |b| {
        b.iter(|| black_box(check_equivalence("(a+b)^4", "a^4+b^4")))
    });

    group.finish();
}

criterion_group!(benches, benchmark_parse, benchmark_strategies);
criterion_main!(benches);
