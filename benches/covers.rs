use criterion::{criterion_group, criterion_main, Criterion};
use dlx_life::Problem;

/// Domino tilings of a 2 x `width` board; the cover count grows like the
/// Fibonacci numbers, which makes the search tree deep enough to measure.
fn domino_options(width: usize) -> Vec<Vec<usize>> {
    let cell = |r: usize, c: usize| r * width + c;
    let mut options = Vec::new();
    for c in 0..width {
        options.push(vec![cell(0, c), cell(1, c)]);
    }
    for r in 0..2 {
        for c in 0..width - 1 {
            options.push(vec![cell(r, c), cell(r, c + 1)]);
        }
    }
    options
}

fn bench_covers(c: &mut Criterion) {
    let mut group = c.benchmark_group("dlx");

    group.bench_function("solve_all_dominoes_2x12", |b| {
        let options = domino_options(12);
        let mut problem = Problem::new(24, &options).unwrap();
        b.iter(|| problem.solve_all());
    });

    group.bench_function("solve_one_dominoes_2x12", |b| {
        let options = domino_options(12);
        let mut problem = Problem::new(24, &options).unwrap();
        b.iter(|| problem.solve_one());
    });

    group.bench_function("construct_dominoes_2x12", |b| {
        let options = domino_options(12);
        b.iter(|| Problem::new(24, &options).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_covers);
criterion_main!(benches);
