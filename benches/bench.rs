use std::array;

use criterion::{
    criterion_group, criterion_main, AxisScale, BatchSize, BenchmarkId, Criterion,
    PlotConfiguration, Throughput,
};
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use drift_kdtree::*;

pub fn bench(c: &mut Criterion) {
    let mut rng = rand::rngs::SmallRng::from_seed([0xAB; 32]);

    let diagonal: Vec<[f64; 3]> = (0..1000).map(|i| [i as f64; 3]).collect();
    c.bench_function("insert 1000 diagonal points, balancing each time", |b| {
        b.iter(|| {
            let mut t = KdTree::<3, _>::with_capacity(diagonal.len());
            for p in &diagonal {
                t.insert(ByAddress(p));
                t.rebalance();
            }
            t
        });
    });

    let mut group = c.benchmark_group("insert clustered points and balance");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    for count in [100, 1_000, 10_000, 100_000] {
        let distr = Normal::new(0.0, 100.0).unwrap();
        let points: Vec<[f64; 2]> = (0..count)
            .map(|_| array::from_fn(|_| rng.sample(distr)))
            .collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &points, |b, points| {
            b.iter(|| {
                let mut t = KdTree::<2, _>::with_capacity(points.len());
                for p in points {
                    t.insert(ByAddress(p));
                }
                t.rebalance();
                t
            });
        });
    }
    group.finish();

    let mut group = c.benchmark_group("erase half of a balanced tree");
    for count in [1_000, 10_000] {
        let points: Vec<[f64; 2]> = (0..count)
            .map(|_| array::from_fn(|_| rng.gen_range(-1_000.0..1_000.0)))
            .collect();
        let mut full = KdTree::<2, _>::with_capacity(points.len());
        for p in &points {
            full.insert(ByAddress(p));
        }
        full.rebalance();
        group.throughput(Throughput::Elements(count as u64 / 2));
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter_batched(
                || full.clone(),
                |mut t| {
                    for p in points.iter().step_by(2) {
                        t.erase(ByAddress(p));
                    }
                    t
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench);
criterion_main!(benches);
