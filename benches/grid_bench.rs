// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

use criterion::{criterion_group, criterion_main, Criterion};
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;

use volray::field::FnField;
use volray::grid::Grid;
use volray::math::{point, Position};

fn random_points(count: usize) -> Vec<Position> {
    // Spill slightly past the grid bounds so the out-of-bounds path is
    // represented.
    let mut rng = Xoshiro256Plus::seed_from_u64(0x7de85);
    (0..count)
        .map(|_| {
            point(
                rng.gen_range(-0.6..0.6),
                rng.gen_range(-0.6..0.6),
                rng.gen_range(-0.6..0.6),
            )
        })
        .collect()
}

pub fn sampling_bench(c: &mut Criterion) {
    let points = random_points(10_000);

    let scalar = Grid::filled(&[100, 100, 100], 1.0).unwrap();
    c.bench_function("grid_sample_scalar_10k", |b| b.iter(|| scalar.sample(&points)));

    let vector = Grid::filled(&[100, 100, 100, 3], 1.0).unwrap();
    c.bench_function("grid_sample_vector_10k", |b| b.iter(|| vector.sample(&points)));
}

pub fn stamp_bench(c: &mut Criterion) {
    let field = FnField(|p: Position| (45.0 * p.x).sin() * (45.0 * p.y).sin() + p.z);
    c.bench_function("grid_stamp_64", |b| {
        b.iter(|| {
            let mut grid = Grid::filled(&[64, 64, 64], 0.0).unwrap();
            grid.stamp(&field).unwrap();
            grid
        })
    });
}

criterion_group!(benches, sampling_bench, stamp_bench);
criterion_main!(benches);
