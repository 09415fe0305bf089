//! Benchmarks for routing and fitness evaluation.
//!
//! Measures single A* queries on open and obstructed sites of increasing size,
//! and one full standard evaluation of a randomized arrangement.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use siteplan::{find_path, Builder, Cell, EntitySpec, FitnessConfig, GridModel, SiteConfig, StructureKind};

/// Square site with a comb of interior walls, each with a gap at alternating ends.
fn comb(size: u32) -> GridModel {
    let mut grid = GridModel::new(size, size).unwrap();
    let n = size as i32;
    for (i, x) in (3..n).step_by(4).enumerate() {
        let gap = if i % 2 == 0 { n } else { 1 };
        for y in (1..=n).filter(|&y| y != gap) {
            grid.add_structure(Cell::new(x, y), StructureKind::Wall).unwrap();
        }
    }
    grid
}

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");

    for &size in &[16u32, 32, 64] {
        let open = GridModel::new(size, size).unwrap();
        let walled = comb(size);
        let goal = Cell::new(size as i32, size as i32);

        for (label, grid) in [("open", &open), ("comb", &walled)] {
            for aisle in [1u32, 2] {
                group.bench_with_input(
                    BenchmarkId::new(format!("{label}_aisle{aisle}"), size),
                    grid,
                    |b, g| b.iter(|| find_path(black_box(Cell::new(1, 1)), black_box(goal), g, aisle)),
                );
            }
        }
    }
    group.finish();
}

fn bench_standard_fitness(c: &mut Criterion) {
    let mut group = c.benchmark_group("fitness_standard");
    group.sample_size(20);

    for &racks in &[4usize, 12] {
        let mut site = SiteConfig::new(30, 20)
            .with_entity(EntitySpec::new("storage", "rack").with_quantity(racks as u32))
            .with_entity(EntitySpec::new("shipping", "dock").with_footprint(2, 2));
        for i in 0..racks {
            site = site.with_operation(i, racks, 1 + i as i64 % 3);
        }
        let mut layout = site.build().unwrap();
        Builder::default().randomize(&mut layout, &mut StdRng::seed_from_u64(1));
        let fitness = FitnessConfig::default();

        group.bench_with_input(BenchmarkId::new("racks", racks), &layout, |b, l| {
            b.iter(|| black_box(fitness.evaluate(l)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find_path, bench_standard_fitness);
criterion_main!(benches);
