use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use valiter::dynamic::{
    random_tabular_mdp, Cell, DeterministicGridAdapter, GridWorld, ValueIteration,
    ValueIterationConfig,
};

fn bench_random_mdp(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_mdp");
    for &states in &[100usize, 1_000] {
        let mdp = random_tabular_mdp(states, 4, 5, 42).unwrap();
        for parallel in [false, true] {
            let config = ValueIterationConfig::new(10_000, 0.95, 1e-6)
                .with_validation(false)
                .with_parallel(parallel);
            let solver = ValueIteration::new(config).unwrap();
            let label = if parallel { "parallel" } else { "serial" };
            group.bench_with_input(BenchmarkId::new(label, states), &mdp, |b, mdp| {
                b.iter(|| solver.run(black_box(mdp)).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_grid_world(c: &mut Criterion) {
    let grid = GridWorld::new(32, 32, -1.0)
        .with_terminal(Cell::new(31, 31))
        .unwrap();
    let env = DeterministicGridAdapter::new::<f64>(&grid);
    let solver = ValueIteration::new(ValueIterationConfig::new(10_000, 1.0, 1e-6).with_validation(false))
        .unwrap();

    c.bench_function("grid_world_32x32", |b| {
        b.iter(|| solver.run(black_box(&env)).unwrap())
    });
}

criterion_group!(benches, bench_random_mdp, bench_grid_world);
criterion_main!(benches);
