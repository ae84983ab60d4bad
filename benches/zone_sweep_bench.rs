//! Compare single-threaded vs parallel zone sweeps.
//!
//! Run with: `cargo bench --bench zone_sweep`
//! Or quick comparison: `cargo run --bin benchmark_parallel_speedup` (see src/bin)

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mwisim::data::{load_document, DataRegistry};
use mwisim::optimizer::{sweep_zones, Objective, SweepScenario};
use mwisim::parallel::WorkerPool;
use mwisim::simulation::SimulationInput;

fn bench_sweep_sequential_vs_parallel(c: &mut Criterion) {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let registry = DataRegistry::load(root.join("game_data.json"), root.join("market.json"))
        .expect("fixture data should load");
    let base: SimulationInput =
        load_document(root.join("sample_input.json")).expect("sample input should load");
    let scenario = SweepScenario {
        zones: registry.zones().into_iter().map(|zone| zone.hrid).collect(),
        tiers: vec![0, 1],
        objective: Objective::Profit,
        replicas: 2,
        seed: 42,
        base,
    };

    let mut group = c.benchmark_group("zone_sweep");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(20));

    for (name, pool) in [
        ("sequential", WorkerPool::with_workers(1)),
        ("parallel", WorkerPool::default_workers()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                black_box(sweep_zones(
                    &registry.game_data,
                    &registry.prices,
                    &scenario,
                    &pool,
                ))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sweep_sequential_vs_parallel);
criterion_main!(benches);
