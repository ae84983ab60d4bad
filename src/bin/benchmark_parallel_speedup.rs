//! Run a zone sweep once on one thread and once on every core, then print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup
//!
//! Run from the project root so data/ is available.

use std::time::Instant;

use mwisim::config::AppConfig;
use mwisim::data::{load_document, DataRegistry};
use mwisim::optimizer::{sweep_zones, Objective, SweepScenario};
use mwisim::parallel::WorkerPool;
use mwisim::simulation::SimulationInput;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    let registry = DataRegistry::load(&config.game_data_path, &config.market_path)?;
    let base: SimulationInput = load_document("data/sample_input.json")?;

    let scenario = SweepScenario {
        zones: registry.zones().into_iter().map(|zone| zone.hrid).collect(),
        tiers: vec![0, 1, 2],
        objective: Objective::Profit,
        replicas: 4,
        seed: 12345,
        base,
    };
    let n = scenario.expand().len();
    println!(
        "Zone sweep: {} zones x {} tiers x {} replicas = {} runs",
        scenario.zones.len(),
        scenario.tiers.len(),
        scenario.replicas,
        n
    );
    println!();

    // Sequential
    let t0 = Instant::now();
    let report_seq = sweep_zones(
        &registry.game_data,
        &registry.prices,
        &scenario,
        &WorkerPool::with_workers(1),
    )?;
    let elapsed_seq = t0.elapsed();
    let seq_ms = elapsed_seq.as_secs_f64() * 1000.0;
    println!("Sequential:  {:.2} ms  ({:.1} runs/s)", seq_ms, n as f64 / elapsed_seq.as_secs_f64());

    // Parallel
    let t0 = Instant::now();
    let pool = WorkerPool::with_workers(config.workers);
    let report_par = sweep_zones(&registry.game_data, &registry.prices, &scenario, &pool)?;
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!("Parallel:    {:.2} ms  ({:.1} runs/s)", par_ms, n as f64 / elapsed_par.as_secs_f64());

    println!();
    println!("Speedup:     {:.2}x faster (parallel vs sequential)", seq_ms / par_ms);

    if report_seq != report_par {
        return Err("sequential and parallel sweeps disagree".into());
    }
    println!("(Results match sequential vs parallel)");
    Ok(())
}
