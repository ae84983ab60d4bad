//! Run the simulator benchmark and optionally append one line to a log file for trend tracking.
//!
//! Usage:
//!   cargo run --release --bin benchmark_simulator
//!   cargo run --release --bin benchmark_simulator -- --log
//!
//! Reads reference data from MWISIM_GAME_DATA / MWISIM_MARKET (defaults under data/) and the
//! party from data/sample_input.json.
//!
//! --log  Append one row to benchmark_log.csv (date, runs_per_sec, ticks_per_sec, sim_hours_per_sec, ticks_per_run).

use std::fs::OpenOptions;
use std::io::Write;
use std::time::Instant;

use mwisim::config::AppConfig;
use mwisim::data::{load_document, DataRegistry};
use mwisim::parallel::CancelToken;
use mwisim::simulation::{run_simulation, SimulationInput};

const SAMPLE_INPUT_PATH: &str = "data/sample_input.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log = std::env::args().any(|a| a == "--log");
    let config = AppConfig::from_env();
    let registry = DataRegistry::load(&config.game_data_path, &config.market_path)?;
    let base: SimulationInput = load_document(SAMPLE_INPUT_PATH)?;

    // Run for at least this long or this many simulations
    const MIN_DURATION_MS: u128 = 2000;
    const MIN_RUNS: u64 = 5;

    let cancel = CancelToken::new();
    let start = Instant::now();
    let mut runs: u64 = 0;
    let mut ticks: u64 = 0;
    let mut sim_hours = 0.0;
    while start.elapsed().as_millis() < MIN_DURATION_MS || runs < MIN_RUNS {
        let input = SimulationInput {
            seed: Some(runs),
            ..base.clone()
        };
        let result = run_simulation(&registry.game_data, &registry.prices, &input, &cancel, |_| {})?;
        ticks += result.ticks;
        sim_hours += result.simulated_hours();
        runs += 1;
    }
    let elapsed_secs = start.elapsed().as_secs_f64();

    let runs_per_sec = runs as f64 / elapsed_secs;
    let ticks_per_sec = ticks as f64 / elapsed_secs;
    let sim_hours_per_sec = sim_hours / elapsed_secs;
    let ticks_per_run = ticks / runs.max(1);

    println!("Simulator benchmark ({} in {}h):", base.zone_hrid, base.duration_hours);
    println!("  Runs:        {}", runs);
    println!("  Duration:    {:.2} s", elapsed_secs);
    println!("  Runs/s:      {:.2}", runs_per_sec);
    println!("  Ticks/s:     {:.0}", ticks_per_sec);
    println!("  Sim hours/s: {:.2}", sim_hours_per_sec);

    if log {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!(
            "{},{:.4},{:.4},{:.4},{}\n",
            date, runs_per_sec, ticks_per_sec, sim_hours_per_sec, ticks_per_run
        );
        let path = "benchmark_log.csv";
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
            file.write_all(b"date,runs_per_sec,ticks_per_sec,sim_hours_per_sec,ticks_per_run\n")?;
        }
        file.write_all(line.as_bytes())?;
        file.flush()?;
        println!("Appended to {}", path);
    }
    Ok(())
}
