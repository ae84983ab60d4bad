use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::data::{load_document, validate_reference_file, DataRegistry};
use crate::optimizer::{sweep_zones, Objective, SweepReport, SweepScenario};
use crate::parallel::{CancelToken, WorkerPool};
use crate::server;
use crate::simulation::{run_simulation, write_result_csv_file, SimulationInput, SimulationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Simulate,
    Sweep,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("simulate") => Some(Command::Simulate),
        Some("sweep") => Some(Command::Sweep),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let config = AppConfig::from_env();
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(&config),
        Some(Command::Simulate) => handle_simulate(args, &config),
        Some(Command::Sweep) => handle_sweep(args, &config),
        Some(Command::Validate) => handle_validate(args, &config),
        None => {
            eprintln!("usage: mwisim <serve|simulate|sweep|validate>");
            2
        }
    }
}

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 5] = ["--seed", "--csv", "--tier", "--replicas", "--objective"];

fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
        .collect()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    flag_values(args, flag).last().copied()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

/// Arguments after the subcommand that are neither flags nor flag values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(2) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
        } else if !arg.starts_with("--") {
            out.push(arg.as_str());
        }
    }
    out
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>, String> {
    match flag_value(args, flag) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("invalid {flag} '{raw}'")),
    }
}

fn load_registry(config: &AppConfig) -> Option<Arc<DataRegistry>> {
    match DataRegistry::load(&config.game_data_path, &config.market_path) {
        Ok(registry) => Some(registry),
        Err(err) => {
            eprintln!("failed to load reference data: {err}");
            None
        }
    }
}

fn load_input(path: &str) -> Option<SimulationInput> {
    match load_document::<SimulationInput>(path) {
        Ok(input) => Some(input),
        Err(err) => {
            eprintln!("failed to load simulation input: {err}");
            None
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, what: &str) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            1
        }
    }
}

fn handle_serve(config: &AppConfig) -> i32 {
    let Some(registry) = load_registry(config) else {
        return 1;
    };
    match server::run_server(&config.bind_addr, registry, WorkerPool::with_workers(config.workers)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn print_result_table(result: &SimulationResult) {
    println!("zone\ttier\tseed\tend_state\tencounters\tkills\tdeaths\texp_per_hour\tprofit_per_hour\tno_rng_profit_per_hour");
    println!(
        "{}\t{}\t{}\t{:?}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}",
        result.zone_hrid,
        result.difficulty_tier,
        result.seed,
        result.end_state,
        result.encounters,
        result.total_kills(),
        result.total_deaths(),
        result.hourly.experience,
        result.hourly.profit,
        result.hourly.no_rng_profit
    );
}

fn handle_simulate(args: &[String], config: &AppConfig) -> i32 {
    let Some(input_path) = positionals(args).first().copied() else {
        eprintln!("usage: mwisim simulate <input.json|yaml> [--seed N] [--csv path] [--table]");
        return 2;
    };
    let seed = match parse_flag::<u64>(args, "--seed") {
        Ok(seed) => seed,
        Err(msg) => {
            eprintln!("{msg}");
            return 2;
        }
    };
    let Some(mut input) = load_input(input_path) else {
        return 1;
    };
    if seed.is_some() {
        input.seed = seed;
    }
    let Some(registry) = load_registry(config) else {
        return 1;
    };

    let result = match run_simulation(
        &registry.game_data,
        &registry.prices,
        &input,
        &CancelToken::new(),
        |_| {},
    ) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            return 1;
        }
    };

    if let Some(csv_path) = flag_value(args, "--csv") {
        if let Err(err) = write_result_csv_file(&result, Path::new(csv_path)) {
            eprintln!("failed to write csv '{csv_path}': {err}");
            return 1;
        }
    }

    if has_flag(args, "--table") {
        print_result_table(&result);
        0
    } else {
        print_json(&result, "simulation result")
    }
}

fn print_sweep_table(report: &SweepReport) {
    println!("rank\tzone\ttier\truns\tscore\tprofit_per_hour\texp_per_hour\tdeaths_per_hour");
    for (rank, row) in report.ranked.iter().enumerate() {
        println!(
            "{}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
            rank + 1,
            row.zone_hrid,
            row.difficulty_tier,
            row.runs,
            row.score,
            row.profit_per_hour,
            row.experience_per_hour,
            row.deaths_per_hour
        );
    }
    for failure in &report.failures {
        eprintln!(
            "failed: {} tier {}: {}",
            failure.zone_hrid, failure.difficulty_tier, failure.message
        );
    }
}

fn sweep_scenario(args: &[String], base: SimulationInput) -> Result<SweepScenario, String> {
    let zones: Vec<String> = positionals(args).iter().skip(1).map(|z| z.to_string()).collect();
    let mut tiers = Vec::new();
    for raw in flag_values(args, "--tier") {
        tiers.push(raw.parse::<u8>().map_err(|_| format!("invalid --tier '{raw}'"))?);
    }
    if tiers.is_empty() {
        tiers.push(base.difficulty_tier);
    }
    let objective = match flag_value(args, "--objective") {
        None => Objective::default(),
        Some(raw) => Objective::parse(raw).ok_or_else(|| format!("unknown objective '{raw}'"))?,
    };
    Ok(SweepScenario {
        seed: parse_flag::<u64>(args, "--seed")?.or(base.seed).unwrap_or(0),
        replicas: parse_flag::<usize>(args, "--replicas")?.unwrap_or(1),
        base,
        zones,
        tiers,
        objective,
    })
}

fn handle_sweep(args: &[String], config: &AppConfig) -> i32 {
    let usage = "usage: mwisim sweep <input.json|yaml> <zone>... [--tier N]... [--replicas N] [--objective profit|no_rng_profit|experience|kills] [--seed N] [--table]";
    let positional = positionals(args);
    if positional.len() < 2 {
        eprintln!("{usage}");
        return 2;
    }
    let Some(base) = load_input(positional[0]) else {
        return 1;
    };
    let scenario = match sweep_scenario(args, base) {
        Ok(scenario) => scenario,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{usage}");
            return 2;
        }
    };
    let Some(registry) = load_registry(config) else {
        return 1;
    };

    let pool = WorkerPool::with_workers(config.workers);
    let report = match sweep_zones(&registry.game_data, &registry.prices, &scenario, &pool) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("sweep failed: {err}");
            return 1;
        }
    };

    if has_flag(args, "--table") {
        print_sweep_table(&report);
        0
    } else {
        print_json(&report, "sweep report")
    }
}

fn handle_validate(args: &[String], config: &AppConfig) -> i32 {
    let path = positionals(args)
        .first()
        .map(|p| Path::new(*p).to_path_buf())
        .unwrap_or_else(|| config.game_data_path.clone());

    match validate_reference_file(&path) {
        Ok(report) => {
            for diagnostic in &report.diagnostics {
                eprintln!("- {diagnostic}");
            }
            if report.has_errors() {
                eprintln!("validation failed: {} error(s)", report.error_count());
                1
            } else {
                println!("validation passed: {}", path.display());
                0
            }
        }
        Err(err) => {
            eprintln!("validation failed: {err}");
            1
        }
    }
}
