mod common;

use std::fs;

use mwisim::data::load_document;
use mwisim::optimizer::{sweep_zones, sweep_zones_with_progress, Objective, SweepScenario};
use mwisim::parallel::{CancelToken, WorkerPool};
use mwisim::simulation::{
    run_simulation, write_result_csv, InMemoryRunHistory, PlayerConfig, RunHistory, RunRecord,
    RunState, SimulationError, SimulationInput,
};

fn run(input: &SimulationInput) -> Result<mwisim::simulation::SimulationResult, SimulationError> {
    let registry = common::registry();
    run_simulation(
        &registry.game_data,
        &registry.prices,
        input,
        &CancelToken::new(),
        |_| {},
    )
}

#[test]
fn sample_party_runs_the_full_hour() {
    let result = run(&common::sample_input()).expect("sample run should succeed");
    assert_eq!(result.end_state, RunState::TimeExhausted);
    assert_eq!(result.simulated_ms, 3_600_000);
    assert_eq!(result.ticks, 36_000);
    assert!(result.encounters > 0);
    assert!(result.total_kills() > 0);
    assert_eq!(result.players.len(), 2);
    assert!(result.profit.is_finite());
    assert!(result.no_rng_profit.is_finite());
}

#[test]
fn seeded_runs_are_reproducible() {
    let input = common::sample_input();
    let first = run(&input).expect("first run");
    let second = run(&input).expect("second run");
    assert_eq!(first, second);

    let reseeded = SimulationInput {
        seed: Some(43),
        ..input
    };
    assert_ne!(run(&reseeded).expect("reseeded run").kills, first.kills);
}

#[test]
fn every_rolled_drop_has_an_expected_track() {
    let result = run(&common::sample_input()).expect("sample run");
    assert!(!result.drops.is_empty());
    for (hrid, drop) in &result.drops {
        assert!(drop.no_rng_count > 0.0, "{hrid} has no expected quantity");
    }
}

#[test]
fn yaml_and_json_inputs_are_equivalent() {
    let input = common::sample_input();
    let path = std::env::temp_dir().join(format!("mwisim-input-{}.yaml", std::process::id()));
    let yaml = serde_yaml::to_string(&input).expect("input should serialize to yaml");
    fs::write(&path, yaml).expect("yaml fixture should be written");
    let reloaded: SimulationInput = load_document(&path).expect("yaml input should load");
    let _ = fs::remove_file(path);
    assert_eq!(reloaded, input);
}

#[test]
fn configuration_errors_fail_before_the_first_tick() {
    let base = common::sample_input();

    let too_many = SimulationInput {
        players: (0..4).map(|i| PlayerConfig::new(format!("/players/p{i}"))).collect(),
        ..base.clone()
    };
    let too_long = SimulationInput {
        duration_hours: 49,
        ..base.clone()
    };
    let unknown_zone = SimulationInput {
        zone_hrid: "/zones/nowhere".to_string(),
        ..base.clone()
    };
    let bad_tier = SimulationInput {
        difficulty_tier: 3,
        ..base
    };
    for input in [too_many, too_long, unknown_zone, bad_tier] {
        assert!(matches!(run(&input), Err(SimulationError::Configuration(_))));
    }
}

#[test]
fn harder_tiers_scale_experience() {
    let base = SimulationInput {
        players: vec![PlayerConfig::new("/players/solo")],
        ..common::sample_input()
    };
    let easy = run(&base).expect("tier 0");
    let hard = run(&SimulationInput {
        difficulty_tier: 2,
        ..base
    })
    .expect("tier 2");
    if easy.total_kills() > 0 && hard.total_kills() > 0 {
        let per_kill = |r: &mwisim::simulation::SimulationResult| {
            r.players[0].total_experience() / r.total_kills() as f64
        };
        assert!(per_kill(&hard) > per_kill(&easy));
    }
}

#[test]
fn dungeon_run_reports_wave_progress() {
    let input = SimulationInput {
        zone_hrid: "/zones/crypt".to_string(),
        ..common::sample_input()
    };
    let result = run(&input).expect("dungeon run");
    assert!(result.encounters > 0);
    assert!(result.max_wave_reached >= 1);
    assert!(result.dungeons_completed + result.dungeons_failed <= result.encounters);
}

#[test]
fn results_round_trip_through_history_and_csv() {
    let input = common::sample_input();
    let result = run(&input).expect("sample run");

    let history = InMemoryRunHistory::new();
    let run_id = history
        .save(RunRecord::new(input, result.clone()))
        .expect("record should save");
    let record = history.get(&run_id).expect("lookup").expect("record exists");
    assert_eq!(record.result, result);

    let mut csv = Vec::new();
    write_result_csv(&result, &mut csv).expect("csv export");
    let csv = String::from_utf8(csv).expect("utf-8 csv");
    assert!(csv.starts_with("section,hrid,count,no_rng_count,price,value,no_rng_value,per_hour"));
    assert!(csv.lines().any(|line| line.starts_with("drop,")));
}

#[test]
fn sweep_ranks_every_zone_best_first() {
    let registry = common::registry();
    let scenario = SweepScenario {
        base: common::sample_input(),
        zones: vec!["/zones/smelly_planet".to_string(), "/zones/swamp".to_string()],
        tiers: vec![0],
        objective: Objective::Profit,
        replicas: 2,
        seed: 5,
    };
    let report = sweep_zones(
        &registry.game_data,
        &registry.prices,
        &scenario,
        &WorkerPool::with_workers(2),
    )
    .expect("sweep should run");
    assert!(report.failures.is_empty());
    assert_eq!(report.ranked.len(), 2);
    assert!(report.ranked[0].score >= report.ranked[1].score);
    assert!(report.ranked.iter().all(|row| row.runs == 2));
}

#[test]
fn cancelling_mid_run_yields_no_partial_result() {
    let registry = common::registry();
    let cancel = CancelToken::new();
    let observer = cancel.clone();
    let mut last_fraction = 0.0;
    let outcome = run_simulation(
        &registry.game_data,
        &registry.prices,
        &common::sample_input(),
        &cancel,
        |fraction| {
            last_fraction = fraction;
            if fraction >= 0.5 {
                observer.cancel();
            }
        },
    );
    match outcome {
        Err(SimulationError::Cancelled { tick }) => {
            assert!(tick > 0);
            assert!(tick < 36_000);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert!(last_fraction >= 0.5 && last_fraction < 1.0);
}

#[test]
fn drinks_are_costed_at_ask() {
    let registry = common::registry();
    let result = run(&common::sample_input()).expect("sample run should succeed");

    let coffee = result
        .consumables
        .get("/items/power_coffee")
        .expect("power coffee should be drunk");
    assert!(coffee.count > 0);
    common::approx_eq(coffee.cost, coffee.count as f64 * 510.0, 1e-9);

    let drop_value: f64 = result
        .drops
        .iter()
        .map(|(hrid, drop)| drop.count * registry.prices.bid(hrid).unwrap_or(0.0))
        .sum();
    let costs: f64 = result
        .consumables
        .iter()
        .map(|(hrid, used)| used.count as f64 * registry.prices.ask(hrid).unwrap_or(0.0))
        .sum();
    common::approx_eq(result.consumable_costs, costs, 1e-6);
    common::approx_eq(result.profit, drop_value - costs, 1e-6);
}

#[test]
fn sweep_progress_reaches_every_run() {
    let registry = common::registry();
    let scenario = SweepScenario {
        base: common::sample_input(),
        zones: vec!["/zones/smelly_planet".to_string()],
        tiers: vec![0, 1],
        objective: Objective::Experience,
        replicas: 3,
        seed: 9,
    };
    let mut seen = Vec::new();
    sweep_zones_with_progress(
        &registry.game_data,
        &registry.prices,
        &scenario,
        &WorkerPool::with_workers(2),
        &CancelToken::new(),
        |done, total| seen.push((done, total)),
    )
    .expect("sweep should run");
    assert_eq!(seen.first(), Some(&(0, 6)));
    assert_eq!(seen.last(), Some(&(6, 6)));
    assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
}
