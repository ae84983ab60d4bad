//! Zone sweeps: the same party simulated across zones and difficulty tiers, then ranked.

pub mod ranking;

use serde::{Deserialize, Serialize};

use crate::data::{PriceTable, ReferenceData};
pub use ranking::{aggregate, rank_results, Objective, RankedZoneResult};

use crate::parallel::progress::{CancelToken, Progress};
use crate::parallel::{batch_ranges, replicate_seeds, run_simulation_batches, WorkerPool};
use crate::simulation::{SimulationError, SimulationInput, SimulationResult};

/// Number of progress-reporting batches for sweeps run as jobs.
const SWEEP_PROGRESS_BATCH_COUNT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepScenario {
    /// Party, duration and settings; its zone and tier are replaced per cell.
    pub base: SimulationInput,
    pub zones: Vec<String>,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<u8>,
    #[serde(default)]
    pub objective: Objective,
    /// Seeded runs per zone and tier.
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    #[serde(default)]
    pub seed: u64,
}

fn default_tiers() -> Vec<u8> {
    vec![0]
}

fn default_replicas() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub zone_hrid: String,
    pub difficulty_tier: u8,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub ranked: Vec<RankedZoneResult>,
    pub failures: Vec<SweepFailure>,
}

impl SweepScenario {
    /// Every (zone, tier) cell expanded into its seeded replicas, cell-major.
    pub fn expand(&self) -> Vec<SimulationInput> {
        let mut inputs = Vec::new();
        for zone in &self.zones {
            for &tier in &self.tiers {
                let cell = SimulationInput {
                    zone_hrid: zone.clone(),
                    difficulty_tier: tier,
                    ..self.base.clone()
                };
                inputs.extend(replicate_seeds(&cell, self.seed, self.replicas.max(1)));
            }
        }
        inputs
    }
}

fn collect_report(
    scenario: &SweepScenario,
    inputs: &[SimulationInput],
    outcomes: Vec<Result<SimulationResult, SimulationError>>,
) -> Result<SweepReport, SimulationError> {
    let replicas = scenario.replicas.max(1);
    let mut report = SweepReport::default();
    for (cell_inputs, cell_outcomes) in inputs.chunks(replicas).zip(outcomes.chunks(replicas)) {
        let mut successes = Vec::new();
        for (input, outcome) in cell_inputs.iter().zip(cell_outcomes) {
            match outcome {
                Ok(result) => successes.push(result.clone()),
                Err(err) if err.is_cancelled() => return Err(err.clone()),
                Err(err) => {
                    log::warn!("sweep cell {} tier {} failed: {err}", input.zone_hrid, input.difficulty_tier);
                    report.failures.push(SweepFailure {
                        zone_hrid: input.zone_hrid.clone(),
                        difficulty_tier: input.difficulty_tier,
                        message: err.to_string(),
                    });
                }
            }
        }
        if let Some(ranked) = aggregate(&successes, scenario.objective) {
            report.ranked.push(ranked);
        }
    }
    report.ranked = rank_results(report.ranked);
    Ok(report)
}

/// Runs the whole sweep in parallel and ranks the zones.
pub fn sweep_zones(
    data: &ReferenceData,
    prices: &PriceTable,
    scenario: &SweepScenario,
    pool: &WorkerPool,
) -> Result<SweepReport, SimulationError> {
    sweep_zones_with_progress(data, prices, scenario, pool, &CancelToken::new(), |_, _| {})
}

/// Like [sweep_zones] but runs in batches and invokes `on_progress(done, total)` runs.
pub fn sweep_zones_with_progress<F>(
    data: &ReferenceData,
    prices: &PriceTable,
    scenario: &SweepScenario,
    pool: &WorkerPool,
    cancel: &CancelToken,
    mut on_progress: F,
) -> Result<SweepReport, SimulationError>
where
    F: FnMut(usize, usize),
{
    let inputs = scenario.expand();
    let total = inputs.len();
    if total == 0 {
        return Ok(SweepReport::default());
    }
    log::info!(
        "sweeping {} zone(s) x {} tier(s) x {} replica(s)",
        scenario.zones.len(),
        scenario.tiers.len(),
        scenario.replicas.max(1)
    );
    on_progress(0, total);

    let progress = Progress::new(total);
    let mut outcomes = Vec::with_capacity(total);
    for (start, end) in batch_ranges(total, SWEEP_PROGRESS_BATCH_COUNT) {
        if cancel.is_cancelled() {
            return Err(SimulationError::Cancelled { tick: 0 });
        }
        outcomes.extend(run_simulation_batches(
            data,
            prices,
            &inputs[start..end],
            pool,
            &progress,
            cancel,
        ));
        on_progress(progress.done(), total);
    }
    collect_report(scenario, &inputs, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{GlobalSettings, PlayerConfig};

    #[test]
    fn expand_covers_every_cell_and_replica() {
        let scenario = SweepScenario {
            base: SimulationInput {
                players: vec![PlayerConfig::new("/players/a")],
                zone_hrid: String::new(),
                difficulty_tier: 0,
                duration_hours: 1,
                settings: GlobalSettings::default(),
                seed: None,
            },
            zones: vec!["/zones/a".to_string(), "/zones/b".to_string()],
            tiers: vec![0, 2],
            objective: Objective::Profit,
            replicas: 3,
            seed: 100,
        };
        let inputs = scenario.expand();
        assert_eq!(inputs.len(), 12);
        assert_eq!(inputs[0].zone_hrid, "/zones/a");
        assert_eq!(inputs[3].difficulty_tier, 2);
        assert_eq!(inputs[5].seed, Some(102));
        assert_eq!(inputs[6].zone_hrid, "/zones/b");
    }
}
