//! Batch distribution for independent simulation runs.

use rayon::prelude::*;

use crate::data::{PriceTable, ReferenceData};
use crate::parallel::pool::WorkerPool;
use crate::parallel::progress::{CancelToken, Progress};
use crate::simulation::{run_simulation, SimulationError, SimulationInput, SimulationResult};

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use mwisim::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// `count` copies of `input` seeded `base_seed`, `base_seed + 1`, ...
pub fn replicate_seeds(input: &SimulationInput, base_seed: u64, count: usize) -> Vec<SimulationInput> {
    (0..count as u64)
        .map(|offset| SimulationInput {
            seed: Some(base_seed.wrapping_add(offset)),
            ..input.clone()
        })
        .collect()
}

/// Runs every input on the pool. Results keep input order; `progress` advances once per
/// finished run.
pub fn run_simulation_batches(
    data: &ReferenceData,
    prices: &PriceTable,
    inputs: &[SimulationInput],
    pool: &WorkerPool,
    progress: &Progress,
    cancel: &CancelToken,
) -> Vec<Result<SimulationResult, SimulationError>> {
    pool.install(|| {
        inputs
            .par_iter()
            .map(|input| {
                let outcome = run_simulation(data, prices, input, cancel, |_| {});
                progress.advance();
                outcome
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{GlobalSettings, PlayerConfig};

    #[test]
    fn batch_ranges_even_split() {
        let r = batch_ranges(100, 4);
        assert_eq!(r, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
    }

    #[test]
    fn batch_ranges_with_remainder() {
        let r = batch_ranges(10, 3);
        assert_eq!(r, vec![(0, 4), (4, 7), (7, 10)]);
    }

    #[test]
    fn batch_ranges_more_batches_than_items() {
        let r = batch_ranges(3, 10);
        assert_eq!(r, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn batch_ranges_empty() {
        assert!(batch_ranges(0, 5).is_empty());
        assert!(batch_ranges(10, 0).is_empty());
    }

    #[test]
    fn replicas_get_consecutive_seeds() {
        let input = SimulationInput {
            players: vec![PlayerConfig::new("/players/a")],
            zone_hrid: "/zones/field".to_string(),
            difficulty_tier: 1,
            duration_hours: 2,
            settings: GlobalSettings::default(),
            seed: None,
        };
        let seeds: Vec<Option<u64>> = replicate_seeds(&input, 10, 3)
            .iter()
            .map(|i| i.seed)
            .collect();
        assert_eq!(seeds, vec![Some(10), Some(11), Some(12)]);
    }
}
