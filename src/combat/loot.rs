//! Loot resolution with two parallel tracks: a stochastic draw and its expected value.
//!
//! The expected ("no-RNG") track never rounds; callers accumulate it as f64 across the run.

use serde::{Deserialize, Serialize};

use crate::combat::rng::Rng;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTableEntry {
    pub item_hrid: String,
    pub drop_rate: f64,
    #[serde(default = "default_count")]
    pub min_count: u32,
    #[serde(default = "default_count")]
    pub max_count: u32,
    #[serde(default)]
    pub rare: bool,
}

fn default_count() -> u32 {
    1
}

impl DropTableEntry {
    pub fn base_quantity(&self) -> f64 {
        (f64::from(self.min_count) + f64::from(self.max_count)) / 2.0
    }
}

/// Loot-related stats of the player the drop is rolled for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootBonuses {
    pub drop_rate: f64,
    pub rare_find: f64,
    pub drop_quantity: f64,
    /// Difficulty-tier quantity scale.
    pub quantity_multiplier: f64,
}

impl Default for LootBonuses {
    fn default() -> Self {
        Self {
            drop_rate: 0.0,
            rare_find: 0.0,
            drop_quantity: 0.0,
            quantity_multiplier: 1.0,
        }
    }
}

impl LootBonuses {
    pub fn probability(&self, entry: &DropTableEntry) -> f64 {
        let mut p = entry.drop_rate.max(0.0) * (1.0 + self.drop_rate).max(0.0);
        if entry.rare {
            p *= (1.0 + self.rare_find).max(0.0);
        }
        p.min(1.0)
    }

    pub fn quantity_factor(&self) -> f64 {
        ((1.0 + self.drop_quantity) * self.quantity_multiplier).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropResult {
    pub item_hrid: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DropOutcome {
    pub stochastic: Vec<DropResult>,
    pub expected: Vec<DropResult>,
}

pub fn expected_quantity(entry: &DropTableEntry, bonuses: &LootBonuses) -> f64 {
    entry.base_quantity() * bonuses.probability(entry) * bonuses.quantity_factor()
}

/// Rolls one entry. Draw order: probability, count, fractional remainder.
fn roll_entry(entry: &DropTableEntry, bonuses: &LootBonuses, rng: &mut Rng) -> u64 {
    if !rng.chance(bonuses.probability(entry)) {
        return 0;
    }
    let low = entry.min_count.min(entry.max_count);
    let high = entry.min_count.max(entry.max_count);
    let scaled = f64::from(rng.range_inclusive(low, high)) * bonuses.quantity_factor();
    let whole = scaled.floor();
    let extra = u64::from(rng.chance(scaled - whole));
    whole as u64 + extra
}

/// Resolves a drop table. The expected track is always filled; the stochastic track only when
/// an RNG is supplied. Entries with zero quantity are omitted from both.
pub fn resolve_drops(
    table: &[DropTableEntry],
    bonuses: &LootBonuses,
    mut rng: Option<&mut Rng>,
) -> DropOutcome {
    let mut outcome = DropOutcome::default();
    for entry in table {
        let expected = expected_quantity(entry, bonuses);
        if expected > 0.0 {
            outcome.expected.push(DropResult {
                item_hrid: entry.item_hrid.clone(),
                quantity: expected,
            });
        }
        if let Some(rng) = rng.as_deref_mut() {
            let rolled = roll_entry(entry, bonuses, rng);
            if rolled > 0 {
                outcome.stochastic.push(DropResult {
                    item_hrid: entry.item_hrid.clone(),
                    quantity: rolled as f64,
                });
            }
        }
    }
    outcome
}
