//! Encounter composition for random-spawn zones.

use crate::combat::Rng;
use crate::data::RandomSpawnInfo;

/// Picks the monsters of the next encounter. Implementations must draw only from `rng` so a
/// fixed seed reproduces the same sequence of encounters.
pub trait SpawnPolicy: Send + Sync {
    fn next_encounter(
        &self,
        info: &RandomSpawnInfo,
        encounter_index: u64,
        rng: &mut Rng,
    ) -> Vec<String>;
}

/// Default policy: every `battles_per_boss`-th encounter is the boss group; otherwise monsters
/// are drawn by spawn rate, one at a time, while their strength fits the remaining
/// `max_total_strength` budget and fewer than `max_spawn_count` are on the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrengthBudgetPolicy;

impl SpawnPolicy for StrengthBudgetPolicy {
    fn next_encounter(
        &self,
        info: &RandomSpawnInfo,
        encounter_index: u64,
        rng: &mut Rng,
    ) -> Vec<String> {
        if info.battles_per_boss > 0
            && !info.boss_spawns.is_empty()
            && (encounter_index + 1) % u64::from(info.battles_per_boss) == 0
        {
            return info.boss_spawns.clone();
        }

        let mut monsters = Vec::new();
        let mut budget = info.max_total_strength;
        while monsters.len() < info.max_spawn_count.max(1) as usize {
            let weights: Vec<f64> = info
                .spawns
                .iter()
                .map(|entry| {
                    if entry.strength <= budget {
                        entry.rate
                    } else {
                        0.0
                    }
                })
                .collect();
            let Some(idx) = rng.weighted_index(&weights) else {
                break;
            };
            let entry = &info.spawns[idx];
            budget = budget.saturating_sub(entry.strength);
            monsters.push(entry.monster_hrid.clone());
        }

        // A budget smaller than every strength still yields one monster.
        if monsters.is_empty() {
            let weights: Vec<f64> = info.spawns.iter().map(|entry| entry.rate).collect();
            if let Some(idx) = rng.weighted_index(&weights) {
                monsters.push(info.spawns[idx].monster_hrid.clone());
            }
        }
        monsters
    }
}

/// Always spawns the same fixed group. Useful for calibration against a known fight.
#[derive(Debug, Clone, Default)]
pub struct FixedGroupPolicy {
    pub monsters: Vec<String>,
}

impl SpawnPolicy for FixedGroupPolicy {
    fn next_encounter(&self, _: &RandomSpawnInfo, _: u64, _: &mut Rng) -> Vec<String> {
        self.monsters.clone()
    }
}
