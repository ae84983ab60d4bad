use serde::{Deserialize, Serialize};

use crate::simulation::SimulationResult;

/// What a sweep maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Profit,
    NoRngProfit,
    Experience,
    Kills,
}

impl Objective {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "profit" => Some(Self::Profit),
            "no_rng_profit" | "no-rng-profit" => Some(Self::NoRngProfit),
            "experience" | "exp" | "xp" => Some(Self::Experience),
            "kills" => Some(Self::Kills),
            _ => None,
        }
    }
}

/// Mean hourly rates of every successful run of one zone and tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedZoneResult {
    pub zone_hrid: String,
    pub difficulty_tier: u8,
    pub runs: usize,
    pub profit_per_hour: f64,
    pub no_rng_profit_per_hour: f64,
    pub experience_per_hour: f64,
    pub kills_per_hour: f64,
    pub deaths_per_hour: f64,
    pub score: f64,
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        values.sum::<f64>() / n as f64
    }
}

/// Collapses the replicas of one zone and tier. None when `results` is empty.
pub fn aggregate(results: &[SimulationResult], objective: Objective) -> Option<RankedZoneResult> {
    let first = results.first()?;
    let n = results.len();
    let mut ranked = RankedZoneResult {
        zone_hrid: first.zone_hrid.clone(),
        difficulty_tier: first.difficulty_tier,
        runs: n,
        profit_per_hour: mean(results.iter().map(|r| r.hourly.profit), n),
        no_rng_profit_per_hour: mean(results.iter().map(|r| r.hourly.no_rng_profit), n),
        experience_per_hour: mean(results.iter().map(|r| r.hourly.experience), n),
        kills_per_hour: mean(results.iter().map(|r| r.hourly.kills), n),
        deaths_per_hour: mean(results.iter().map(|r| r.hourly.deaths), n),
        score: 0.0,
    };
    ranked.score = match objective {
        Objective::Profit => ranked.profit_per_hour,
        Objective::NoRngProfit => ranked.no_rng_profit_per_hour,
        Objective::Experience => ranked.experience_per_hour,
        Objective::Kills => ranked.kills_per_hour,
    };
    Some(ranked)
}

/// Best first. Ties go to fewer deaths, then to the zone hrid for a stable order.
pub fn rank_results(mut ranked: Vec<RankedZoneResult>) -> Vec<RankedZoneResult> {
    ranked.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| left.deaths_per_hour.total_cmp(&right.deaths_per_hour))
            .then_with(|| left.zone_hrid.cmp(&right.zone_hrid))
            .then_with(|| left.difficulty_tier.cmp(&right.difficulty_tier))
    });
    ranked
}
