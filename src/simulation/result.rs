//! Run aggregates. Counters only grow during the run; prices, values, profit and hourly rates
//! are filled once by [SimulationResult::finalize].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::Skill;
use crate::data::PriceTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    PartyWiped,
    DungeonFailed,
    DungeonComplete,
    TimeExhausted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropRecord {
    /// Stochastic track.
    pub count: f64,
    /// Expected-value track, never rounded.
    pub no_rng_count: f64,
    pub price: f64,
    pub value: f64,
    pub no_rng_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumableRecord {
    pub count: u64,
    pub price: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub hrid: String,
    pub level_gap_debuff: f64,
    pub deaths: u64,
    pub experience: BTreeMap<Skill, f64>,
    pub attacks: u64,
    pub hits: u64,
    pub crits: u64,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub healing_done: f64,
    pub mana_used: f64,
    pub ability_casts: BTreeMap<String, u64>,
    pub consumables_used: BTreeMap<String, u64>,
}

impl PlayerSummary {
    pub fn new(hrid: impl Into<String>, level_gap_debuff: f64) -> Self {
        Self {
            hrid: hrid.into(),
            level_gap_debuff,
            ..Self::default()
        }
    }

    pub fn total_experience(&self) -> f64 {
        self.experience.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyRates {
    pub encounters: f64,
    pub kills: f64,
    pub deaths: f64,
    pub experience: f64,
    pub profit: f64,
    pub no_rng_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub zone_hrid: String,
    pub difficulty_tier: u8,
    pub seed: u64,
    pub end_state: RunState,
    pub simulated_ms: u64,
    pub ticks: u64,
    pub encounters: u64,
    pub kills: BTreeMap<String, u64>,
    pub deaths: BTreeMap<String, u64>,
    pub party_wipes: u64,
    pub players: Vec<PlayerSummary>,
    pub drops: BTreeMap<String, DropRecord>,
    pub consumables: BTreeMap<String, ConsumableRecord>,
    pub consumable_costs: f64,
    pub profit: f64,
    pub no_rng_profit: f64,
    pub mana_ran_out: bool,
    pub dungeons_completed: u64,
    pub dungeons_failed: u64,
    pub max_wave_reached: u32,
    pub hourly: HourlyRates,
}

impl SimulationResult {
    pub fn new(zone_hrid: impl Into<String>, difficulty_tier: u8, seed: u64) -> Self {
        Self {
            zone_hrid: zone_hrid.into(),
            difficulty_tier,
            seed,
            end_state: RunState::Running,
            simulated_ms: 0,
            ticks: 0,
            encounters: 0,
            kills: BTreeMap::new(),
            deaths: BTreeMap::new(),
            party_wipes: 0,
            players: Vec::new(),
            drops: BTreeMap::new(),
            consumables: BTreeMap::new(),
            consumable_costs: 0.0,
            profit: 0.0,
            no_rng_profit: 0.0,
            mana_ran_out: false,
            dungeons_completed: 0,
            dungeons_failed: 0,
            max_wave_reached: 0,
            hourly: HourlyRates::default(),
        }
    }

    pub fn total_kills(&self) -> u64 {
        self.kills.values().sum()
    }

    pub fn total_deaths(&self) -> u64 {
        self.deaths.values().sum()
    }

    pub fn record_drop(&mut self, item_hrid: &str, count: f64, no_rng_count: f64) {
        let record = self.drops.entry(item_hrid.to_string()).or_default();
        record.count += count;
        record.no_rng_count += no_rng_count;
    }

    pub fn record_consumable(&mut self, item_hrid: &str) {
        self.consumables
            .entry(item_hrid.to_string())
            .or_default()
            .count += 1;
    }

    pub fn simulated_hours(&self) -> f64 {
        self.simulated_ms as f64 / 3_600_000.0
    }

    /// Prices drops at the bid and consumables at the ask, then derives profit and rates.
    /// Missing prices count as zero and are logged once per item.
    pub fn finalize(&mut self, prices: &PriceTable) {
        let mut total_value = 0.0;
        let mut total_no_rng_value = 0.0;
        for (item_hrid, record) in &mut self.drops {
            record.price = prices.bid(item_hrid).unwrap_or_else(|| {
                log::warn!("no market bid for dropped item '{item_hrid}', valuing at 0");
                0.0
            });
            record.value = record.count * record.price;
            record.no_rng_value = record.no_rng_count * record.price;
            total_value += record.value;
            total_no_rng_value += record.no_rng_value;
        }

        let mut costs = 0.0;
        for (item_hrid, record) in &mut self.consumables {
            record.price = prices.ask(item_hrid).unwrap_or_else(|| {
                log::warn!("no market ask for consumable '{item_hrid}', costing at 0");
                0.0
            });
            record.cost = record.count as f64 * record.price;
            costs += record.cost;
        }
        self.consumable_costs = costs;
        self.profit = total_value - costs;
        self.no_rng_profit = total_no_rng_value - costs;

        let hours = self.simulated_hours();
        if hours > 0.0 {
            let experience: f64 = self.players.iter().map(PlayerSummary::total_experience).sum();
            self.hourly = HourlyRates {
                encounters: self.encounters as f64 / hours,
                kills: self.total_kills() as f64 / hours,
                deaths: self.total_deaths() as f64 / hours,
                experience: experience / hours,
                profit: self.profit / hours,
                no_rng_profit: self.no_rng_profit / hours,
            };
        }
    }
}
