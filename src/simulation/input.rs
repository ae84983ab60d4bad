//! Run configuration: the party, the target zone and global settings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::combat::buffs::COMMUNITY_BUFF_MAX_TIER;
use crate::combat::{SkillLevels, TriggerCondition};
use crate::data::{EquipmentSlot, ReferenceData, MAX_DIFFICULTY_TIER};
use crate::simulation::error::SimulationError;

pub const MAX_PARTY_SIZE: usize = 3;
pub const MIN_DURATION_HOURS: u32 = 1;
pub const MAX_DURATION_HOURS: u32 = 48;
pub const MAX_FOOD_SLOTS: usize = 3;
pub const MAX_DRINK_SLOTS: usize = 3;
pub const MAX_ABILITY_SLOTS: usize = 5;
pub const MAX_ENHANCEMENT_LEVEL: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub moopass: bool,
    /// 0 disables the buff.
    pub community_experience_tier: u8,
    /// 0 disables the buff.
    pub community_drop_tier: u8,
    /// End the run at the first party wipe instead of respawning.
    pub stop_on_party_wipe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquippedItem {
    pub item_hrid: String,
    #[serde(default)]
    pub enhancement_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumableSlot {
    pub item_hrid: String,
    /// None falls back to the item's default trigger.
    #[serde(default)]
    pub triggers: Option<Vec<TriggerCondition>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilitySlotConfig {
    pub ability_hrid: String,
    #[serde(default = "default_ability_level")]
    pub level: u32,
    #[serde(default)]
    pub triggers: Option<Vec<TriggerCondition>>,
}

fn default_ability_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub hrid: String,
    #[serde(default)]
    pub levels: SkillLevels,
    #[serde(default)]
    pub equipment: BTreeMap<EquipmentSlot, EquippedItem>,
    #[serde(default)]
    pub food: Vec<ConsumableSlot>,
    #[serde(default)]
    pub drinks: Vec<ConsumableSlot>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlotConfig>,
    /// House room hrid to level.
    #[serde(default)]
    pub house_rooms: BTreeMap<String, u32>,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
}

impl PlayerConfig {
    pub fn new(hrid: impl Into<String>) -> Self {
        Self {
            hrid: hrid.into(),
            levels: SkillLevels::default(),
            equipment: BTreeMap::new(),
            food: Vec::new(),
            drinks: Vec::new(),
            abilities: Vec::new(),
            house_rooms: BTreeMap::new(),
            achievements: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub players: Vec<PlayerConfig>,
    pub zone_hrid: String,
    #[serde(default)]
    pub difficulty_tier: u8,
    pub duration_hours: u32,
    #[serde(default)]
    pub settings: GlobalSettings,
    /// Fixed seed for a reproducible run; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationInput {
    pub fn duration_ms(&self) -> u64 {
        u64::from(self.duration_hours) * 3_600_000
    }

    /// Checks everything that can be checked before the first tick.
    pub fn validate(&self, data: &ReferenceData) -> Result<(), SimulationError> {
        if self.players.is_empty() {
            return Err(SimulationError::configuration("party has no players"));
        }
        if self.players.len() > MAX_PARTY_SIZE {
            return Err(SimulationError::configuration(format!(
                "party has {} players, at most {MAX_PARTY_SIZE} allowed",
                self.players.len()
            )));
        }
        if !(MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(&self.duration_hours) {
            return Err(SimulationError::configuration(format!(
                "duration {}h outside [{MIN_DURATION_HOURS}, {MAX_DURATION_HOURS}]",
                self.duration_hours
            )));
        }
        if self.difficulty_tier > MAX_DIFFICULTY_TIER {
            return Err(SimulationError::configuration(format!(
                "difficulty tier {} outside [0, {MAX_DIFFICULTY_TIER}]",
                self.difficulty_tier
            )));
        }
        for (name, tier) in [
            ("community experience", self.settings.community_experience_tier),
            ("community drop", self.settings.community_drop_tier),
        ] {
            if tier > COMMUNITY_BUFF_MAX_TIER {
                return Err(SimulationError::configuration(format!(
                    "{name} tier {tier} outside [0, {COMMUNITY_BUFF_MAX_TIER}]"
                )));
            }
        }

        let zone = data.zone(&self.zone_hrid).ok_or_else(|| {
            SimulationError::configuration(format!("unknown zone '{}'", self.zone_hrid))
        })?;
        let has_spawns = zone
            .random_spawn
            .as_ref()
            .is_some_and(|spawn| spawn.spawns.iter().any(|entry| entry.rate > 0.0));
        let has_waves = zone
            .dungeon
            .as_ref()
            .is_some_and(|dungeon| dungeon.waves.iter().any(|wave| !wave.monsters.is_empty()));
        if !has_spawns && !has_waves {
            return Err(SimulationError::data_unavailable(format!(
                "zone '{}' has neither spawns nor waves",
                self.zone_hrid
            )));
        }
        for hrid in zone.monster_hrids() {
            if data.monster(hrid).is_none() {
                return Err(SimulationError::data_unavailable(format!(
                    "zone '{}' references unknown monster '{hrid}'",
                    self.zone_hrid
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for player in &self.players {
            if !seen.insert(player.hrid.as_str()) {
                return Err(SimulationError::configuration(format!(
                    "duplicate player '{}'",
                    player.hrid
                )));
            }
            validate_player(player, data)?;
        }
        Ok(())
    }
}

fn validate_player(player: &PlayerConfig, data: &ReferenceData) -> Result<(), SimulationError> {
    let who = &player.hrid;
    if player.food.len() > MAX_FOOD_SLOTS
        || player.drinks.len() > MAX_DRINK_SLOTS
        || player.abilities.len() > MAX_ABILITY_SLOTS
    {
        return Err(SimulationError::configuration(format!(
            "player '{who}' has too many slots (food {}, drinks {}, abilities {})",
            player.food.len(),
            player.drinks.len(),
            player.abilities.len()
        )));
    }

    for (slot, equipped) in &player.equipment {
        let equipment = data
            .item(&equipped.item_hrid)
            .and_then(|item| item.equipment.as_ref())
            .ok_or_else(|| {
                SimulationError::configuration(format!(
                    "player '{who}': '{}' is not a known equipment item",
                    equipped.item_hrid
                ))
            })?;
        if equipment.slot != *slot {
            return Err(SimulationError::configuration(format!(
                "player '{who}': '{}' does not fit slot {slot:?}",
                equipped.item_hrid
            )));
        }
        if equipped.enhancement_level > MAX_ENHANCEMENT_LEVEL {
            return Err(SimulationError::configuration(format!(
                "player '{who}': enhancement +{} above +{MAX_ENHANCEMENT_LEVEL}",
                equipped.enhancement_level
            )));
        }
    }
    if player.equipment.contains_key(&EquipmentSlot::MainHand)
        && player.equipment.contains_key(&EquipmentSlot::TwoHand)
    {
        return Err(SimulationError::configuration(format!(
            "player '{who}' wields both a main-hand and a two-hand weapon"
        )));
    }

    for (kind, slots) in [("food", &player.food), ("drink", &player.drinks)] {
        for slot in slots {
            let known = data
                .item(&slot.item_hrid)
                .and_then(|item| item.consumable.as_ref())
                .is_some();
            if !known {
                return Err(SimulationError::configuration(format!(
                    "player '{who}': unknown {kind} '{}'",
                    slot.item_hrid
                )));
            }
        }
    }

    for slot in &player.abilities {
        let ability = data.ability(&slot.ability_hrid).ok_or_else(|| {
            SimulationError::configuration(format!(
                "player '{who}': unknown ability '{}'",
                slot.ability_hrid
            ))
        })?;
        if ability.cooldown_ms == 0 {
            return Err(SimulationError::configuration(format!(
                "ability '{}' has no cooldown and would fire every tick",
                slot.ability_hrid
            )));
        }
        if slot.level == 0 {
            return Err(SimulationError::configuration(format!(
                "player '{who}': ability '{}' level must be at least 1",
                slot.ability_hrid
            )));
        }
    }

    for room in player.house_rooms.keys() {
        if data.house_room(room).is_none() {
            return Err(SimulationError::configuration(format!(
                "player '{who}': unknown house room '{room}'"
            )));
        }
    }
    Ok(())
}
