//! Static game definitions consumed read-only by the engine: monsters, zones, items,
//! abilities, house rooms and achievement tiers, keyed by hrid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::stats::{
    BASE_CRIT_MULTIPLIER, BASE_THREAT, MIN_ATTACK_INTERVAL_MS, UNARMED_ATTACK_INTERVAL_MS,
};
use crate::combat::{
    AbilityEffect, Buff, BuffType, CombatStats, CombatStyle, DamageType, DropTableEntry,
    WeaponProfile,
};

pub const COIN_HRID: &str = "/items/coin";
pub const MAX_DIFFICULTY_TIER: u8 = 2;

/// Scale applied to monster stats, experience and drop quantity for a difficulty tier.
pub fn difficulty_multiplier(tier: u8) -> f64 {
    1.0 + 0.5 * f64::from(tier.min(MAX_DIFFICULTY_TIER))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub data_version: Option<String>,
    #[serde(default)]
    pub monsters: BTreeMap<String, MonsterDetail>,
    #[serde(default)]
    pub zones: BTreeMap<String, ZoneDetail>,
    #[serde(default)]
    pub items: BTreeMap<String, ItemDetail>,
    #[serde(default)]
    pub abilities: BTreeMap<String, AbilityDetail>,
    #[serde(default)]
    pub house_rooms: BTreeMap<String, HouseRoomDetail>,
    #[serde(default)]
    pub achievement_tiers: Vec<AchievementTierDetail>,
}

impl ReferenceData {
    pub fn monster(&self, hrid: &str) -> Option<&MonsterDetail> {
        self.monsters.get(hrid)
    }

    pub fn zone(&self, hrid: &str) -> Option<&ZoneDetail> {
        self.zones.get(hrid)
    }

    pub fn item(&self, hrid: &str) -> Option<&ItemDetail> {
        self.items.get(hrid)
    }

    pub fn ability(&self, hrid: &str) -> Option<&AbilityDetail> {
        self.abilities.get(hrid)
    }

    pub fn house_room(&self, hrid: &str) -> Option<&HouseRoomDetail> {
        self.house_rooms.get(hrid)
    }
}

/// Monster combat numbers before difficulty scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterCombatDetail {
    pub max_hitpoints: f64,
    #[serde(default)]
    pub max_manapoints: f64,
    pub accuracy: f64,
    pub evasion: f64,
    pub max_damage: f64,
    #[serde(default = "default_attack_interval")]
    pub attack_interval_ms: u64,
    #[serde(default)]
    pub combat_style: CombatStyle,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default)]
    pub armor: f64,
    #[serde(default)]
    pub water_resistance: f64,
    #[serde(default)]
    pub nature_resistance: f64,
    #[serde(default)]
    pub fire_resistance: f64,
    #[serde(default)]
    pub critical_rate: f64,
    #[serde(default)]
    pub physical_thorns: f64,
    #[serde(default)]
    pub elemental_thorns: f64,
    #[serde(default)]
    pub retaliation: f64,
    #[serde(default)]
    pub life_steal: f64,
}

fn default_attack_interval() -> u64 {
    UNARMED_ATTACK_INTERVAL_MS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterAbility {
    pub ability_hrid: String,
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterDetail {
    pub hrid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub experience: f64,
    pub combat: MonsterCombatDetail,
    #[serde(default)]
    pub drop_table: Vec<DropTableEntry>,
    #[serde(default)]
    pub abilities: Vec<MonsterAbility>,
}

impl MonsterDetail {
    /// Stat block at a difficulty tier. Attack interval and rates are not scaled.
    pub fn combat_stats(&self, tier: u8) -> CombatStats {
        let m = difficulty_multiplier(tier);
        let c = &self.combat;
        CombatStats {
            combat_style: c.combat_style,
            damage_type: c.damage_type,
            max_hitpoints: (c.max_hitpoints * m).max(1.0),
            max_manapoints: c.max_manapoints * m,
            accuracy: c.accuracy * m,
            evasion: c.evasion * m,
            max_damage: c.max_damage * m,
            attack_interval_ms: c.attack_interval_ms.max(MIN_ATTACK_INTERVAL_MS),
            critical_rate: c.critical_rate.clamp(0.0, 1.0),
            critical_multiplier: BASE_CRIT_MULTIPLIER,
            armor: c.armor * m,
            water_resistance: c.water_resistance * m,
            nature_resistance: c.nature_resistance * m,
            fire_resistance: c.fire_resistance * m,
            physical_thorns: c.physical_thorns,
            elemental_thorns: c.elemental_thorns,
            retaliation: c.retaliation,
            life_steal: c.life_steal,
            hp_regen: 0.0,
            mp_regen: 0.0,
            threat: BASE_THREAT,
            ..CombatStats::default()
        }
    }

    pub fn experience_at(&self, tier: u8) -> f64 {
        self.experience * difficulty_multiplier(tier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    pub monster_hrid: String,
    pub rate: f64,
    #[serde(default = "default_strength")]
    pub strength: u32,
}

fn default_strength() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomSpawnInfo {
    pub max_spawn_count: u32,
    pub max_total_strength: u32,
    pub spawns: Vec<SpawnEntry>,
    /// Monsters of the boss encounter, spawned together.
    #[serde(default)]
    pub boss_spawns: Vec<String>,
    /// A boss encounter replaces every Nth encounter. 0 disables bosses.
    #[serde(default)]
    pub battles_per_boss: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonWave {
    pub monsters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonInfo {
    pub waves: Vec<DungeonWave>,
    /// Rolled once per party member when the final wave is cleared.
    #[serde(default)]
    pub completion_drops: Vec<DropTableEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDetail {
    pub hrid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub random_spawn: Option<RandomSpawnInfo>,
    #[serde(default)]
    pub dungeon: Option<DungeonInfo>,
}

impl ZoneDetail {
    pub fn is_dungeon(&self) -> bool {
        self.dungeon.is_some()
    }

    /// Every monster hrid this zone can put on the field.
    pub fn monster_hrids(&self) -> Vec<&str> {
        let mut hrids = Vec::new();
        if let Some(spawn) = &self.random_spawn {
            hrids.extend(spawn.spawns.iter().map(|s| s.monster_hrid.as_str()));
            hrids.extend(spawn.boss_spawns.iter().map(String::as_str));
        }
        if let Some(dungeon) = &self.dungeon {
            for wave in &dungeon.waves {
                hrids.extend(wave.monsters.iter().map(String::as_str));
            }
        }
        hrids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Head,
    Body,
    Legs,
    Feet,
    Hands,
    MainHand,
    TwoHand,
    OffHand,
    Pouch,
    Back,
    Neck,
    Earrings,
    Ring,
    Trinket,
    Charm,
}

impl EquipmentSlot {
    pub fn is_weapon(self) -> bool {
        matches!(self, Self::MainHand | Self::TwoHand)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponDetail {
    pub combat_style: CombatStyle,
    #[serde(default)]
    pub damage_type: DamageType,
    pub attack_interval_ms: u64,
    #[serde(default)]
    pub max_damage: f64,
}

impl WeaponDetail {
    /// Weapon facts at an enhancement level; only damage scales.
    pub fn profile(&self, enhancement_multiplier: f64) -> WeaponProfile {
        WeaponProfile {
            combat_style: self.combat_style,
            damage_type: self.damage_type,
            attack_interval_ms: self.attack_interval_ms,
            max_damage: self.max_damage * enhancement_multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBonus {
    pub buff_type: BuffType,
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub flat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDetail {
    pub slot: EquipmentSlot,
    #[serde(default)]
    pub weapon: Option<WeaponDetail>,
    #[serde(default)]
    pub stats: Vec<StatBonus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableKind {
    Food,
    Drink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumableDetail {
    pub kind: ConsumableKind,
    #[serde(default)]
    pub hitpoint_restore: f64,
    #[serde(default)]
    pub manapoint_restore: f64,
    /// Restore spread over this duration; 0 restores instantly.
    #[serde(default)]
    pub recovery_duration_ms: u64,
    pub cooldown_ms: u64,
    #[serde(default)]
    pub buffs: Vec<Buff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub hrid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub equipment: Option<EquipmentDetail>,
    #[serde(default)]
    pub consumable: Option<ConsumableDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDetail {
    pub hrid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mana_cost: f64,
    pub cooldown_ms: u64,
    pub effects: Vec<AbilityEffect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseRoomDetail {
    pub hrid: String,
    #[serde(default)]
    pub name: String,
    pub buffs: Vec<Buff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementTierDetail {
    pub hrid: String,
    /// A tier's buffs apply when the player holds every achievement listed.
    pub achievements: Vec<String>,
    pub buffs: Vec<Buff>,
}
