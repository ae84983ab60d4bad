//! Buff model and the buff resolver.
//!
//! Buff types are a closed set: every consumer reads a [BuffType] variant, never a free-form
//! string, so a buff meant for drop quantity cannot silently land on drop rate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::stacking::{CategoryTotals, StackContribution, StatStacking};
use crate::combat::stats::SkillLevels;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuffType {
    #[serde(rename = "/buff_types/wisdom")]
    Wisdom,
    #[serde(rename = "/buff_types/combat_drop_rate")]
    CombatDropRate,
    #[serde(rename = "/buff_types/combat_drop_quantity")]
    CombatDropQuantity,
    #[serde(rename = "/buff_types/combat_rare_find")]
    CombatRareFind,
    #[serde(rename = "/buff_types/attack_speed")]
    AttackSpeed,
    #[serde(rename = "/buff_types/accuracy")]
    Accuracy,
    #[serde(rename = "/buff_types/evasion")]
    Evasion,
    #[serde(rename = "/buff_types/damage")]
    Damage,
    #[serde(rename = "/buff_types/critical_rate")]
    CriticalRate,
    #[serde(rename = "/buff_types/critical_damage")]
    CriticalDamage,
    #[serde(rename = "/buff_types/armor")]
    Armor,
    #[serde(rename = "/buff_types/water_resistance")]
    WaterResistance,
    #[serde(rename = "/buff_types/nature_resistance")]
    NatureResistance,
    #[serde(rename = "/buff_types/fire_resistance")]
    FireResistance,
    #[serde(rename = "/buff_types/physical_amplify")]
    PhysicalAmplify,
    #[serde(rename = "/buff_types/water_amplify")]
    WaterAmplify,
    #[serde(rename = "/buff_types/nature_amplify")]
    NatureAmplify,
    #[serde(rename = "/buff_types/fire_amplify")]
    FireAmplify,
    #[serde(rename = "/buff_types/armor_penetration")]
    ArmorPenetration,
    #[serde(rename = "/buff_types/magic_penetration")]
    MagicPenetration,
    #[serde(rename = "/buff_types/physical_thorns")]
    PhysicalThorns,
    #[serde(rename = "/buff_types/elemental_thorns")]
    ElementalThorns,
    #[serde(rename = "/buff_types/retaliation")]
    Retaliation,
    #[serde(rename = "/buff_types/life_steal")]
    LifeSteal,
    #[serde(rename = "/buff_types/mana_leech")]
    ManaLeech,
    #[serde(rename = "/buff_types/hp_regen")]
    HpRegen,
    #[serde(rename = "/buff_types/mp_regen")]
    MpRegen,
    #[serde(rename = "/buff_types/max_hitpoints")]
    MaxHitpoints,
    #[serde(rename = "/buff_types/max_manapoints")]
    MaxManapoints,
    #[serde(rename = "/buff_types/threat")]
    Threat,
    #[serde(rename = "/buff_types/ability_haste")]
    AbilityHaste,
}

impl BuffType {
    pub const fn hrid(self) -> &'static str {
        match self {
            Self::Wisdom => "/buff_types/wisdom",
            Self::CombatDropRate => "/buff_types/combat_drop_rate",
            Self::CombatDropQuantity => "/buff_types/combat_drop_quantity",
            Self::CombatRareFind => "/buff_types/combat_rare_find",
            Self::AttackSpeed => "/buff_types/attack_speed",
            Self::Accuracy => "/buff_types/accuracy",
            Self::Evasion => "/buff_types/evasion",
            Self::Damage => "/buff_types/damage",
            Self::CriticalRate => "/buff_types/critical_rate",
            Self::CriticalDamage => "/buff_types/critical_damage",
            Self::Armor => "/buff_types/armor",
            Self::WaterResistance => "/buff_types/water_resistance",
            Self::NatureResistance => "/buff_types/nature_resistance",
            Self::FireResistance => "/buff_types/fire_resistance",
            Self::PhysicalAmplify => "/buff_types/physical_amplify",
            Self::WaterAmplify => "/buff_types/water_amplify",
            Self::NatureAmplify => "/buff_types/nature_amplify",
            Self::FireAmplify => "/buff_types/fire_amplify",
            Self::ArmorPenetration => "/buff_types/armor_penetration",
            Self::MagicPenetration => "/buff_types/magic_penetration",
            Self::PhysicalThorns => "/buff_types/physical_thorns",
            Self::ElementalThorns => "/buff_types/elemental_thorns",
            Self::Retaliation => "/buff_types/retaliation",
            Self::LifeSteal => "/buff_types/life_steal",
            Self::ManaLeech => "/buff_types/mana_leech",
            Self::HpRegen => "/buff_types/hp_regen",
            Self::MpRegen => "/buff_types/mp_regen",
            Self::MaxHitpoints => "/buff_types/max_hitpoints",
            Self::MaxManapoints => "/buff_types/max_manapoints",
            Self::Threat => "/buff_types/threat",
            Self::AbilityHaste => "/buff_types/ability_haste",
        }
    }
}

/// A modifier as defined in reference data or produced by a buff source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    pub unique_hrid: String,
    pub type_hrid: BuffType,
    #[serde(default)]
    pub ratio_boost: f64,
    #[serde(default)]
    pub ratio_boost_level_bonus: f64,
    #[serde(default)]
    pub flat_boost: f64,
    #[serde(default)]
    pub flat_boost_level_bonus: f64,
    #[serde(default)]
    pub start_time_ms: u64,
    /// 0 = active until removed.
    #[serde(default)]
    pub duration_ms: u64,
}

impl Buff {
    pub fn flat(unique_hrid: impl Into<String>, type_hrid: BuffType, flat_boost: f64) -> Self {
        Self {
            unique_hrid: unique_hrid.into(),
            type_hrid,
            ratio_boost: 0.0,
            ratio_boost_level_bonus: 0.0,
            flat_boost,
            flat_boost_level_bonus: 0.0,
            start_time_ms: 0,
            duration_ms: 0,
        }
    }

    pub fn ratio(unique_hrid: impl Into<String>, type_hrid: BuffType, ratio_boost: f64) -> Self {
        Self {
            ratio_boost,
            flat_boost: 0.0,
            ..Self::flat(unique_hrid, type_hrid, 0.0)
        }
    }

    /// `(ratio, flat)` at a source level. Level 1 (and 0) means no level bonus.
    pub fn boosts_at_level(&self, level: u32) -> (f64, f64) {
        let steps = level.saturating_sub(1) as f64;
        (
            self.ratio_boost + self.ratio_boost_level_bonus * steps,
            self.flat_boost + self.flat_boost_level_bonus * steps,
        )
    }
}

pub const PASS_BUFF_UNIQUE_HRID: &str = "/global_buffs/moopass_wisdom";
pub const PASS_BUFF_WISDOM: f64 = 0.05;

pub fn pass_buff() -> Buff {
    Buff::flat(PASS_BUFF_UNIQUE_HRID, BuffType::Wisdom, PASS_BUFF_WISDOM)
}

pub const COMMUNITY_BUFF_MAX_TIER: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityBuff {
    Experience,
    Drop,
}

impl CommunityBuff {
    pub const fn buff_type(self) -> BuffType {
        match self {
            Self::Experience => BuffType::Wisdom,
            Self::Drop => BuffType::CombatDropQuantity,
        }
    }

    pub const fn unique_hrid(self) -> &'static str {
        match self {
            Self::Experience => "/community_buff_types/experience",
            Self::Drop => "/community_buff_types/combat_drop_quantity",
        }
    }

    /// None when the tier is 0 (disabled).
    pub fn buff(self, tier: u8) -> Option<Buff> {
        community_buff_flat(tier).map(|flat| Buff::flat(self.unique_hrid(), self.buff_type(), flat))
    }
}

/// 0.2 at tier 1 rising by 0.005 per tier; None for tier 0. Tiers above 10 are capped.
pub fn community_buff_flat(tier: u8) -> Option<f64> {
    if tier == 0 {
        return None;
    }
    let tier = tier.min(COMMUNITY_BUFF_MAX_TIER);
    Some(0.005 * f64::from(tier - 1) + 0.2)
}

pub fn combat_level(levels: &SkillLevels) -> f64 {
    let power = levels.melee.max(levels.ranged).max(levels.magic);
    let highest = levels
        .attack
        .max(levels.defense)
        .max(levels.melee)
        .max(levels.ranged)
        .max(levels.magic);
    0.1 * f64::from(levels.stamina + levels.intelligence + levels.attack + levels.defense + power)
        + 0.5 * f64::from(highest)
}

pub const LEVEL_GAP_FREE_RATIO: f64 = 1.2;
pub const LEVEL_GAP_SLOPE: f64 = 3.0;
pub const LEVEL_GAP_MAX_PENALTY: f64 = 0.9;

/// Penalty (<= 0) for a player far below the strongest party member.
pub fn level_gap_debuff(max_party_level: f64, player_level: f64) -> f64 {
    if player_level <= 0.0 {
        return -LEVEL_GAP_MAX_PENALTY;
    }
    let ratio = max_party_level / player_level;
    if ratio <= LEVEL_GAP_FREE_RATIO {
        return 0.0;
    }
    -(LEVEL_GAP_SLOPE * (ratio - LEVEL_GAP_FREE_RATIO)).min(LEVEL_GAP_MAX_PENALTY)
}

/// One debuff per party member, in party order.
pub fn party_level_gap_debuffs(party: &[SkillLevels]) -> Vec<f64> {
    let levels: Vec<f64> = party.iter().map(combat_level).collect();
    let max_level = levels.iter().copied().fold(0.0_f64, f64::max);
    levels
        .iter()
        .map(|level| level_gap_debuff(max_level, *level))
        .collect()
}

pub const LEVEL_GAP_UNIQUE_HRID: &str = "/debuffs/level_gap";

/// The level-gap penalty reduces both experience and drop chance.
pub fn level_gap_buffs(debuff: f64) -> Vec<Buff> {
    if debuff == 0.0 {
        return Vec::new();
    }
    vec![
        Buff::flat(
            format!("{LEVEL_GAP_UNIQUE_HRID}/wisdom"),
            BuffType::Wisdom,
            debuff,
        ),
        Buff::flat(
            format!("{LEVEL_GAP_UNIQUE_HRID}/combat_drop_rate"),
            BuffType::CombatDropRate,
            debuff,
        ),
    ]
}

/// Where a static buff came from. Declaration order is resolution precedence: when two
/// sources share a `unique_hrid`, the later one wins.
///
/// Ability and consumable buffs are timed and live in [ActiveBuffs]; they are layered on top
/// of these totals by [compute_effective_buffs].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum BuffSource {
    Global,
    Community,
    Achievement,
    Equipment,
    HouseRoom,
    LevelGap,
}

#[derive(Debug, Clone)]
struct SourcedBuff {
    source: BuffSource,
    buff: Buff,
    level: u32,
}

/// Static (run-long) buffs of one actor, collected from every source before the first tick.
#[derive(Debug, Clone, Default)]
pub struct BuffSources {
    entries: Vec<SourcedBuff>,
}

impl BuffSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: BuffSource, buff: Buff, level: u32) {
        self.entries.push(SourcedBuff {
            source,
            buff,
            level,
        });
    }

    pub fn extend<I>(&mut self, source: BuffSource, buffs: I, level: u32)
    where
        I: IntoIterator<Item = Buff>,
    {
        for buff in buffs {
            self.push(source, buff, level);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Totals after last-write-wins dedup by `unique_hrid` in precedence order.
    pub fn resolve(&self) -> StatStacking<BuffType> {
        let mut ordered: Vec<&SourcedBuff> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| entry.source);

        let mut by_unique: BTreeMap<&str, &SourcedBuff> = BTreeMap::new();
        for entry in ordered {
            by_unique.insert(entry.buff.unique_hrid.as_str(), entry);
        }

        let mut stacking = StatStacking::new();
        for entry in by_unique.values() {
            let (ratio, flat) = entry.buff.boosts_at_level(entry.level);
            stacking.add(StackContribution::ratio(entry.buff.type_hrid, ratio));
            stacking.add(StackContribution::flat(entry.buff.type_hrid, flat));
        }
        stacking
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBuff {
    pub unique_hrid: String,
    pub type_hrid: BuffType,
    pub ratio: f64,
    pub flat: f64,
    pub start_time_ms: u64,
    pub duration_ms: u64,
}

impl ActiveBuff {
    pub fn expires_at_ms(&self) -> Option<u64> {
        (self.duration_ms > 0).then(|| self.start_time_ms.saturating_add(self.duration_ms))
    }

    pub fn is_active(&self, now_ms: u64) -> bool {
        self.expires_at_ms().map_or(true, |end| now_ms < end)
    }
}

/// Timed buffs currently applied to one actor, keyed by `unique_hrid`.
#[derive(Debug, Clone, Default)]
pub struct ActiveBuffs {
    by_unique: BTreeMap<String, ActiveBuff>,
}

impl ActiveBuffs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `buff` at `now_ms`, replacing any buff with the same `unique_hrid`.
    pub fn apply(&mut self, buff: &Buff, level: u32, now_ms: u64) {
        let (ratio, flat) = buff.boosts_at_level(level);
        self.by_unique.insert(
            buff.unique_hrid.clone(),
            ActiveBuff {
                unique_hrid: buff.unique_hrid.clone(),
                type_hrid: buff.type_hrid,
                ratio,
                flat,
                start_time_ms: now_ms,
                duration_ms: buff.duration_ms,
            },
        );
    }

    pub fn remove(&mut self, unique_hrid: &str) -> Option<ActiveBuff> {
        self.by_unique.remove(unique_hrid)
    }

    /// Drops buffs whose duration has elapsed. Returns true when anything was removed.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        let before = self.by_unique.len();
        self.by_unique.retain(|_, buff| buff.is_active(now_ms));
        before != self.by_unique.len()
    }

    /// Removes every timed buff, keeping permanent ones. Used on death.
    pub fn clear_timed(&mut self) -> bool {
        let before = self.by_unique.len();
        self.by_unique.retain(|_, buff| buff.duration_ms == 0);
        before != self.by_unique.len()
    }

    pub fn clear(&mut self) {
        self.by_unique.clear();
    }

    pub fn get(&self, unique_hrid: &str) -> Option<&ActiveBuff> {
        self.by_unique.get(unique_hrid)
    }

    pub fn has_type(&self, buff_type: BuffType, now_ms: u64) -> bool {
        self.by_unique
            .values()
            .any(|buff| buff.type_hrid == buff_type && buff.is_active(now_ms))
    }

    /// Types of the buffs active at `now_ms`, deduplicated.
    pub fn active_types(&self, now_ms: u64) -> Vec<BuffType> {
        let mut types: Vec<BuffType> = self
            .by_unique
            .values()
            .filter(|buff| buff.is_active(now_ms))
            .map(|buff| buff.type_hrid)
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    pub fn len(&self) -> usize {
        self.by_unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_unique.is_empty()
    }

    fn stacking_at(&self, now_ms: u64) -> StatStacking<BuffType> {
        let mut stacking = StatStacking::new();
        for buff in self.by_unique.values().filter(|b| b.is_active(now_ms)) {
            stacking.add(StackContribution::ratio(buff.type_hrid, buff.ratio));
            stacking.add(StackContribution::flat(buff.type_hrid, buff.flat));
        }
        stacking
    }
}

/// Summed ratio/flat boost per buff type for one actor at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveBuffs {
    stacking: StatStacking<BuffType>,
}

impl EffectiveBuffs {
    pub fn totals(&self, buff_type: BuffType) -> CategoryTotals {
        self.stacking.totals_for(&buff_type)
    }

    pub fn ratio(&self, buff_type: BuffType) -> f64 {
        self.totals(buff_type).ratio
    }

    pub fn flat(&self, buff_type: BuffType) -> f64 {
        self.totals(buff_type).flat
    }

    /// `base * (1 + ratio) + flat` for the stat this buff type modifies.
    pub fn apply(&self, buff_type: BuffType, base: f64) -> f64 {
        self.totals(buff_type).compose_onto(base)
    }

    /// `base + ratio + flat`, for stats that are themselves fractions (amplify, life steal,
    /// wisdom, ...) where a ratio of a zero base would vanish.
    pub fn add(&self, buff_type: BuffType, base: f64) -> f64 {
        let totals = self.totals(buff_type);
        base + totals.ratio + totals.flat
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BuffType, &CategoryTotals)> {
        self.stacking.iter()
    }
}

/// Resolves the effective buff totals from an actor's static sources and its timed buffs at
/// `elapsed_ms`.
pub fn compute_effective_buffs(
    static_totals: &StatStacking<BuffType>,
    active: &ActiveBuffs,
    elapsed_ms: u64,
) -> EffectiveBuffs {
    let mut stacking = static_totals.clone();
    stacking.merge_from(&active.stacking_at(elapsed_ms));
    EffectiveBuffs { stacking }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(all: u32) -> SkillLevels {
        SkillLevels {
            stamina: all,
            intelligence: all,
            defense: all,
            attack: all,
            melee: all,
            ranged: all,
            magic: all,
        }
    }

    #[test]
    fn community_tier_bounds() {
        assert_eq!(community_buff_flat(0), None);
        assert_eq!(community_buff_flat(1), Some(0.2));
        let top = community_buff_flat(10).unwrap_or_default();
        assert!((top - 0.245).abs() < 1e-12);
    }

    #[test]
    fn community_tier_is_monotonic() {
        let mut prior = 0.0;
        for tier in 1..=COMMUNITY_BUFF_MAX_TIER {
            let flat = community_buff_flat(tier).unwrap_or_default();
            assert!(flat >= prior);
            prior = flat;
        }
    }

    #[test]
    fn community_drop_targets_quantity_channel() {
        for tier in 1..=COMMUNITY_BUFF_MAX_TIER {
            let buff = CommunityBuff::Drop.buff(tier).expect("enabled tier");
            assert_eq!(buff.type_hrid, BuffType::CombatDropQuantity);
            assert_ne!(buff.type_hrid, BuffType::CombatDropRate);
        }
        assert_eq!(CommunityBuff::Experience.buff_type(), BuffType::Wisdom);
    }

    #[test]
    fn level_gap_thresholds() {
        assert_eq!(level_gap_debuff(120.0, 100.0), 0.0);
        assert_eq!(level_gap_debuff(100.0, 100.0), 0.0);
        assert!((level_gap_debuff(150.0, 100.0) + 0.9).abs() < 1e-12);
        assert_eq!(level_gap_debuff(400.0, 100.0), -0.9);
        let mid = level_gap_debuff(130.0, 100.0);
        assert!((mid + 0.3).abs() < 1e-9);
    }

    #[test]
    fn level_gap_is_monotonic_and_bounded() {
        let mut prior = 0.0;
        for step in 0..200 {
            let max = 100.0 + step as f64;
            let debuff = level_gap_debuff(max, 100.0);
            assert!(debuff <= prior + 1e-15);
            assert!(debuff >= -LEVEL_GAP_MAX_PENALTY);
            prior = debuff;
        }
    }

    #[test]
    fn combat_level_formula() {
        let mut l = levels(10);
        l.melee = 50;
        // 0.1 * (10 + 10 + 10 + 10 + 50) + 0.5 * 50
        assert!((combat_level(&l) - 34.0).abs() < 1e-9);
    }

    #[test]
    fn party_debuffs_only_hit_low_members() {
        let debuffs = party_level_gap_debuffs(&[levels(100), levels(10)]);
        assert_eq!(debuffs[0], 0.0);
        assert_eq!(debuffs[1], -0.9);
    }

    #[test]
    fn sources_sum_additively_per_type() {
        let mut sources = BuffSources::new();
        sources.push(BuffSource::Global, pass_buff(), 1);
        sources.push(BuffSource::Community, CommunityBuff::Experience.buff(1).unwrap_or_else(pass_buff), 1);
        sources.push(
            BuffSource::Equipment,
            Buff::ratio("/equipment/main_hand/accuracy", BuffType::Accuracy, 0.1),
            1,
        );
        sources.push(
            BuffSource::Equipment,
            Buff::ratio("/equipment/head/accuracy", BuffType::Accuracy, 0.05),
            1,
        );
        let totals = sources.resolve();
        assert!((totals.totals_for(&BuffType::Wisdom).flat - 0.25).abs() < 1e-12);
        assert!((totals.totals_for(&BuffType::Accuracy).ratio - 0.15).abs() < 1e-12);
    }

    #[test]
    fn later_source_wins_on_shared_unique_hrid() {
        let mut sources = BuffSources::new();
        sources.push(
            BuffSource::HouseRoom,
            Buff::flat("/shared", BuffType::Armor, 9.0),
            1,
        );
        sources.push(BuffSource::Global, Buff::flat("/shared", BuffType::Armor, 1.0), 1);
        assert_eq!(sources.resolve().totals_for(&BuffType::Armor).flat, 9.0);
    }

    #[test]
    fn level_bonus_scales_with_source_level() {
        let mut buff = Buff::flat("/house/armory", BuffType::Accuracy, 0.01);
        buff.flat_boost_level_bonus = 0.005;
        let (_, flat) = buff.boosts_at_level(5);
        assert!((flat - 0.03).abs() < 1e-12);
        assert_eq!(buff.boosts_at_level(0), buff.boosts_at_level(1));
    }

    #[test]
    fn reapplying_buff_replaces_instead_of_stacking() {
        let mut active = ActiveBuffs::new();
        let mut buff = Buff::ratio("/abilities/berserk", BuffType::Damage, 0.2);
        buff.duration_ms = 10_000;
        active.apply(&buff, 1, 0);
        active.apply(&buff, 1, 5_000);
        assert_eq!(active.len(), 1);
        let effective = compute_effective_buffs(&StatStacking::new(), &active, 6_000);
        assert!((effective.ratio(BuffType::Damage) - 0.2).abs() < 1e-12);
        assert_eq!(active.get("/abilities/berserk").map(|b| b.start_time_ms), Some(5_000));
    }

    #[test]
    fn timed_buffs_expire_and_permanent_ones_stay() {
        let mut active = ActiveBuffs::new();
        let mut timed = Buff::flat("/timed", BuffType::Armor, 5.0);
        timed.duration_ms = 1_000;
        active.apply(&timed, 1, 0);
        active.apply(&Buff::flat("/forever", BuffType::Armor, 2.0), 1, 0);
        assert!(!active.expire(999));
        assert!(active.expire(1_000));
        assert!(active.get("/timed").is_none());
        assert!(!active.expire(u64::MAX));
        assert!(active.get("/forever").is_some());
    }

    #[test]
    fn clear_timed_keeps_permanent() {
        let mut active = ActiveBuffs::new();
        let mut timed = Buff::flat("/timed", BuffType::Armor, 5.0);
        timed.duration_ms = 1_000;
        active.apply(&timed, 1, 0);
        active.apply(&Buff::flat("/forever", BuffType::Armor, 2.0), 1, 0);
        assert!(active.clear_timed());
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn buff_type_serializes_as_hrid() {
        let json = serde_json::to_string(&BuffType::CombatDropQuantity).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", BuffType::CombatDropQuantity.hrid()));
    }
}
