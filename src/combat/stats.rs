//! Combat stat blocks: base values from levels, equipment or monster definitions, and the
//! effective values after buffs.

use serde::{Deserialize, Serialize};

use crate::combat::buffs::{BuffType, EffectiveBuffs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillLevels {
    pub stamina: u32,
    pub intelligence: u32,
    pub defense: u32,
    pub attack: u32,
    pub melee: u32,
    pub ranged: u32,
    pub magic: u32,
}

impl Default for SkillLevels {
    fn default() -> Self {
        Self {
            stamina: 1,
            intelligence: 1,
            defense: 1,
            attack: 1,
            melee: 1,
            ranged: 1,
            magic: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Stamina,
    Intelligence,
    Defense,
    Attack,
    Melee,
    Ranged,
    Magic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStyle {
    Stab,
    Slash,
    #[default]
    Smash,
    Ranged,
    Magic,
}

impl CombatStyle {
    /// Skill whose level drives max damage and receives the primary experience share.
    pub const fn power_skill(self) -> Skill {
        match self {
            Self::Stab | Self::Slash | Self::Smash => Skill::Melee,
            Self::Ranged => Skill::Ranged,
            Self::Magic => Skill::Magic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Physical,
    Water,
    Nature,
    Fire,
}

pub const UNARMED_ATTACK_INTERVAL_MS: u64 = 3_000;
pub const BASE_CRIT_MULTIPLIER: f64 = 1.5;
pub const BASE_REGEN_PER_TICK: f64 = 0.01;
pub const BASE_THREAT: f64 = 100.0;
/// Attacks can never come faster than this, whatever the attack speed.
pub const MIN_ATTACK_INTERVAL_MS: u64 = 100;

/// Multiplier applied to every equipment stat at enhancement level `+N`.
pub const ENHANCEMENT_BONUS: [f64; 21] = [
    0.0, 0.02, 0.042, 0.066, 0.092, 0.12, 0.15, 0.182, 0.216, 0.252, 0.29, 0.334, 0.384, 0.44,
    0.502, 0.57, 0.644, 0.724, 0.81, 0.902, 1.0,
];

pub fn enhancement_multiplier(level: u32) -> f64 {
    let idx = (level as usize).min(ENHANCEMENT_BONUS.len() - 1);
    1.0 + ENHANCEMENT_BONUS[idx]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombatStats {
    pub combat_style: CombatStyle,
    pub damage_type: DamageType,
    pub max_hitpoints: f64,
    pub max_manapoints: f64,
    pub accuracy: f64,
    pub evasion: f64,
    pub max_damage: f64,
    /// Dimensionless damage bonus for the attack's combat style.
    pub style_bonus: f64,
    pub attack_interval_ms: u64,
    pub critical_rate: f64,
    pub critical_multiplier: f64,
    pub armor: f64,
    pub water_resistance: f64,
    pub nature_resistance: f64,
    pub fire_resistance: f64,
    pub physical_amplify: f64,
    pub water_amplify: f64,
    pub nature_amplify: f64,
    pub fire_amplify: f64,
    pub armor_penetration: f64,
    pub magic_penetration: f64,
    pub physical_thorns: f64,
    pub elemental_thorns: f64,
    pub retaliation: f64,
    pub life_steal: f64,
    pub mana_leech: f64,
    pub hp_regen: f64,
    pub mp_regen: f64,
    pub threat: f64,
    pub ability_haste: f64,
    pub wisdom: f64,
    pub drop_rate: f64,
    pub drop_quantity: f64,
    pub rare_find: f64,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            combat_style: CombatStyle::default(),
            damage_type: DamageType::default(),
            max_hitpoints: 100.0,
            max_manapoints: 100.0,
            accuracy: 10.0,
            evasion: 10.0,
            max_damage: 10.0,
            style_bonus: 0.0,
            attack_interval_ms: UNARMED_ATTACK_INTERVAL_MS,
            critical_rate: 0.0,
            critical_multiplier: BASE_CRIT_MULTIPLIER,
            armor: 0.0,
            water_resistance: 0.0,
            nature_resistance: 0.0,
            fire_resistance: 0.0,
            physical_amplify: 0.0,
            water_amplify: 0.0,
            nature_amplify: 0.0,
            fire_amplify: 0.0,
            armor_penetration: 0.0,
            magic_penetration: 0.0,
            physical_thorns: 0.0,
            elemental_thorns: 0.0,
            retaliation: 0.0,
            life_steal: 0.0,
            mana_leech: 0.0,
            hp_regen: BASE_REGEN_PER_TICK,
            mp_regen: BASE_REGEN_PER_TICK,
            threat: BASE_THREAT,
            ability_haste: 0.0,
            wisdom: 0.0,
            drop_rate: 0.0,
            drop_quantity: 0.0,
            rare_find: 0.0,
        }
    }
}

/// Weapon facts needed to derive a player's stat block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponProfile {
    pub combat_style: CombatStyle,
    pub damage_type: DamageType,
    pub attack_interval_ms: u64,
    pub max_damage: f64,
}

impl Default for WeaponProfile {
    fn default() -> Self {
        Self {
            combat_style: CombatStyle::Smash,
            damage_type: DamageType::Physical,
            attack_interval_ms: UNARMED_ATTACK_INTERVAL_MS,
            max_damage: 0.0,
        }
    }
}

impl SkillLevels {
    pub fn level(&self, skill: Skill) -> u32 {
        match skill {
            Skill::Stamina => self.stamina,
            Skill::Intelligence => self.intelligence,
            Skill::Defense => self.defense,
            Skill::Attack => self.attack,
            Skill::Melee => self.melee,
            Skill::Ranged => self.ranged,
            Skill::Magic => self.magic,
        }
    }
}

impl CombatStats {
    /// Unbuffed player stats from skill levels and the equipped weapon.
    pub fn player_base(levels: &SkillLevels, weapon: &WeaponProfile) -> Self {
        let power = levels.level(weapon.combat_style.power_skill());
        let resistance = 0.2 * f64::from(levels.magic);
        Self {
            combat_style: weapon.combat_style,
            damage_type: weapon.damage_type,
            max_hitpoints: 10.0 * (10.0 + f64::from(levels.stamina)),
            max_manapoints: 10.0 * (10.0 + f64::from(levels.intelligence)),
            accuracy: 10.0 + f64::from(levels.attack),
            evasion: 10.0 + f64::from(levels.defense),
            max_damage: 10.0 + f64::from(power) + weapon.max_damage,
            attack_interval_ms: weapon.attack_interval_ms.max(MIN_ATTACK_INTERVAL_MS),
            armor: 0.2 * f64::from(levels.defense),
            water_resistance: resistance,
            nature_resistance: resistance,
            fire_resistance: resistance,
            ..Self::default()
        }
    }

    /// Effective stats. Absolute stats compose as `base * (1 + ratio) + flat` of their buff
    /// type; fractional stats (rates, amplifies, penetration, find bonuses) add `ratio + flat`.
    pub fn with_buffs(&self, buffs: &EffectiveBuffs) -> Self {
        let attack_speed = buffs.apply(BuffType::AttackSpeed, 0.0);
        let interval = self.attack_interval_ms as f64 / (1.0 + attack_speed).max(0.01);
        Self {
            combat_style: self.combat_style,
            damage_type: self.damage_type,
            max_hitpoints: buffs.apply(BuffType::MaxHitpoints, self.max_hitpoints).max(1.0),
            max_manapoints: buffs.apply(BuffType::MaxManapoints, self.max_manapoints).max(0.0),
            accuracy: buffs.apply(BuffType::Accuracy, self.accuracy).max(0.0),
            evasion: buffs.apply(BuffType::Evasion, self.evasion).max(0.0),
            max_damage: buffs.apply(BuffType::Damage, self.max_damage).max(0.0),
            style_bonus: self.style_bonus,
            attack_interval_ms: (interval.round() as u64).max(MIN_ATTACK_INTERVAL_MS),
            critical_rate: buffs
                .add(BuffType::CriticalRate, self.critical_rate)
                .clamp(0.0, 1.0),
            critical_multiplier: buffs.apply(BuffType::CriticalDamage, self.critical_multiplier),
            armor: buffs.apply(BuffType::Armor, self.armor),
            water_resistance: buffs.apply(BuffType::WaterResistance, self.water_resistance),
            nature_resistance: buffs.apply(BuffType::NatureResistance, self.nature_resistance),
            fire_resistance: buffs.apply(BuffType::FireResistance, self.fire_resistance),
            physical_amplify: buffs.add(BuffType::PhysicalAmplify, self.physical_amplify),
            water_amplify: buffs.add(BuffType::WaterAmplify, self.water_amplify),
            nature_amplify: buffs.add(BuffType::NatureAmplify, self.nature_amplify),
            fire_amplify: buffs.add(BuffType::FireAmplify, self.fire_amplify),
            armor_penetration: buffs
                .add(BuffType::ArmorPenetration, self.armor_penetration)
                .clamp(0.0, 1.0),
            magic_penetration: buffs
                .add(BuffType::MagicPenetration, self.magic_penetration)
                .clamp(0.0, 1.0),
            physical_thorns: buffs.add(BuffType::PhysicalThorns, self.physical_thorns),
            elemental_thorns: buffs.add(BuffType::ElementalThorns, self.elemental_thorns),
            retaliation: buffs.add(BuffType::Retaliation, self.retaliation),
            life_steal: buffs.add(BuffType::LifeSteal, self.life_steal),
            mana_leech: buffs.add(BuffType::ManaLeech, self.mana_leech),
            hp_regen: buffs.apply(BuffType::HpRegen, self.hp_regen),
            mp_regen: buffs.apply(BuffType::MpRegen, self.mp_regen),
            threat: buffs.apply(BuffType::Threat, self.threat).max(0.0),
            ability_haste: buffs.add(BuffType::AbilityHaste, self.ability_haste),
            wisdom: buffs.add(BuffType::Wisdom, self.wisdom),
            drop_rate: buffs.add(BuffType::CombatDropRate, self.drop_rate),
            drop_quantity: buffs.add(BuffType::CombatDropQuantity, self.drop_quantity),
            rare_find: buffs.add(BuffType::CombatRareFind, self.rare_find),
        }
    }

    pub fn amplify_for(&self, damage_type: DamageType) -> f64 {
        match damage_type {
            DamageType::Physical => self.physical_amplify,
            DamageType::Water => self.water_amplify,
            DamageType::Nature => self.nature_amplify,
            DamageType::Fire => self.fire_amplify,
        }
    }

    /// Armor for physical hits, the matching resistance otherwise.
    pub fn defense_against(&self, damage_type: DamageType) -> f64 {
        match damage_type {
            DamageType::Physical => self.armor,
            DamageType::Water => self.water_resistance,
            DamageType::Nature => self.nature_resistance,
            DamageType::Fire => self.fire_resistance,
        }
    }

    pub fn penetration_for(&self, damage_type: DamageType) -> f64 {
        match damage_type {
            DamageType::Physical => self.armor_penetration,
            _ => self.magic_penetration,
        }
    }

    pub fn thorns_for(&self, damage_type: DamageType) -> f64 {
        match damage_type {
            DamageType::Physical => self.physical_thorns,
            _ => self.elemental_thorns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::buffs::{compute_effective_buffs, ActiveBuffs, Buff, BuffSource, BuffSources};

    #[test]
    fn player_base_uses_style_power_skill() {
        let levels = SkillLevels {
            stamina: 20,
            intelligence: 5,
            defense: 15,
            attack: 30,
            melee: 40,
            ranged: 7,
            magic: 50,
        };
        let melee = CombatStats::player_base(&levels, &WeaponProfile::default());
        assert_eq!(melee.max_hitpoints, 300.0);
        assert_eq!(melee.max_manapoints, 150.0);
        assert_eq!(melee.accuracy, 40.0);
        assert_eq!(melee.evasion, 25.0);
        assert_eq!(melee.max_damage, 50.0);
        assert!((melee.armor - 3.0).abs() < 1e-12);
        assert!((melee.fire_resistance - 10.0).abs() < 1e-12);

        let staff = WeaponProfile {
            combat_style: CombatStyle::Magic,
            damage_type: DamageType::Fire,
            attack_interval_ms: 4_000,
            max_damage: 12.0,
        };
        let magic = CombatStats::player_base(&levels, &staff);
        assert_eq!(magic.max_damage, 72.0);
        assert_eq!(magic.attack_interval_ms, 4_000);
        assert_eq!(magic.damage_type, DamageType::Fire);
    }

    #[test]
    fn buffs_compose_ratio_then_flat() {
        let mut sources = BuffSources::new();
        let mut acc = Buff::ratio("/a", BuffType::Accuracy, 0.5);
        acc.flat_boost = 5.0;
        sources.push(BuffSource::Equipment, acc, 1);
        sources.push(
            BuffSource::HouseRoom,
            Buff::flat("/speed", BuffType::AttackSpeed, 0.5),
            1,
        );
        let effective = compute_effective_buffs(&sources.resolve(), &ActiveBuffs::new(), 0);
        let base = CombatStats {
            accuracy: 100.0,
            attack_interval_ms: 3_000,
            ..CombatStats::default()
        };
        let stats = base.with_buffs(&effective);
        assert!((stats.accuracy - 155.0).abs() < 1e-9);
        assert_eq!(stats.attack_interval_ms, 2_000);
    }

    #[test]
    fn ratio_buffs_reach_zero_base_stats() {
        let mut sources = BuffSources::new();
        sources.push(BuffSource::Equipment, Buff::ratio("/steal", BuffType::LifeSteal, 0.1), 1);
        sources.push(BuffSource::Equipment, Buff::ratio("/fire", BuffType::FireAmplify, 0.2), 1);
        sources.push(BuffSource::HouseRoom, Buff::flat("/fire_flat", BuffType::FireAmplify, 0.05), 1);
        sources.push(BuffSource::HouseRoom, Buff::ratio("/wisdom", BuffType::Wisdom, 0.15), 1);
        let effective = compute_effective_buffs(&sources.resolve(), &ActiveBuffs::new(), 0);
        let stats = CombatStats::default().with_buffs(&effective);
        assert!((stats.life_steal - 0.1).abs() < 1e-12);
        assert!((stats.fire_amplify - 0.25).abs() < 1e-12);
        assert!((stats.wisdom - 0.15).abs() < 1e-12);
    }

    #[test]
    fn timed_damage_ratio_scales_max_damage() {
        let mut active = ActiveBuffs::new();
        let mut coffee = Buff::ratio("/buff_uniques/power_coffee", BuffType::Damage, 0.1);
        coffee.duration_ms = 300_000;
        active.apply(&coffee, 1, 0);
        let base = CombatStats {
            max_damage: 100.0,
            ..CombatStats::default()
        };
        let unbuffed = base.with_buffs(&compute_effective_buffs(
            &BuffSources::new().resolve(),
            &ActiveBuffs::new(),
            0,
        ));
        let buffed = base.with_buffs(&compute_effective_buffs(&BuffSources::new().resolve(), &active, 1_000));
        assert!((unbuffed.max_damage - 100.0).abs() < 1e-9);
        assert!((buffed.max_damage - 110.0).abs() < 1e-9);
    }

    #[test]
    fn enhancement_table_is_clamped() {
        assert_eq!(enhancement_multiplier(0), 1.0);
        assert_eq!(enhancement_multiplier(20), 2.0);
        assert_eq!(enhancement_multiplier(99), 2.0);
    }
}
