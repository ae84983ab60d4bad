//! Attack resolution: hit chance, the damage pipeline and on-hit side effects.
//!
//! The pipeline order is fixed: style bonus, crit, elemental amplify, then armor or
//! resistance mitigation. Reordering changes the numbers.

use serde::Serialize;

use crate::combat::rng::Rng;
use crate::combat::stats::{CombatStats, DamageType};

/// Armor points per 1% of extra effective HP.
pub const ARMOR_SCALE: f64 = 0.01;

/// Chance that an attack with `accuracy` lands against `evasion`. Both zero is a coin flip.
pub fn hit_chance(accuracy: f64, evasion: f64) -> f64 {
    let accuracy = accuracy.max(0.0);
    let evasion = evasion.max(0.0);
    let total = accuracy + evasion;
    if total <= 0.0 {
        return 0.5;
    }
    accuracy / total
}

/// Multiplier applied to incoming damage for a given defense value and attacker penetration.
///
/// Positive effective armor divides damage by `1 + armor * 0.01`; negative armor (shredded
/// below zero by debuffs) amplifies it linearly.
pub fn mitigation_factor(armor: f64, penetration: f64) -> f64 {
    let effective = armor * (1.0 - penetration.clamp(0.0, 1.0));
    if effective >= 0.0 {
        1.0 / (1.0 + effective * ARMOR_SCALE)
    } else {
        1.0 - effective * ARMOR_SCALE
    }
}

/// Inputs of one damage computation, already resolved to numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageInputs {
    pub base_damage: f64,
    pub style_bonus: f64,
    /// Some(multiplier) when the crit roll succeeded.
    pub crit_multiplier: Option<f64>,
    pub amplify: f64,
    pub armor: f64,
    pub penetration: f64,
}

pub fn compute_damage(inputs: DamageInputs) -> f64 {
    let mut damage = inputs.base_damage * (1.0 + inputs.style_bonus);
    if let Some(multiplier) = inputs.crit_multiplier {
        damage *= multiplier;
    }
    damage *= 1.0 + inputs.amplify;
    damage * mitigation_factor(inputs.armor, inputs.penetration)
}

/// What is being swung: an auto attack or an ability hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackProfile {
    pub base_damage: f64,
    pub damage_type: DamageType,
}

impl AttackProfile {
    pub fn auto_attack(attacker: &CombatStats) -> Self {
        Self {
            base_damage: attacker.max_damage,
            damage_type: attacker.damage_type,
        }
    }
}

/// Resource changes caused by a landed hit, all derived from its final damage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SideEffects {
    /// Damage reflected to the attacker by the defender's thorns.
    pub thorns: f64,
    /// Damage the defender returns to the attacker.
    pub retaliation: f64,
    /// HP restored to the attacker.
    pub life_steal: f64,
    /// MP restored to the attacker.
    pub mana_leech: f64,
}

impl SideEffects {
    pub fn damage_to_attacker(&self) -> f64 {
        self.thorns + self.retaliation
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttackOutcome {
    pub hit: bool,
    pub crit: bool,
    pub damage: f64,
    pub side_effects: SideEffects,
}

impl AttackOutcome {
    pub fn miss() -> Self {
        Self::default()
    }
}

pub fn side_effects_for(
    attacker: &CombatStats,
    defender: &CombatStats,
    damage_type: DamageType,
    damage: f64,
) -> SideEffects {
    SideEffects {
        thorns: damage * defender.thorns_for(damage_type),
        retaliation: damage * defender.retaliation,
        life_steal: damage * attacker.life_steal,
        mana_leech: damage * attacker.mana_leech,
    }
}

/// Resolves one attack. Draw order: hit roll, then (only on hit) crit roll.
pub fn resolve_attack(
    attacker: &CombatStats,
    defender: &CombatStats,
    profile: AttackProfile,
    rng: &mut Rng,
) -> AttackOutcome {
    if !rng.chance(hit_chance(attacker.accuracy, defender.evasion)) {
        return AttackOutcome::miss();
    }
    let crit = rng.chance(attacker.critical_rate);
    let damage = compute_damage(DamageInputs {
        base_damage: profile.base_damage,
        style_bonus: attacker.style_bonus,
        crit_multiplier: crit.then_some(attacker.critical_multiplier),
        amplify: attacker.amplify_for(profile.damage_type),
        armor: defender.defense_against(profile.damage_type),
        penetration: attacker.penetration_for(profile.damage_type),
    });
    AttackOutcome {
        hit: true,
        crit,
        damage,
        side_effects: side_effects_for(attacker, defender, profile.damage_type, damage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_accuracy_and_evasion_is_half() {
        assert_eq!(hit_chance(50.0, 50.0), 0.5);
        assert_eq!(hit_chance(0.0, 0.0), 0.5);
        assert_eq!(hit_chance(10.0, 0.0), 1.0);
        assert_eq!(hit_chance(0.0, 10.0), 0.0);
    }

    #[test]
    fn reference_pipeline_value() {
        let damage = compute_damage(DamageInputs {
            base_damage: 100.0,
            style_bonus: 0.2,
            crit_multiplier: Some(1.5),
            amplify: 0.25,
            armor: 50.0,
            penetration: 0.2,
        });
        assert!((damage - 160.714_285_714_285_7).abs() < 1e-9, "got {damage}");
    }

    #[test]
    fn zero_armor_and_full_penetration_do_not_mitigate() {
        assert_eq!(mitigation_factor(0.0, 0.0), 1.0);
        assert_eq!(mitigation_factor(500.0, 1.0), 1.0);
    }

    #[test]
    fn negative_armor_amplifies() {
        assert!((mitigation_factor(-20.0, 0.0) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn extreme_armor_stays_positive() {
        let damage = compute_damage(DamageInputs {
            base_damage: 1.0,
            style_bonus: 0.0,
            crit_multiplier: None,
            amplify: 0.0,
            armor: 1e300,
            penetration: 0.0,
        });
        assert!(damage > 0.0);
    }

    #[test]
    fn guaranteed_hit_never_misses() {
        let attacker = CombatStats {
            accuracy: 100.0,
            ..CombatStats::default()
        };
        let defender = CombatStats {
            evasion: 0.0,
            ..CombatStats::default()
        };
        let mut rng = Rng::new(1);
        for _ in 0..100 {
            let out = resolve_attack(
                &attacker,
                &defender,
                AttackProfile::auto_attack(&attacker),
                &mut rng,
            );
            assert!(out.hit);
            assert!(!out.crit);
            assert_eq!(out.damage, attacker.max_damage);
        }
    }

    #[test]
    fn side_effects_use_mitigated_damage() {
        let attacker = CombatStats {
            accuracy: 1.0,
            max_damage: 100.0,
            life_steal: 0.1,
            mana_leech: 0.05,
            ..CombatStats::default()
        };
        let defender = CombatStats {
            evasion: 0.0,
            armor: 100.0,
            physical_thorns: 0.2,
            elemental_thorns: 0.9,
            retaliation: 0.1,
            ..CombatStats::default()
        };
        let out = resolve_attack(
            &attacker,
            &defender,
            AttackProfile::auto_attack(&attacker),
            &mut Rng::new(9),
        );
        assert!((out.damage - 50.0).abs() < 1e-9);
        assert!((out.side_effects.thorns - 10.0).abs() < 1e-9);
        assert!((out.side_effects.retaliation - 5.0).abs() < 1e-9);
        assert!((out.side_effects.life_steal - 5.0).abs() < 1e-9);
        assert!((out.side_effects.mana_leech - 2.5).abs() < 1e-9);
        assert!((out.side_effects.damage_to_attacker() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn elemental_hits_use_resistance_and_magic_penetration() {
        let attacker = CombatStats {
            accuracy: 1.0,
            damage_type: DamageType::Fire,
            fire_amplify: 0.5,
            magic_penetration: 0.5,
            armor_penetration: 0.0,
            ..CombatStats::default()
        };
        let defender = CombatStats {
            evasion: 0.0,
            armor: 1_000.0,
            fire_resistance: 100.0,
            ..CombatStats::default()
        };
        let out = resolve_attack(
            &attacker,
            &defender,
            AttackProfile {
                base_damage: 60.0,
                damage_type: DamageType::Fire,
            },
            &mut Rng::new(2),
        );
        // 60 * 1.5 / (1 + 50 * 0.01)
        assert!((out.damage - 60.0).abs() < 1e-9);
    }
}
