pub mod abilities;
pub mod buffs;
pub mod engine;
pub mod loot;
pub mod rng;
pub mod stacking;
pub mod stats;

pub use abilities::{
    effective_cooldown_ms, run_trigger_phase, AbilityEffect, ActionSlot, EffectTarget,
    FireOutcome, SlotKind, SlotState, TriggerCondition, TriggerContext,
};
pub use buffs::{
    combat_level, community_buff_flat, compute_effective_buffs, level_gap_buffs,
    level_gap_debuff, party_level_gap_debuffs, pass_buff, ActiveBuff, ActiveBuffs, Buff,
    BuffSource, BuffSources, BuffType, CommunityBuff, EffectiveBuffs,
};
pub use engine::{
    compute_damage, hit_chance, mitigation_factor, resolve_attack, side_effects_for,
    AttackOutcome, AttackProfile, DamageInputs, SideEffects, ARMOR_SCALE,
};
pub use loot::{
    expected_quantity, resolve_drops, DropOutcome, DropResult, DropTableEntry, LootBonuses,
};
pub use rng::{Rng, RngStream};
pub use stacking::{CategoryTotals, StackCategory, StackContribution, StatStacking};
pub use stats::{
    enhancement_multiplier, CombatStats, CombatStyle, DamageType, Skill, SkillLevels,
    WeaponProfile,
};
