//! Trigger engine: per-slot state machine deciding when an ability or consumable fires.
//!
//! Slots are evaluated in declaration order every tick. A slot fires when it is Idle and all
//! of its conditions hold; it is then Triggered for the rest of the tick and moves to
//! OnCooldown when the trigger phase settles.

use serde::{Deserialize, Serialize};

use crate::combat::buffs::{Buff, BuffType};
use crate::combat::stats::DamageType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum TriggerCondition {
    Always,
    HpPercentBelow { threshold: f64 },
    MpPercentBelow { threshold: f64 },
    MissingHpAtLeast { amount: f64 },
    MissingMpAtLeast { amount: f64 },
    TargetHpPercentBelow { threshold: f64 },
    LowestAllyHpPercentBelow { threshold: f64 },
    /// At least `interval_ms` since the slot last fired (or since the run started).
    IntervalElapsed { interval_ms: u64 },
    BuffInactive { buff_type: BuffType },
}

/// Snapshot of the state a trigger may look at, taken right before the slot is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerContext {
    pub now_ms: u64,
    pub hp: f64,
    pub max_hp: f64,
    pub mp: f64,
    pub max_mp: f64,
    /// None when the actor has no living target.
    pub target_hp_fraction: Option<f64>,
    pub lowest_ally_hp_fraction: f64,
    pub active_buff_types: Vec<BuffType>,
}

impl TriggerContext {
    fn fraction(current: f64, max: f64) -> f64 {
        if max <= 0.0 {
            0.0
        } else {
            current / max
        }
    }

    pub fn hp_fraction(&self) -> f64 {
        Self::fraction(self.hp, self.max_hp)
    }

    pub fn mp_fraction(&self) -> f64 {
        Self::fraction(self.mp, self.max_mp)
    }
}

impl TriggerCondition {
    pub fn holds(&self, ctx: &TriggerContext, last_fired_ms: Option<u64>) -> bool {
        match *self {
            Self::Always => true,
            Self::HpPercentBelow { threshold } => ctx.hp_fraction() < threshold,
            Self::MpPercentBelow { threshold } => ctx.mp_fraction() < threshold,
            Self::MissingHpAtLeast { amount } => ctx.max_hp - ctx.hp >= amount,
            Self::MissingMpAtLeast { amount } => ctx.max_mp - ctx.mp >= amount,
            Self::TargetHpPercentBelow { threshold } => ctx
                .target_hp_fraction
                .map_or(false, |fraction| fraction < threshold),
            Self::LowestAllyHpPercentBelow { threshold } => ctx.lowest_ally_hp_fraction < threshold,
            Self::IntervalElapsed { interval_ms } => {
                ctx.now_ms.saturating_sub(last_fired_ms.unwrap_or(0)) >= interval_ms
            }
            Self::BuffInactive { buff_type } => !ctx.active_buff_types.contains(&buff_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    SelfOnly,
    Target,
    AllEnemies,
    LowestHpAlly,
    AllAllies,
}

/// One effect of an ability. Level bonuses add per level above 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum AbilityEffect {
    Damage {
        #[serde(default = "default_enemy_target")]
        target: EffectTarget,
        #[serde(default)]
        damage_type: Option<DamageType>,
        #[serde(default)]
        damage_flat: f64,
        #[serde(default)]
        damage_flat_level_bonus: f64,
        #[serde(default)]
        damage_ratio: f64,
        #[serde(default)]
        damage_ratio_level_bonus: f64,
    },
    Heal {
        #[serde(default = "default_self_target")]
        target: EffectTarget,
        #[serde(default)]
        heal_flat: f64,
        #[serde(default)]
        heal_flat_level_bonus: f64,
        #[serde(default)]
        heal_ratio: f64,
        #[serde(default)]
        heal_ratio_level_bonus: f64,
    },
    ApplyBuff {
        #[serde(default = "default_self_target")]
        target: EffectTarget,
        buff: Buff,
    },
    RestoreMana {
        #[serde(default)]
        mana_flat: f64,
        #[serde(default)]
        mana_ratio: f64,
    },
}

fn default_enemy_target() -> EffectTarget {
    EffectTarget::Target
}

fn default_self_target() -> EffectTarget {
    EffectTarget::SelfOnly
}

fn leveled(base: f64, per_level: f64, level: u32) -> f64 {
    base + per_level * level.saturating_sub(1) as f64
}

impl AbilityEffect {
    /// Damage before the pipeline: `flat + ratio * attacker max damage`.
    pub fn base_damage(&self, level: u32, attacker_max_damage: f64) -> Option<f64> {
        match self {
            Self::Damage {
                damage_flat,
                damage_flat_level_bonus,
                damage_ratio,
                damage_ratio_level_bonus,
                ..
            } => Some(
                leveled(*damage_flat, *damage_flat_level_bonus, level)
                    + leveled(*damage_ratio, *damage_ratio_level_bonus, level) * attacker_max_damage,
            ),
            _ => None,
        }
    }

    pub fn heal_amount(&self, level: u32, target_max_hp: f64) -> Option<f64> {
        match self {
            Self::Heal {
                heal_flat,
                heal_flat_level_bonus,
                heal_ratio,
                heal_ratio_level_bonus,
                ..
            } => Some(
                leveled(*heal_flat, *heal_flat_level_bonus, level)
                    + leveled(*heal_ratio, *heal_ratio_level_bonus, level) * target_max_hp,
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotKind {
    Ability { ability_hrid: String, level: u32 },
    Food { item_hrid: String },
    Drink { item_hrid: String },
}

impl SlotKind {
    pub fn hrid(&self) -> &str {
        match self {
            Self::Ability { ability_hrid, .. } => ability_hrid,
            Self::Food { item_hrid } | Self::Drink { item_hrid } => item_hrid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    Idle,
    /// Fired during the current tick.
    Triggered,
    OnCooldown { remaining_ms: u64 },
}

/// Outcome reported by whoever applies a slot's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired,
    /// Not enough MP; the slot stays Idle and tries again next tick.
    InsufficientMana,
    /// Effect had nothing to act on (e.g. no living enemy); the slot stays Idle.
    NoTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSlot {
    pub kind: SlotKind,
    pub triggers: Vec<TriggerCondition>,
    pub cooldown_ms: u64,
    pub state: SlotState,
    pub last_fired_ms: Option<u64>,
    pub uses: u64,
}

impl ActionSlot {
    pub fn new(kind: SlotKind, triggers: Vec<TriggerCondition>, cooldown_ms: u64) -> Self {
        Self {
            kind,
            triggers,
            cooldown_ms,
            state: SlotState::Idle,
            last_fired_ms: None,
            uses: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == SlotState::Idle
    }

    /// Idle and every condition holds. An empty trigger list never fires.
    pub fn is_ready(&self, ctx: &TriggerContext) -> bool {
        self.is_idle()
            && !self.triggers.is_empty()
            && self
                .triggers
                .iter()
                .all(|condition| condition.holds(ctx, self.last_fired_ms))
    }

    pub fn mark_triggered(&mut self, now_ms: u64) {
        self.state = SlotState::Triggered;
        self.last_fired_ms = Some(now_ms);
        self.uses += 1;
    }

    /// Moves a Triggered slot onto its cooldown, shortened by ability haste.
    pub fn settle(&mut self, ability_haste: f64) {
        if self.state != SlotState::Triggered {
            return;
        }
        let cooldown = effective_cooldown_ms(self.cooldown_ms, ability_haste);
        self.state = if cooldown == 0 {
            SlotState::Idle
        } else {
            SlotState::OnCooldown {
                remaining_ms: cooldown,
            }
        };
    }

    pub fn tick(&mut self, elapsed_ms: u64) {
        if let SlotState::OnCooldown { remaining_ms } = self.state {
            let remaining_ms = remaining_ms.saturating_sub(elapsed_ms);
            self.state = if remaining_ms == 0 {
                SlotState::Idle
            } else {
                SlotState::OnCooldown { remaining_ms }
            };
        }
    }

    pub fn reset(&mut self) {
        self.state = SlotState::Idle;
        self.last_fired_ms = None;
    }
}

pub fn effective_cooldown_ms(cooldown_ms: u64, ability_haste: f64) -> u64 {
    if ability_haste <= 0.0 {
        return cooldown_ms;
    }
    (cooldown_ms as f64 * 100.0 / (100.0 + ability_haste)).round() as u64
}

/// Runs one trigger phase over `slots`: every Idle slot whose conditions hold is handed to
/// `fire`, in slot order, with a context rebuilt after each firing so a heal from slot 0 is
/// visible to slot 1. Returns the indices that fired.
pub fn run_trigger_phase<S, C, F>(
    state: &mut S,
    slot_count: usize,
    mut slot_mut: impl FnMut(&mut S, usize) -> &mut ActionSlot,
    mut context: C,
    mut fire: F,
) -> Vec<usize>
where
    C: FnMut(&S) -> TriggerContext,
    F: FnMut(&mut S, usize) -> FireOutcome,
{
    let mut fired = Vec::new();
    for idx in 0..slot_count {
        let ctx = context(state);
        if !slot_mut(state, idx).is_ready(&ctx) {
            continue;
        }
        if fire(state, idx) == FireOutcome::Fired {
            slot_mut(state, idx).mark_triggered(ctx.now_ms);
            fired.push(idx);
        }
    }
    fired
}
