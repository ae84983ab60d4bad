//! Mutable per-run combat state of players and monsters.

use crate::combat::{
    compute_effective_buffs, AbilityEffect, ActionSlot, ActiveBuffs, Buff, BuffType, CombatStats,
    SkillLevels, StatStacking,
};
use crate::data::ConsumableDetail;

pub const TICK_MS: u64 = 100;
pub const ENEMY_RESPAWN_MS: u64 = 3_000;
pub const PLAYER_RESPAWN_MS: u64 = 150_000;
pub const REGEN_INTERVAL_MS: u64 = 10_000;
pub const RECOVERY_TICK_MS: u64 = 3_000;

/// What a slot does when it fires, resolved from reference data at setup.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotAction {
    Ability {
        ability_hrid: String,
        level: u32,
        mana_cost: f64,
        effects: Vec<AbilityEffect>,
    },
    Consumable {
        item_hrid: String,
        detail: ConsumableDetail,
    },
}

/// Restore spread over time by a food or drink, applied every [RECOVERY_TICK_MS].
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub hp_per_tick: f64,
    pub mp_per_tick: f64,
    pub ticks_remaining: u32,
    pub countdown_ms: u64,
}

impl Recovery {
    pub fn new(hp_total: f64, mp_total: f64, duration_ms: u64) -> Self {
        let ticks = (duration_ms / RECOVERY_TICK_MS).max(1) as u32;
        Self {
            hp_per_tick: hp_total / f64::from(ticks),
            mp_per_tick: mp_total / f64::from(ticks),
            ticks_remaining: ticks,
            countdown_ms: RECOVERY_TICK_MS,
        }
    }
}

/// One combatant. Players and monsters share the same shape so abilities work for both sides.
#[derive(Debug, Clone)]
pub struct Actor {
    pub hrid: String,
    pub base_stats: CombatStats,
    pub static_buffs: StatStacking<BuffType>,
    pub active_buffs: ActiveBuffs,
    pub stats: CombatStats,
    pub hp: f64,
    pub mp: f64,
    pub alive: bool,
    /// Time until the next auto attack; the attack lands on the tick it reaches zero.
    pub attack_countdown_ms: u64,
    pub slots: Vec<ActionSlot>,
    /// Parallel to `slots`.
    pub actions: Vec<SlotAction>,
    pub recoveries: Vec<Recovery>,
}

impl Actor {
    pub fn new(
        hrid: impl Into<String>,
        base_stats: CombatStats,
        static_buffs: StatStacking<BuffType>,
    ) -> Self {
        let mut actor = Self {
            hrid: hrid.into(),
            base_stats,
            static_buffs,
            active_buffs: ActiveBuffs::new(),
            stats: base_stats,
            hp: 0.0,
            mp: 0.0,
            alive: true,
            attack_countdown_ms: base_stats.attack_interval_ms,
            slots: Vec::new(),
            actions: Vec::new(),
            recoveries: Vec::new(),
        };
        actor.refresh_stats(0);
        actor.hp = actor.stats.max_hitpoints;
        actor.mp = actor.stats.max_manapoints;
        actor.reset_attack_timer();
        actor
    }

    pub fn with_slot(mut self, slot: ActionSlot, action: SlotAction) -> Self {
        self.slots.push(slot);
        self.actions.push(action);
        self
    }

    /// Recomputes effective stats from static and timed buffs, capping pools at the new maxima.
    pub fn refresh_stats(&mut self, now_ms: u64) {
        let buffs = compute_effective_buffs(&self.static_buffs, &self.active_buffs, now_ms);
        self.stats = self.base_stats.with_buffs(&buffs);
        self.hp = self.hp.min(self.stats.max_hitpoints);
        self.mp = self.mp.min(self.stats.max_manapoints);
    }

    pub fn apply_buff(&mut self, buff: &Buff, level: u32, now_ms: u64) {
        self.active_buffs.apply(buff, level, now_ms);
        self.refresh_stats(now_ms);
    }

    pub fn expire_buffs(&mut self, now_ms: u64) {
        if self.active_buffs.expire(now_ms) {
            self.refresh_stats(now_ms);
        }
    }

    pub fn reset_attack_timer(&mut self) {
        self.attack_countdown_ms = self.stats.attack_interval_ms;
    }

    pub fn hp_fraction(&self) -> f64 {
        if self.stats.max_hitpoints <= 0.0 {
            0.0
        } else {
            self.hp / self.stats.max_hitpoints
        }
    }

    /// Subtracts damage; returns true when this blow killed the actor.
    pub fn take_damage(&mut self, amount: f64) -> bool {
        if !self.alive || amount <= 0.0 {
            return false;
        }
        self.hp -= amount;
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.alive = false;
            return true;
        }
        false
    }

    /// Returns the HP actually restored.
    pub fn heal(&mut self, amount: f64) -> f64 {
        if !self.alive || amount <= 0.0 {
            return 0.0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.stats.max_hitpoints);
        self.hp - before
    }

    pub fn restore_mana(&mut self, amount: f64) -> f64 {
        if !self.alive || amount <= 0.0 {
            return 0.0;
        }
        let before = self.mp;
        self.mp = (self.mp + amount).min(self.stats.max_manapoints);
        self.mp - before
    }

    /// Advances cooldowns, the attack timer and recoveries by one tick.
    pub fn advance_timers(&mut self, elapsed_ms: u64) {
        for slot in &mut self.slots {
            slot.tick(elapsed_ms);
        }
        if !self.alive {
            return;
        }
        self.attack_countdown_ms = self.attack_countdown_ms.saturating_sub(elapsed_ms);

        let mut hp = 0.0;
        let mut mp = 0.0;
        for recovery in &mut self.recoveries {
            recovery.countdown_ms = recovery.countdown_ms.saturating_sub(elapsed_ms);
            if recovery.countdown_ms == 0 && recovery.ticks_remaining > 0 {
                hp += recovery.hp_per_tick;
                mp += recovery.mp_per_tick;
                recovery.ticks_remaining -= 1;
                recovery.countdown_ms = RECOVERY_TICK_MS;
            }
        }
        self.recoveries.retain(|recovery| recovery.ticks_remaining > 0);
        self.heal(hp);
        self.restore_mana(mp);
    }

    pub fn regenerate(&mut self) {
        let hp = self.stats.max_hitpoints * self.stats.hp_regen;
        let mp = self.stats.max_manapoints * self.stats.mp_regen;
        self.heal(hp);
        self.restore_mana(mp);
    }

    /// Brings a dead player back with full pools and no timed buffs.
    pub fn revive(&mut self, now_ms: u64) {
        self.active_buffs.clear_timed();
        self.recoveries.clear();
        self.alive = true;
        self.refresh_stats(now_ms);
        self.hp = self.stats.max_hitpoints;
        self.mp = self.stats.max_manapoints;
        for slot in &mut self.slots {
            slot.reset();
        }
        self.reset_attack_timer();
    }

    /// Invariant check run after every tick.
    pub fn check_pools(&self) -> Result<(), String> {
        if !self.hp.is_finite() || !self.mp.is_finite() {
            return Err(format!("'{}' has a non-finite pool (hp {}, mp {})", self.hrid, self.hp, self.mp));
        }
        if self.hp < 0.0 || self.mp < -1e-9 {
            return Err(format!("'{}' pool underflow (hp {}, mp {})", self.hrid, self.hp, self.mp));
        }
        if self.hp > self.stats.max_hitpoints + 1e-6 {
            return Err(format!(
                "'{}' hp {} above max {}",
                self.hrid, self.hp, self.stats.max_hitpoints
            ));
        }
        Ok(())
    }
}

/// Player-only runtime facts, parallel to the player actors.
#[derive(Debug, Clone)]
pub struct PlayerExtras {
    pub levels: SkillLevels,
    pub level_gap_debuff: f64,
    /// Some while dead.
    pub respawn_remaining_ms: Option<u64>,
}
