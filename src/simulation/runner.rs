//! Tick-driven orchestrator for one run.
//!
//! Every tick of [TICK_MS] runs the same phases in order: timers, spawns and revives, buff
//! expiry, the trigger phase (players first), auto attacks, periodic regen, and finally
//! encounter bookkeeping plus the pool invariant check. Tick 0 only spawns the first
//! encounter.

use log::{debug, info};

use crate::combat::{
    resolve_attack, resolve_drops, run_trigger_phase, AbilityEffect, AttackProfile,
    DropTableEntry, EffectTarget, FireOutcome, LootBonuses, Rng, RngStream, Skill,
    TriggerContext,
};
use crate::data::{difficulty_multiplier, PriceTable, ReferenceData, ZoneDetail};
use crate::parallel::progress::{CancelToken, ProgressThrottle};
use crate::simulation::error::SimulationError;
use crate::simulation::input::SimulationInput;
use crate::simulation::party::{build_monster, build_party};
use crate::simulation::result::{PlayerSummary, RunState, SimulationResult};
use crate::simulation::spawn::{SpawnPolicy, StrengthBudgetPolicy};
use crate::simulation::state::{
    Actor, PlayerExtras, Recovery, SlotAction, ENEMY_RESPAWN_MS, PLAYER_RESPAWN_MS,
    REGEN_INTERVAL_MS, TICK_MS,
};

/// Share of each kill's experience per skill; the primary share goes to the style's power skill.
const PRIMARY_EXPERIENCE_SHARE: f64 = 0.3;
const EXPERIENCE_SHARES: [(Skill, f64); 4] = [
    (Skill::Attack, 0.2),
    (Skill::Defense, 0.2),
    (Skill::Stamina, 0.15),
    (Skill::Intelligence, 0.15),
];

/// Progress is reported at most once per this fraction of the run.
const PROGRESS_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Players,
    Monsters,
}

impl Side {
    fn opponent(self) -> Self {
        match self {
            Self::Players => Self::Monsters,
            Self::Monsters => Self::Players,
        }
    }
}

pub struct Simulator<'a> {
    data: &'a ReferenceData,
    prices: &'a PriceTable,
    input: &'a SimulationInput,
    zone: &'a ZoneDetail,
    spawn_policy: Box<dyn SpawnPolicy + 'a>,
    combat_rng: Rng,
    loot_rng: Rng,
    spawn_rng: Rng,
    players: Vec<Actor>,
    extras: Vec<PlayerExtras>,
    monsters: Vec<Actor>,
    /// Some while waiting for the next encounter or wave.
    spawn_countdown_ms: Option<u64>,
    encounter_index: u64,
    wave_index: usize,
    /// Set when the last living player dies; handled at the end of the tick.
    wipe_pending: bool,
    now_ms: u64,
    tick: u64,
    state: RunState,
    result: SimulationResult,
}

impl<'a> Simulator<'a> {
    /// Validates the input and sets up the party. Nothing is simulated yet.
    pub fn new(
        data: &'a ReferenceData,
        prices: &'a PriceTable,
        input: &'a SimulationInput,
    ) -> Result<Self, SimulationError> {
        input.validate(data)?;
        if prices.is_empty() {
            return Err(SimulationError::data_unavailable("market price table is empty"));
        }
        let zone = data.zone(&input.zone_hrid).ok_or_else(|| {
            SimulationError::configuration(format!("unknown zone '{}'", input.zone_hrid))
        })?;

        let seed = input.seed.unwrap_or_else(Rng::seed_from_entropy);
        let (players, extras) = build_party(input, data);
        let mut result = SimulationResult::new(&input.zone_hrid, input.difficulty_tier, seed);
        result.players = players
            .iter()
            .zip(&extras)
            .map(|(actor, extra)| PlayerSummary::new(actor.hrid.clone(), extra.level_gap_debuff))
            .collect();

        Ok(Self {
            data,
            prices,
            input,
            zone,
            spawn_policy: Box::new(StrengthBudgetPolicy),
            combat_rng: Rng::stream(seed, RngStream::Combat),
            loot_rng: Rng::stream(seed, RngStream::Loot),
            spawn_rng: Rng::stream(seed, RngStream::Spawn),
            players,
            extras,
            monsters: Vec::new(),
            spawn_countdown_ms: Some(0),
            encounter_index: 0,
            wave_index: 0,
            wipe_pending: false,
            now_ms: 0,
            tick: 0,
            state: RunState::Running,
            result,
        })
    }

    pub fn with_spawn_policy(mut self, policy: impl SpawnPolicy + 'a) -> Self {
        self.spawn_policy = Box::new(policy);
        self
    }

    pub fn seed(&self) -> u64 {
        self.result.seed
    }

    /// Runs to the end of the configured duration (or the first wipe when the run stops on
    /// wipes). `on_progress` sees non-decreasing fractions ending with 1.0.
    pub fn run(
        mut self,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(f64),
    ) -> Result<SimulationResult, SimulationError> {
        let total_ticks = self.input.duration_ms() / TICK_MS;
        info!(
            "simulating '{}' tier {} for {}h with {} player(s), seed {}",
            self.input.zone_hrid,
            self.input.difficulty_tier,
            self.input.duration_hours,
            self.players.len(),
            self.result.seed
        );

        let mut throttle = ProgressThrottle::new(PROGRESS_STEP);
        for tick in 0..=total_ticks {
            if cancel.is_cancelled() {
                info!("run cancelled at tick {tick}");
                return Err(SimulationError::Cancelled { tick });
            }
            self.tick = tick;
            self.now_ms = tick * TICK_MS;
            self.step()?;
            if let Some(fraction) = throttle.offer(tick as f64 / total_ticks.max(1) as f64) {
                on_progress(fraction);
            }
            if self.is_terminal() {
                break;
            }
        }

        if !self.is_terminal() {
            self.state = RunState::TimeExhausted;
        }
        self.result.end_state = self.state;
        self.result.simulated_ms = self.now_ms;
        self.result.ticks = self.tick;
        self.result.finalize(self.prices);
        if let Some(fraction) = throttle.offer(1.0) {
            on_progress(fraction);
        }
        info!(
            "run finished ({:?}) after {} encounters, {} kills, profit {:.0}",
            self.result.end_state,
            self.result.encounters,
            self.result.total_kills(),
            self.result.profit
        );
        Ok(self.result)
    }

    /// [Simulator::run] without progress or cancellation.
    pub fn run_to_completion(self) -> Result<SimulationResult, SimulationError> {
        self.run(&CancelToken::new(), |_| {})
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::PartyWiped | RunState::DungeonFailed)
    }

    fn step(&mut self) -> Result<(), SimulationError> {
        if self.tick > 0 {
            self.advance_timers();
        }
        self.revive_players();
        self.spawn_if_due();
        for actor in self.players.iter_mut().chain(self.monsters.iter_mut()) {
            actor.expire_buffs(self.now_ms);
        }

        if self.encounter_active() {
            self.trigger_phase(Side::Players);
            self.trigger_phase(Side::Monsters);
            self.auto_attacks(Side::Players);
            self.auto_attacks(Side::Monsters);
        }

        if self.tick > 0 && self.now_ms % REGEN_INTERVAL_MS == 0 {
            for actor in self.players.iter_mut().chain(self.monsters.iter_mut()) {
                actor.regenerate();
            }
        }

        let cleared = self.settle_encounter();
        if self.wipe_pending {
            self.handle_wipe(cleared);
        }
        self.check_invariants()
    }

    fn advance_timers(&mut self) {
        if let Some(remaining) = self.spawn_countdown_ms.as_mut() {
            *remaining = remaining.saturating_sub(TICK_MS);
        }
        for extra in &mut self.extras {
            if let Some(remaining) = extra.respawn_remaining_ms.as_mut() {
                *remaining = remaining.saturating_sub(TICK_MS);
            }
        }
        for actor in self.players.iter_mut().chain(self.monsters.iter_mut()) {
            actor.advance_timers(TICK_MS);
        }
    }

    fn revive_players(&mut self) {
        for (actor, extra) in self.players.iter_mut().zip(&mut self.extras) {
            if extra.respawn_remaining_ms == Some(0) {
                extra.respawn_remaining_ms = None;
                actor.revive(self.now_ms);
            }
        }
    }

    fn encounter_active(&self) -> bool {
        self.monsters.iter().any(|m| m.alive) && self.players.iter().any(|p| p.alive)
    }

    fn spawn_if_due(&mut self) {
        if self.spawn_countdown_ms != Some(0) || !self.players.iter().any(|p| p.alive) {
            return;
        }
        self.spawn_countdown_ms = None;

        let hrids = if let Some(dungeon) = &self.zone.dungeon {
            let Some(wave) = dungeon.waves.get(self.wave_index) else {
                return;
            };
            let wave_number = (self.wave_index + 1) as u32;
            self.result.max_wave_reached = self.result.max_wave_reached.max(wave_number);
            if self.state == RunState::DungeonComplete {
                self.state = RunState::Running;
            }
            debug!("wave {wave_number}/{} at {}ms", dungeon.waves.len(), self.now_ms);
            wave.monsters.clone()
        } else if let Some(info) = &self.zone.random_spawn {
            self.spawn_policy
                .next_encounter(info, self.encounter_index, &mut self.spawn_rng)
        } else {
            Vec::new()
        };

        let data = self.data;
        let tier = self.input.difficulty_tier;
        self.monsters = hrids
            .iter()
            .filter_map(|hrid| data.monster(hrid))
            .map(|detail| build_monster(detail, tier, data))
            .collect();
        for player in self.players.iter_mut().filter(|p| p.alive) {
            player.reset_attack_timer();
        }
    }

    fn side(&self, side: Side) -> &[Actor] {
        match side {
            Side::Players => &self.players,
            Side::Monsters => &self.monsters,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Vec<Actor> {
        match side {
            Side::Players => &mut self.players,
            Side::Monsters => &mut self.monsters,
        }
    }

    fn living(&self, side: Side) -> Vec<usize> {
        self.side(side)
            .iter()
            .enumerate()
            .filter(|(_, actor)| actor.alive)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Players focus the first living monster; monsters pick a player weighted by threat.
    fn pick_target(&mut self, attacker_side: Side) -> Option<usize> {
        let defenders = self.living(attacker_side.opponent());
        match attacker_side {
            Side::Players => defenders.first().copied(),
            Side::Monsters => {
                if defenders.len() <= 1 {
                    return defenders.first().copied();
                }
                let weights: Vec<f64> = defenders
                    .iter()
                    .map(|&idx| self.players[idx].stats.threat)
                    .collect();
                match self.combat_rng.weighted_index(&weights) {
                    Some(pick) => Some(defenders[pick]),
                    None => defenders.first().copied(),
                }
            }
        }
    }

    fn lowest_hp_ally(&self, side: Side) -> Option<usize> {
        self.living(side).into_iter().min_by(|&a, &b| {
            let actors = self.side(side);
            actors[a].hp_fraction().total_cmp(&actors[b].hp_fraction())
        })
    }

    fn trigger_context(&self, side: Side, idx: usize) -> TriggerContext {
        let actor = &self.side(side)[idx];
        let target_hp_fraction = self
            .side(side.opponent())
            .iter()
            .find(|enemy| enemy.alive)
            .map(Actor::hp_fraction);
        let lowest_ally_hp_fraction = self
            .side(side)
            .iter()
            .filter(|ally| ally.alive)
            .map(Actor::hp_fraction)
            .fold(1.0_f64, f64::min);
        TriggerContext {
            now_ms: self.now_ms,
            hp: actor.hp,
            max_hp: actor.stats.max_hitpoints,
            mp: actor.mp,
            max_mp: actor.stats.max_manapoints,
            target_hp_fraction,
            lowest_ally_hp_fraction,
            active_buff_types: actor.active_buffs.active_types(self.now_ms),
        }
    }

    fn trigger_phase(&mut self, side: Side) {
        for idx in 0..self.side(side).len() {
            if !self.side(side)[idx].alive {
                continue;
            }
            let slot_count = self.side(side)[idx].slots.len();
            run_trigger_phase(
                self,
                slot_count,
                |sim, slot| &mut sim.side_mut(side)[idx].slots[slot],
                |sim| sim.trigger_context(side, idx),
                |sim, slot| sim.fire_slot(side, idx, slot),
            );
            let actor = &mut self.side_mut(side)[idx];
            let haste = actor.stats.ability_haste;
            for slot in &mut actor.slots {
                slot.settle(haste);
            }
        }
    }

    fn fire_slot(&mut self, side: Side, idx: usize, slot: usize) -> FireOutcome {
        if !self.side(side)[idx].alive {
            return FireOutcome::NoTarget;
        }
        let action = self.side(side)[idx].actions[slot].clone();
        match action {
            SlotAction::Ability {
                ability_hrid,
                level,
                mana_cost,
                effects,
            } => {
                if self.side(side)[idx].mp < mana_cost {
                    if side == Side::Players {
                        self.result.mana_ran_out = true;
                    }
                    return FireOutcome::InsufficientMana;
                }
                let needs_enemy = effects
                    .iter()
                    .any(|effect| matches!(effect, AbilityEffect::Damage { .. }));
                if needs_enemy && self.living(side.opponent()).is_empty() {
                    return FireOutcome::NoTarget;
                }
                self.side_mut(side)[idx].mp -= mana_cost;
                if side == Side::Players {
                    let summary = &mut self.result.players[idx];
                    summary.mana_used += mana_cost;
                    *summary.ability_casts.entry(ability_hrid).or_default() += 1;
                }
                for effect in &effects {
                    self.apply_effect(side, idx, effect, level);
                }
                FireOutcome::Fired
            }
            SlotAction::Consumable { item_hrid, detail } => {
                let now = self.now_ms;
                let actor = &mut self.side_mut(side)[idx];
                if detail.recovery_duration_ms > 0 {
                    actor.recoveries.push(Recovery::new(
                        detail.hitpoint_restore,
                        detail.manapoint_restore,
                        detail.recovery_duration_ms,
                    ));
                } else {
                    actor.heal(detail.hitpoint_restore);
                    actor.restore_mana(detail.manapoint_restore);
                }
                for buff in &detail.buffs {
                    actor.apply_buff(buff, 1, now);
                }
                if side == Side::Players {
                    self.result.record_consumable(&item_hrid);
                    *self.result.players[idx]
                        .consumables_used
                        .entry(item_hrid)
                        .or_default() += 1;
                }
                FireOutcome::Fired
            }
        }
    }

    fn effect_allies(&self, side: Side, idx: usize, target: EffectTarget) -> Vec<usize> {
        match target {
            EffectTarget::SelfOnly | EffectTarget::Target | EffectTarget::AllEnemies => vec![idx],
            EffectTarget::LowestHpAlly => self.lowest_hp_ally(side).into_iter().collect(),
            EffectTarget::AllAllies => self.living(side),
        }
    }

    fn apply_effect(&mut self, side: Side, idx: usize, effect: &AbilityEffect, level: u32) {
        let now = self.now_ms;
        match effect {
            AbilityEffect::Damage {
                target,
                damage_type,
                ..
            } => {
                let attacker = self.side(side)[idx].stats;
                let base_damage = effect.base_damage(level, attacker.max_damage).unwrap_or(0.0);
                let profile = AttackProfile {
                    base_damage,
                    damage_type: damage_type.unwrap_or(attacker.damage_type),
                };
                let targets = match target {
                    EffectTarget::AllEnemies => self.living(side.opponent()),
                    _ => self.pick_target(side).into_iter().collect(),
                };
                for defender in targets {
                    if !self.side(side)[idx].alive {
                        break;
                    }
                    self.strike(side, idx, defender, profile);
                }
            }
            AbilityEffect::Heal { target, .. } => {
                for ally in self.effect_allies(side, idx, *target) {
                    let max_hp = self.side(side)[ally].stats.max_hitpoints;
                    let amount = effect.heal_amount(level, max_hp).unwrap_or(0.0);
                    let healed = self.side_mut(side)[ally].heal(amount);
                    if side == Side::Players {
                        self.result.players[idx].healing_done += healed;
                    }
                }
            }
            AbilityEffect::ApplyBuff { target, buff } => {
                let (target_side, targets) = match target {
                    EffectTarget::Target => {
                        (side.opponent(), self.pick_target(side).into_iter().collect())
                    }
                    EffectTarget::AllEnemies => (side.opponent(), self.living(side.opponent())),
                    other => (side, self.effect_allies(side, idx, *other)),
                };
                for t in targets {
                    self.side_mut(target_side)[t].apply_buff(buff, level, now);
                }
            }
            AbilityEffect::RestoreMana {
                mana_flat,
                mana_ratio,
            } => {
                let actor = &mut self.side_mut(side)[idx];
                let amount = mana_flat + mana_ratio * actor.stats.max_manapoints;
                actor.restore_mana(amount);
            }
        }
    }

    fn auto_attacks(&mut self, side: Side) {
        for idx in 0..self.side(side).len() {
            let actor = &self.side(side)[idx];
            if !actor.alive || actor.attack_countdown_ms > 0 {
                continue;
            }
            let Some(defender) = self.pick_target(side) else {
                return;
            };
            let profile = AttackProfile::auto_attack(&self.side(side)[idx].stats);
            self.strike(side, idx, defender, profile);
            self.side_mut(side)[idx].reset_attack_timer();
        }
    }

    /// One attack from `side[attacker]` on the opposing `defender`, with every side effect
    /// applied right away.
    fn strike(&mut self, side: Side, attacker: usize, defender: usize, profile: AttackProfile) {
        let opponent = side.opponent();
        let attacker_stats = self.side(side)[attacker].stats;
        let defender_stats = self.side(opponent)[defender].stats;
        let outcome = resolve_attack(&attacker_stats, &defender_stats, profile, &mut self.combat_rng);

        if side == Side::Players {
            let summary = &mut self.result.players[attacker];
            summary.attacks += 1;
            if outcome.hit {
                summary.hits += 1;
                summary.damage_dealt += outcome.damage;
            }
            if outcome.crit {
                summary.crits += 1;
            }
        }
        if !outcome.hit {
            return;
        }

        let defender_died = self.side_mut(opponent)[defender].take_damage(outcome.damage);
        let reflected = outcome.side_effects.damage_to_attacker();
        let attacker_actor = &mut self.side_mut(side)[attacker];
        attacker_actor.heal(outcome.side_effects.life_steal);
        attacker_actor.restore_mana(outcome.side_effects.mana_leech);
        let attacker_died = attacker_actor.take_damage(reflected);

        match side {
            Side::Players => self.result.players[attacker].damage_taken += reflected,
            Side::Monsters => self.result.players[defender].damage_taken += outcome.damage,
        }

        if defender_died {
            self.on_death(opponent, defender);
        }
        if attacker_died {
            self.on_death(side, attacker);
        }
    }

    fn on_death(&mut self, side: Side, idx: usize) {
        match side {
            Side::Players => self.on_player_death(idx),
            Side::Monsters => self.on_monster_death(idx),
        }
    }

    fn on_player_death(&mut self, idx: usize) {
        let hrid = self.players[idx].hrid.clone();
        *self.result.deaths.entry(hrid).or_default() += 1;
        self.result.players[idx].deaths += 1;
        self.extras[idx].respawn_remaining_ms = Some(PLAYER_RESPAWN_MS);
        if self.players.iter().all(|p| !p.alive) {
            self.wipe_pending = true;
        }
    }

    fn loot_bonuses(&self, player: usize) -> LootBonuses {
        let stats = &self.players[player].stats;
        LootBonuses {
            drop_rate: stats.drop_rate,
            rare_find: stats.rare_find,
            drop_quantity: stats.drop_quantity,
            quantity_multiplier: difficulty_multiplier(self.input.difficulty_tier),
        }
    }

    /// Rolls `table` once for every living player, on the loot stream.
    fn roll_loot(&mut self, table: &[DropTableEntry]) {
        for player in self.living(Side::Players) {
            let bonuses = self.loot_bonuses(player);
            let outcome = resolve_drops(table, &bonuses, Some(&mut self.loot_rng));
            for drop in &outcome.stochastic {
                self.result.record_drop(&drop.item_hrid, drop.quantity, 0.0);
            }
            for drop in &outcome.expected {
                self.result.record_drop(&drop.item_hrid, 0.0, drop.quantity);
            }
        }
    }

    fn on_monster_death(&mut self, idx: usize) {
        let data = self.data;
        let hrid = self.monsters[idx].hrid.clone();
        *self.result.kills.entry(hrid.clone()).or_default() += 1;
        let Some(detail) = data.monster(&hrid) else {
            return;
        };

        let experience = detail.experience_at(self.input.difficulty_tier);
        for player in self.living(Side::Players) {
            let stats = &self.players[player].stats;
            let gained = experience * (1.0 + stats.wisdom).max(0.0);
            let primary = stats.combat_style.power_skill();
            let summary = &mut self.result.players[player];
            *summary.experience.entry(primary).or_default() += gained * PRIMARY_EXPERIENCE_SHARE;
            for (skill, share) in EXPERIENCE_SHARES {
                *summary.experience.entry(skill).or_default() += gained * share;
            }
        }
        self.roll_loot(&detail.drop_table);
    }

    /// Handles a cleared field. Returns true when an encounter ended this tick.
    fn settle_encounter(&mut self) -> bool {
        if self.monsters.is_empty() || self.monsters.iter().any(|m| m.alive) {
            return false;
        }
        self.monsters.clear();
        self.result.encounters += 1;
        self.encounter_index += 1;
        self.spawn_countdown_ms = Some(ENEMY_RESPAWN_MS);

        let zone = self.zone;
        if let Some(dungeon) = &zone.dungeon {
            self.wave_index += 1;
            if self.wave_index >= dungeon.waves.len() {
                self.result.dungeons_completed += 1;
                self.state = RunState::DungeonComplete;
                self.wave_index = 0;
                debug!("dungeon completed at {}ms", self.now_ms);
                self.roll_loot(&dungeon.completion_drops);
            }
        }
        true
    }

    fn handle_wipe(&mut self, cleared_this_tick: bool) {
        self.wipe_pending = false;
        self.result.party_wipes += 1;
        let in_dungeon = self.zone.dungeon.is_some();
        let failed_dungeon = in_dungeon && !(cleared_this_tick && self.wave_index == 0);
        if failed_dungeon {
            self.result.dungeons_failed += 1;
        }
        debug!("party wiped at {}ms", self.now_ms);

        if self.input.settings.stop_on_party_wipe {
            self.state = if failed_dungeon {
                RunState::DungeonFailed
            } else {
                RunState::PartyWiped
            };
            return;
        }
        self.monsters.clear();
        self.wave_index = 0;
        self.spawn_countdown_ms = Some(PLAYER_RESPAWN_MS);
    }

    fn check_invariants(&self) -> Result<(), SimulationError> {
        for actor in self.players.iter().chain(&self.monsters) {
            actor.check_pools().map_err(|message| SimulationError::Fault {
                tick: self.tick,
                message,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{Buff, BuffType, SkillLevels, TriggerCondition};
    use crate::data::{
        AbilityDetail, ConsumableDetail, ConsumableKind, DungeonInfo, DungeonWave, ItemDetail,
        MarketPrice, MonsterCombatDetail, MonsterDetail, RandomSpawnInfo, SpawnEntry,
    };
    use crate::simulation::input::{AbilitySlotConfig, ConsumableSlot, GlobalSettings, PlayerConfig};
    use crate::simulation::spawn::FixedGroupPolicy;
    use std::collections::BTreeMap;

    fn monster(
        hrid: &str,
        hp: f64,
        accuracy: f64,
        damage: f64,
        drops: Vec<DropTableEntry>,
    ) -> MonsterDetail {
        MonsterDetail {
            hrid: hrid.to_string(),
            name: hrid.to_string(),
            experience: 10.0,
            combat: MonsterCombatDetail {
                max_hitpoints: hp,
                max_manapoints: 0.0,
                accuracy,
                evasion: 0.0,
                max_damage: damage,
                attack_interval_ms: 3_000,
                combat_style: Default::default(),
                damage_type: Default::default(),
                armor: 0.0,
                water_resistance: 0.0,
                nature_resistance: 0.0,
                fire_resistance: 0.0,
                critical_rate: 0.0,
                physical_thorns: 0.0,
                elemental_thorns: 0.0,
                retaliation: 0.0,
                life_steal: 0.0,
            },
            drop_table: drops,
            abilities: Vec::new(),
        }
    }

    fn hide_drop() -> DropTableEntry {
        DropTableEntry {
            item_hrid: "/items/hide".to_string(),
            drop_rate: 0.5,
            min_count: 1,
            max_count: 3,
            rare: false,
        }
    }

    fn single_spawn(hrid: &str) -> RandomSpawnInfo {
        RandomSpawnInfo {
            max_spawn_count: 1,
            max_total_strength: 1,
            spawns: vec![SpawnEntry {
                monster_hrid: hrid.to_string(),
                rate: 1.0,
                strength: 1,
            }],
            boss_spawns: Vec::new(),
            battles_per_boss: 0,
        }
    }

    fn data() -> ReferenceData {
        let mut data = ReferenceData::default();
        data.monsters.insert(
            "/monsters/rat".to_string(),
            monster("/monsters/rat", 1.0, 0.0, 0.0, vec![hide_drop()]),
        );
        data.monsters.insert(
            "/monsters/ogre".to_string(),
            monster("/monsters/ogre", 1_000_000.0, 1e9, 100_000.0, Vec::new()),
        );
        data.zones.insert(
            "/zones/sewer".to_string(),
            ZoneDetail {
                hrid: "/zones/sewer".to_string(),
                name: "Sewer".to_string(),
                random_spawn: Some(single_spawn("/monsters/rat")),
                dungeon: None,
            },
        );
        data.zones.insert(
            "/zones/cave".to_string(),
            ZoneDetail {
                hrid: "/zones/cave".to_string(),
                name: "Cave".to_string(),
                random_spawn: Some(single_spawn("/monsters/ogre")),
                dungeon: None,
            },
        );
        data.zones.insert(
            "/zones/crypt".to_string(),
            ZoneDetail {
                hrid: "/zones/crypt".to_string(),
                name: "Crypt".to_string(),
                random_spawn: None,
                dungeon: Some(DungeonInfo {
                    waves: vec![
                        DungeonWave {
                            monsters: vec!["/monsters/rat".to_string()],
                        },
                        DungeonWave {
                            monsters: vec!["/monsters/rat".to_string(), "/monsters/rat".to_string()],
                        },
                    ],
                    completion_drops: vec![DropTableEntry {
                        item_hrid: "/items/chest".to_string(),
                        drop_rate: 1.0,
                        min_count: 1,
                        max_count: 1,
                        rare: false,
                    }],
                }),
            },
        );
        data.items.insert(
            "/items/elixir".to_string(),
            ItemDetail {
                hrid: "/items/elixir".to_string(),
                name: "Elixir".to_string(),
                equipment: None,
                consumable: Some(ConsumableDetail {
                    kind: ConsumableKind::Drink,
                    hitpoint_restore: 0.0,
                    manapoint_restore: 0.0,
                    recovery_duration_ms: 0,
                    cooldown_ms: 60_000,
                    buffs: vec![Buff {
                        duration_ms: 60_000,
                        ..Buff::flat("/buffs/elixir", BuffType::Wisdom, 0.1)
                    }],
                }),
            },
        );
        data.abilities.insert(
            "/abilities/expensive".to_string(),
            AbilityDetail {
                hrid: "/abilities/expensive".to_string(),
                name: "Expensive".to_string(),
                mana_cost: 1_000_000.0,
                cooldown_ms: 5_000,
                effects: Vec::new(),
            },
        );
        data
    }

    fn prices() -> PriceTable {
        let mut market = BTreeMap::new();
        market.insert("/items/hide".to_string(), MarketPrice { ask: 12.0, bid: 10.0 });
        market.insert("/items/elixir".to_string(), MarketPrice { ask: 100.0, bid: 90.0 });
        market.insert("/items/chest".to_string(), MarketPrice { ask: 600.0, bid: 500.0 });
        PriceTable::new(market)
    }

    fn fighter(hrid: &str) -> PlayerConfig {
        let mut config = PlayerConfig::new(hrid);
        config.levels = SkillLevels {
            stamina: 10,
            intelligence: 10,
            defense: 10,
            attack: 10,
            melee: 10,
            ranged: 1,
            magic: 1,
        };
        config
    }

    fn input(zone: &str) -> SimulationInput {
        SimulationInput {
            players: vec![fighter("/players/a")],
            zone_hrid: zone.to_string(),
            difficulty_tier: 0,
            duration_hours: 1,
            settings: GlobalSettings::default(),
            seed: Some(7),
        }
    }

    #[test]
    fn empty_market_is_data_unavailable() {
        let d = data();
        let i = input("/zones/sewer");
        let empty = PriceTable::default();
        assert!(matches!(
            Simulator::new(&d, &empty, &i),
            Err(SimulationError::DataUnavailable(_))
        ));
    }

    #[test]
    fn one_shot_kills_follow_the_respawn_cadence() {
        let (d, p, i) = (data(), prices(), input("/zones/sewer"));
        let result = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("run completes");
        assert_eq!(result.end_state, RunState::TimeExhausted);
        // Spawn at 0, kill every 3s swing, 3s respawn: kills land at 3000 + 6000k ms.
        assert_eq!(result.encounters, 600);
        assert_eq!(result.kills["/monsters/rat"], 600);
        assert_eq!(result.players[0].attacks, 600);
        assert!(result.drops["/items/hide"].no_rng_count > 0.0);
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let (d, p, i) = (data(), prices(), input("/zones/sewer"));
        let a = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("first run");
        let b = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("second run");
        assert_eq!(a, b);
    }

    #[test]
    fn stop_on_wipe_ends_the_run() {
        let (d, p) = (data(), prices());
        let mut i = input("/zones/cave");
        i.settings.stop_on_party_wipe = true;
        let result = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("run completes");
        assert_eq!(result.end_state, RunState::PartyWiped);
        assert_eq!(result.party_wipes, 1);
        assert!(result.simulated_ms < i.duration_ms());
    }

    #[test]
    fn wipes_without_stop_respawn_the_party() {
        let (d, p, i) = (data(), prices(), input("/zones/cave"));
        let result = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("run completes");
        assert_eq!(result.end_state, RunState::TimeExhausted);
        assert!(result.party_wipes > 1);
        assert_eq!(result.deaths["/players/a"], result.party_wipes);
        assert_eq!(result.encounters, 0);
    }

    #[test]
    fn dungeon_waves_complete_and_restart() {
        let (d, p, i) = (data(), prices(), input("/zones/crypt"));
        let result = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("run completes");
        assert_eq!(result.max_wave_reached, 2);
        assert!(result.dungeons_completed > 0);
        assert_eq!(result.dungeons_failed, 0);
        assert_eq!(result.drops["/items/chest"].count, result.dungeons_completed as f64);
        assert_eq!(result.drops["/items/chest"].no_rng_count, result.dungeons_completed as f64);
    }

    #[test]
    fn unaffordable_ability_sets_mana_flag() {
        let (d, p) = (data(), prices());
        let mut i = input("/zones/sewer");
        i.players[0].abilities.push(AbilitySlotConfig {
            ability_hrid: "/abilities/expensive".to_string(),
            level: 1,
            triggers: None,
        });
        let result = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("run completes");
        assert!(result.mana_ran_out);
        assert!(result.players[0].ability_casts.is_empty());
    }

    #[test]
    fn drinks_are_costed_at_ask() {
        let (d, p) = (data(), prices());
        let mut i = input("/zones/sewer");
        i.players[0].drinks.push(ConsumableSlot {
            item_hrid: "/items/elixir".to_string(),
            triggers: Some(vec![TriggerCondition::BuffInactive {
                buff_type: BuffType::Wisdom,
            }]),
        });
        let result = Simulator::new(&d, &p, &i)
            .and_then(Simulator::run_to_completion)
            .expect("run completes");
        let used = result.consumables["/items/elixir"].count;
        assert!(used > 0);
        assert_eq!(result.consumable_costs, used as f64 * 100.0);
    }

    #[test]
    fn cancellation_stops_before_the_first_tick() {
        let (d, p, i) = (data(), prices(), input("/zones/sewer"));
        let token = CancelToken::new();
        token.cancel();
        let outcome = Simulator::new(&d, &p, &i).and_then(|sim| sim.run(&token, |_| {}));
        assert_eq!(outcome, Err(SimulationError::Cancelled { tick: 0 }));
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one() {
        let (d, p, i) = (data(), prices(), input("/zones/sewer"));
        let mut seen = Vec::new();
        Simulator::new(&d, &p, &i)
            .and_then(|sim| sim.run(&CancelToken::new(), |f| seen.push(f)))
            .expect("run completes");
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
        assert!(seen.len() <= 102);
    }

    #[test]
    fn fixed_group_policy_overrides_spawns() {
        let (d, p, i) = (data(), prices(), input("/zones/sewer"));
        let result = Simulator::new(&d, &p, &i)
            .map(|sim| {
                sim.with_spawn_policy(FixedGroupPolicy {
                    monsters: vec!["/monsters/rat".to_string(), "/monsters/rat".to_string()],
                })
            })
            .and_then(Simulator::run_to_completion)
            .expect("run completes");
        assert_eq!(result.kills["/monsters/rat"], 2 * result.encounters);
    }
}
