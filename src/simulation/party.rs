//! Builds actors from the run input and reference data: stat blocks, static buffs and slots.

use crate::combat::{
    enhancement_multiplier, level_gap_buffs, party_level_gap_debuffs, pass_buff, ActionSlot,
    BuffSource, BuffSources, CombatStats, CommunityBuff, SkillLevels, SlotKind, StatStacking,
    TriggerCondition, WeaponProfile,
};
use crate::data::{ConsumableDetail, ConsumableKind, MonsterDetail, ReferenceData};
use crate::simulation::input::{GlobalSettings, PlayerConfig, SimulationInput};
use crate::simulation::state::{Actor, PlayerExtras, SlotAction};

/// Trigger used when a consumable slot has none configured.
pub fn default_consumable_triggers(detail: &ConsumableDetail) -> Vec<TriggerCondition> {
    let condition = match detail.kind {
        ConsumableKind::Food if detail.hitpoint_restore > 0.0 => TriggerCondition::MissingHpAtLeast {
            amount: detail.hitpoint_restore,
        },
        ConsumableKind::Food if detail.manapoint_restore > 0.0 => {
            TriggerCondition::MissingMpAtLeast {
                amount: detail.manapoint_restore,
            }
        }
        ConsumableKind::Drink => match detail.buffs.first() {
            Some(buff) => TriggerCondition::BuffInactive {
                buff_type: buff.type_hrid,
            },
            None if detail.manapoint_restore > 0.0 => TriggerCondition::MissingMpAtLeast {
                amount: detail.manapoint_restore,
            },
            None => TriggerCondition::Always,
        },
        ConsumableKind::Food => TriggerCondition::Always,
    };
    vec![condition]
}

fn weapon_profile(config: &PlayerConfig, data: &ReferenceData) -> WeaponProfile {
    config
        .equipment
        .iter()
        .filter(|(slot, _)| slot.is_weapon())
        .find_map(|(_, equipped)| {
            let weapon = data.item(&equipped.item_hrid)?.equipment.as_ref()?.weapon?;
            Some(weapon.profile(enhancement_multiplier(equipped.enhancement_level)))
        })
        .unwrap_or_default()
}

/// Collects every static buff source of one player, in precedence order.
pub fn player_buff_sources(
    config: &PlayerConfig,
    settings: &GlobalSettings,
    level_gap_debuff: f64,
    data: &ReferenceData,
) -> BuffSources {
    let mut sources = BuffSources::new();
    if settings.moopass {
        sources.push(BuffSource::Global, pass_buff(), 1);
    }
    for (community, tier) in [
        (CommunityBuff::Experience, settings.community_experience_tier),
        (CommunityBuff::Drop, settings.community_drop_tier),
    ] {
        if let Some(buff) = community.buff(tier) {
            sources.push(BuffSource::Community, buff, 1);
        }
    }
    for tier in &data.achievement_tiers {
        let complete = !tier.achievements.is_empty()
            && tier
                .achievements
                .iter()
                .all(|hrid| config.achievements.contains(hrid));
        if complete {
            sources.extend(BuffSource::Achievement, tier.buffs.iter().cloned(), 1);
        }
    }
    for (slot, equipped) in &config.equipment {
        let Some(equipment) = data
            .item(&equipped.item_hrid)
            .and_then(|item| item.equipment.as_ref())
        else {
            continue;
        };
        let multiplier = enhancement_multiplier(equipped.enhancement_level);
        for bonus in &equipment.stats {
            let mut buff = crate::combat::Buff::flat(
                format!("/equipment/{slot:?}/{}", bonus.buff_type.hrid()),
                bonus.buff_type,
                bonus.flat * multiplier,
            );
            buff.ratio_boost = bonus.ratio * multiplier;
            sources.push(BuffSource::Equipment, buff, 1);
        }
    }
    for (room_hrid, level) in &config.house_rooms {
        if let Some(room) = data.house_room(room_hrid) {
            sources.extend(BuffSource::HouseRoom, room.buffs.iter().cloned(), *level);
        }
    }
    sources.extend(BuffSource::LevelGap, level_gap_buffs(level_gap_debuff), 1);
    sources
}

pub fn build_player(
    config: &PlayerConfig,
    settings: &GlobalSettings,
    level_gap_debuff: f64,
    data: &ReferenceData,
) -> Actor {
    let base = CombatStats::player_base(&config.levels, &weapon_profile(config, data));
    let static_buffs = player_buff_sources(config, settings, level_gap_debuff, data).resolve();
    let mut actor = Actor::new(config.hrid.clone(), base, static_buffs);

    for slot in &config.abilities {
        let Some(ability) = data.ability(&slot.ability_hrid) else {
            continue;
        };
        let triggers = slot
            .triggers
            .clone()
            .unwrap_or_else(|| vec![TriggerCondition::Always]);
        actor = actor.with_slot(
            ActionSlot::new(
                SlotKind::Ability {
                    ability_hrid: slot.ability_hrid.clone(),
                    level: slot.level,
                },
                triggers,
                ability.cooldown_ms,
            ),
            SlotAction::Ability {
                ability_hrid: slot.ability_hrid.clone(),
                level: slot.level,
                mana_cost: ability.mana_cost,
                effects: ability.effects.clone(),
            },
        );
    }

    for slot in config.food.iter().chain(&config.drinks) {
        let Some(detail) = data
            .item(&slot.item_hrid)
            .and_then(|item| item.consumable.as_ref())
        else {
            continue;
        };
        let kind = match detail.kind {
            ConsumableKind::Food => SlotKind::Food {
                item_hrid: slot.item_hrid.clone(),
            },
            ConsumableKind::Drink => SlotKind::Drink {
                item_hrid: slot.item_hrid.clone(),
            },
        };
        let triggers = slot
            .triggers
            .clone()
            .unwrap_or_else(|| default_consumable_triggers(detail));
        actor = actor.with_slot(
            ActionSlot::new(kind, triggers, detail.cooldown_ms),
            SlotAction::Consumable {
                item_hrid: slot.item_hrid.clone(),
                detail: detail.clone(),
            },
        );
    }
    actor
}

/// Player actors and their runtime extras, in party order.
pub fn build_party(input: &SimulationInput, data: &ReferenceData) -> (Vec<Actor>, Vec<PlayerExtras>) {
    let levels: Vec<SkillLevels> = input.players.iter().map(|p| p.levels).collect();
    let debuffs = party_level_gap_debuffs(&levels);
    input
        .players
        .iter()
        .zip(debuffs)
        .map(|(config, debuff)| {
            let actor = build_player(config, &input.settings, debuff, data);
            let extras = PlayerExtras {
                levels: config.levels,
                level_gap_debuff: debuff,
                respawn_remaining_ms: None,
            };
            (actor, extras)
        })
        .unzip()
}

/// Monster at a difficulty tier, with one always-on slot per ability it knows.
pub fn build_monster(detail: &MonsterDetail, tier: u8, data: &ReferenceData) -> Actor {
    let mut actor = Actor::new(detail.hrid.clone(), detail.combat_stats(tier), StatStacking::new());
    for known in &detail.abilities {
        let Some(ability) = data.ability(&known.ability_hrid) else {
            log::warn!(
                "monster '{}' knows unknown ability '{}', skipping",
                detail.hrid,
                known.ability_hrid
            );
            continue;
        };
        actor = actor.with_slot(
            ActionSlot::new(
                SlotKind::Ability {
                    ability_hrid: known.ability_hrid.clone(),
                    level: known.level,
                },
                vec![TriggerCondition::Always],
                ability.cooldown_ms,
            ),
            SlotAction::Ability {
                ability_hrid: known.ability_hrid.clone(),
                level: known.level,
                mana_cost: ability.mana_cost,
                effects: ability.effects.clone(),
            },
        );
    }
    actor
}
