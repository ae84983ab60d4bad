use std::fmt;
use std::path::Path;

use crate::combat::DropTableEntry;
use crate::data::game_data::{ReferenceData, ZoneDetail};
use crate::data::loader::{load_reference_data, LoadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == ValidationSeverity::Error)
            .count()
    }
}

pub fn validate_reference_file(path: impl AsRef<Path>) -> Result<ValidationReport, LoadError> {
    let data = load_reference_data(path)?;
    Ok(validate_reference_data(&data))
}

pub fn validate_reference_data(data: &ReferenceData) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (key, monster) in &data.monsters {
        let context = format!("monsters['{key}']");
        check_key(&mut report, &context, key, &monster.hrid);
        let c = &monster.combat;
        if !(c.max_hitpoints > 0.0) {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.combat.max_hitpoints"),
                "must be positive",
            );
        }
        for (name, value) in [
            ("accuracy", c.accuracy),
            ("evasion", c.evasion),
            ("max_damage", c.max_damage),
            ("max_manapoints", c.max_manapoints),
        ] {
            if !value.is_finite() || value < 0.0 {
                report.push(
                    ValidationSeverity::Error,
                    format!("{context}.combat.{name}"),
                    "must be a non-negative number",
                );
            }
        }
        if c.attack_interval_ms == 0 {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.combat.attack_interval_ms"),
                "must be positive",
            );
        }
        validate_drop_table(&mut report, &format!("{context}.drop_table"), &monster.drop_table);
        for (idx, ability) in monster.abilities.iter().enumerate() {
            if data.ability(&ability.ability_hrid).is_none() {
                report.push(
                    ValidationSeverity::Error,
                    format!("{context}.abilities[{idx}]"),
                    format!("unknown ability '{}'", ability.ability_hrid),
                );
            }
        }
    }

    for (key, zone) in &data.zones {
        let context = format!("zones['{key}']");
        check_key(&mut report, &context, key, &zone.hrid);
        validate_zone(&mut report, &context, zone, data);
    }

    for (key, item) in &data.items {
        let context = format!("items['{key}']");
        check_key(&mut report, &context, key, &item.hrid);
        if let Some(weapon) = item.equipment.as_ref().and_then(|e| e.weapon.as_ref()) {
            if weapon.attack_interval_ms == 0 {
                report.push(
                    ValidationSeverity::Error,
                    format!("{context}.equipment.weapon.attack_interval_ms"),
                    "must be positive",
                );
            }
        }
        if let Some(consumable) = &item.consumable {
            if consumable.cooldown_ms == 0 {
                report.push(
                    ValidationSeverity::Warning,
                    format!("{context}.consumable.cooldown_ms"),
                    "zero cooldown lets the consumable fire every tick",
                );
            }
            if consumable.hitpoint_restore <= 0.0
                && consumable.manapoint_restore <= 0.0
                && consumable.buffs.is_empty()
            {
                report.push(
                    ValidationSeverity::Warning,
                    context.clone(),
                    "consumable has no effect",
                );
            }
        }
    }

    for (key, ability) in &data.abilities {
        let context = format!("abilities['{key}']");
        check_key(&mut report, &context, key, &ability.hrid);
        if ability.cooldown_ms == 0 {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.cooldown_ms"),
                "must be positive",
            );
        }
        if ability.effects.is_empty() {
            report.push(ValidationSeverity::Warning, context, "ability has no effects");
        }
    }

    for (key, room) in &data.house_rooms {
        check_key(&mut report, &format!("house_rooms['{key}']"), key, &room.hrid);
    }

    for (idx, tier) in data.achievement_tiers.iter().enumerate() {
        if tier.achievements.is_empty() {
            report.push(
                ValidationSeverity::Warning,
                format!("achievement_tiers[{idx}] '{}'", tier.hrid),
                "tier lists no achievements and always applies",
            );
        }
    }

    if data.zones.is_empty() {
        report.push(ValidationSeverity::Info, "zones", "no zones defined");
    }

    report
}

fn check_key(report: &mut ValidationReport, context: &str, key: &str, hrid: &str) {
    if key != hrid {
        report.push(
            ValidationSeverity::Error,
            format!("{context}.hrid"),
            format!("hrid '{hrid}' does not match its key"),
        );
    }
}

fn validate_drop_table(report: &mut ValidationReport, context: &str, table: &[DropTableEntry]) {
    for (idx, entry) in table.iter().enumerate() {
        let entry_context = format!("{context}[{idx}] '{}'", entry.item_hrid);
        if !(0.0..=1.0).contains(&entry.drop_rate) {
            report.push(
                ValidationSeverity::Error,
                entry_context.clone(),
                format!("drop_rate {} outside [0, 1]", entry.drop_rate),
            );
        }
        if entry.min_count > entry.max_count {
            report.push(
                ValidationSeverity::Error,
                entry_context,
                format!("min_count {} > max_count {}", entry.min_count, entry.max_count),
            );
        }
    }
}

fn validate_zone(
    report: &mut ValidationReport,
    context: &str,
    zone: &ZoneDetail,
    data: &ReferenceData,
) {
    if zone.random_spawn.is_none() && zone.dungeon.is_none() {
        report.push(
            ValidationSeverity::Error,
            context,
            "zone has neither random spawns nor dungeon waves",
        );
    }
    if let Some(spawn) = &zone.random_spawn {
        if spawn.max_spawn_count == 0 {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.random_spawn.max_spawn_count"),
                "must be positive",
            );
        }
        if !spawn.spawns.iter().any(|entry| entry.rate > 0.0) {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.random_spawn.spawns"),
                "no spawn entry has a positive rate",
            );
        }
        if spawn.battles_per_boss > 0 && spawn.boss_spawns.is_empty() {
            report.push(
                ValidationSeverity::Warning,
                format!("{context}.random_spawn.boss_spawns"),
                "battles_per_boss is set but no boss is listed",
            );
        }
    }
    if let Some(dungeon) = &zone.dungeon {
        if dungeon.waves.is_empty() {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.dungeon.waves"),
                "dungeon has no waves",
            );
        }
        for (idx, wave) in dungeon.waves.iter().enumerate() {
            if wave.monsters.is_empty() {
                report.push(
                    ValidationSeverity::Error,
                    format!("{context}.dungeon.waves[{idx}]"),
                    "wave has no monsters",
                );
            }
        }
        validate_drop_table(
            report,
            &format!("{context}.dungeon.completion_drops"),
            &dungeon.completion_drops,
        );
    }
    for hrid in zone.monster_hrids() {
        if data.monster(hrid).is_none() {
            report.push(
                ValidationSeverity::Error,
                context,
                format!("unknown monster '{hrid}'"),
            );
        }
    }
}
