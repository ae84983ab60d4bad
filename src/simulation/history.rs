//! Run history: what a finished run looks like when handed to a store.
//!
//! Only the interface and an in-memory store live here; durable stores are provided by the
//! host.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::simulation::input::SimulationInput;
use crate::simulation::result::SimulationResult;

/// Bumped whenever [RunRecord]'s serialized shape changes.
pub const RUN_RECORD_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    /// RFC 3339, UTC.
    pub created_at: String,
    pub schema_version: u32,
    pub input: SimulationInput,
    pub result: SimulationResult,
}

impl RunRecord {
    pub fn new(input: SimulationInput, result: SimulationResult) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: chrono::Utc::now().to_rfc3339(),
            schema_version: RUN_RECORD_SCHEMA_VERSION,
            input,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    Storage(String),
    SchemaMismatch { found: u32, expected: u32 },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(msg) => write!(f, "history storage error: {msg}"),
            Self::SchemaMismatch { found, expected } => write!(
                f,
                "run record schema version {found} not supported (expected {expected})"
            ),
        }
    }
}

impl std::error::Error for HistoryError {}

pub trait RunHistory: Send + Sync {
    fn save(&self, record: RunRecord) -> Result<Uuid, HistoryError>;
    fn get(&self, run_id: &Uuid) -> Result<Option<RunRecord>, HistoryError>;
    /// Newest first, at most `limit`.
    fn recent(&self, limit: usize) -> Result<Vec<RunRecord>, HistoryError>;
}

pub const DEFAULT_HISTORY_CAPACITY: usize = 1_000;

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<Uuid, RunRecord>,
    /// Save order, oldest first.
    order: VecDeque<Uuid>,
}

/// Keeps the newest `capacity` records and drops the oldest beyond that.
#[derive(Debug)]
pub struct InMemoryRunHistory {
    records: Mutex<Records>,
    capacity: usize,
}

impl Default for InMemoryRunHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl InMemoryRunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Records::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Records>, HistoryError> {
        self.records
            .lock()
            .map_err(|_| HistoryError::Storage("history lock poisoned".to_string()))
    }
}

impl RunHistory for InMemoryRunHistory {
    fn save(&self, record: RunRecord) -> Result<Uuid, HistoryError> {
        if record.schema_version != RUN_RECORD_SCHEMA_VERSION {
            return Err(HistoryError::SchemaMismatch {
                found: record.schema_version,
                expected: RUN_RECORD_SCHEMA_VERSION,
            });
        }
        let run_id = record.run_id;
        let mut records = self.lock()?;
        if records.by_id.insert(run_id, record).is_none() {
            records.order.push_back(run_id);
        }
        while records.order.len() > self.capacity {
            if let Some(evicted) = records.order.pop_front() {
                records.by_id.remove(&evicted);
            }
        }
        Ok(run_id)
    }

    fn get(&self, run_id: &Uuid) -> Result<Option<RunRecord>, HistoryError> {
        Ok(self.lock()?.by_id.get(run_id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<RunRecord>, HistoryError> {
        let records = self.lock()?;
        Ok(records
            .order
            .iter()
            .rev()
            .filter_map(|run_id| records.by_id.get(run_id).cloned())
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::input::{GlobalSettings, PlayerConfig};

    fn record() -> RunRecord {
        let input = SimulationInput {
            players: vec![PlayerConfig::new("/players/a")],
            zone_hrid: "/zones/field".to_string(),
            difficulty_tier: 0,
            duration_hours: 1,
            settings: GlobalSettings::default(),
            seed: Some(3),
        };
        RunRecord::new(input, SimulationResult::new("/zones/field", 0, 3))
    }

    #[test]
    fn saved_records_are_found_by_id() {
        let history = InMemoryRunHistory::new();
        let rec = record();
        let id = history.save(rec.clone()).expect("save");
        assert_eq!(id, rec.run_id);
        assert_eq!(history.get(&id).expect("get"), Some(rec));
        assert_eq!(history.get(&Uuid::new_v4()).expect("get"), None);
    }

    #[test]
    fn oldest_records_are_dropped_past_capacity() {
        let history = InMemoryRunHistory::with_capacity(2);
        let ids: Vec<Uuid> = (0..3)
            .map(|_| history.save(record()).expect("save"))
            .collect();
        assert_eq!(history.get(&ids[0]).expect("get"), None);
        let recent: Vec<Uuid> = history
            .recent(10)
            .expect("recent")
            .iter()
            .map(|r| r.run_id)
            .collect();
        assert_eq!(recent, vec![ids[2], ids[1]]);
    }

    #[test]
    fn created_at_is_rfc3339() {
        let rec = record();
        assert!(chrono::DateTime::parse_from_rfc3339(&rec.created_at).is_ok());
        assert_eq!(rec.schema_version, RUN_RECORD_SCHEMA_VERSION);
    }

    #[test]
    fn foreign_schema_is_rejected() {
        let history = InMemoryRunHistory::new();
        let mut rec = record();
        rec.schema_version = 99;
        assert!(matches!(
            history.save(rec),
            Err(HistoryError::SchemaMismatch { found: 99, .. })
        ));
    }

    #[test]
    fn recent_is_limited() {
        let history = InMemoryRunHistory::new();
        for _ in 0..3 {
            history.save(record()).expect("save");
        }
        assert_eq!(history.recent(2).expect("recent").len(), 2);
    }
}
