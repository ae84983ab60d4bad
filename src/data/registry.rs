//! Startup-loaded data cache for the server and CLI.
//! Load once, share via Arc with handlers and worker threads instead of reloading per request.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::data::game_data::ReferenceData;
use crate::data::loader::{load_price_table, load_reference_data, LoadError};
use crate::data::market::PriceTable;

/// Zone listing entry for API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneSummary {
    pub hrid: String,
    pub name: String,
    pub is_dungeon: bool,
    pub monster_count: usize,
}

#[derive(Debug)]
pub struct DataRegistry {
    pub game_data: Arc<ReferenceData>,
    pub prices: Arc<PriceTable>,
}

impl DataRegistry {
    pub fn new(game_data: ReferenceData, prices: PriceTable) -> Arc<DataRegistry> {
        Arc::new(DataRegistry {
            game_data: Arc::new(game_data),
            prices: Arc::new(prices),
        })
    }

    /// Loads reference data and the price table from disk. Both are required.
    pub fn load(
        game_data_path: impl AsRef<Path>,
        market_path: impl AsRef<Path>,
    ) -> Result<Arc<DataRegistry>, LoadError> {
        let game_data = load_reference_data(game_data_path)?;
        let prices = load_price_table(market_path)?;
        Ok(Self::new(game_data, prices))
    }

    pub fn zones(&self) -> Vec<ZoneSummary> {
        self.game_data
            .zones
            .values()
            .map(|zone| {
                let mut monsters = zone.monster_hrids();
                monsters.sort_unstable();
                monsters.dedup();
                ZoneSummary {
                    hrid: zone.hrid.clone(),
                    name: zone.name.clone(),
                    is_dungeon: zone.is_dungeon(),
                    monster_count: monsters.len(),
                }
            })
            .collect()
    }
}
