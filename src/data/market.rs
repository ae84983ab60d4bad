//! Marketplace price table. Drops are valued at the bid, consumables cost the ask.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::game_data::COIN_HRID;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub ask: f64,
    pub bid: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    /// Unix seconds of the snapshot, when known.
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub market: BTreeMap<String, MarketPrice>,
}

impl PriceTable {
    pub fn new(market: BTreeMap<String, MarketPrice>) -> Self {
        Self {
            timestamp: None,
            market,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.market.is_empty()
    }

    /// Sell value of one unit. Negative prices mean "no listing" and count as missing.
    pub fn bid(&self, item_hrid: &str) -> Option<f64> {
        if item_hrid == COIN_HRID {
            return Some(1.0);
        }
        self.market
            .get(item_hrid)
            .map(|price| price.bid)
            .filter(|bid| *bid >= 0.0)
    }

    /// Purchase cost of one unit.
    pub fn ask(&self, item_hrid: &str) -> Option<f64> {
        if item_hrid == COIN_HRID {
            return Some(1.0);
        }
        self.market
            .get(item_hrid)
            .map(|price| price.ask)
            .filter(|ask| *ask >= 0.0)
    }
}
