//! Process configuration read from the environment.

use std::env;
use std::path::PathBuf;

use crate::data::{DEFAULT_GAME_DATA_PATH, DEFAULT_MARKET_PATH};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

pub const ENV_BIND: &str = "MWISIM_BIND";
pub const ENV_GAME_DATA: &str = "MWISIM_GAME_DATA";
pub const ENV_MARKET: &str = "MWISIM_MARKET";
pub const ENV_WORKERS: &str = "MWISIM_WORKERS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub game_data_path: PathBuf,
    pub market_path: PathBuf,
    /// Rayon threads for sweeps and batches. 0 uses every core.
    pub workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            game_data_path: PathBuf::from(DEFAULT_GAME_DATA_PATH),
            market_path: PathBuf::from(DEFAULT_MARKET_PATH),
            workers: 0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(bind) = get(ENV_BIND) {
            config.bind_addr = bind;
        }
        if let Some(path) = get(ENV_GAME_DATA) {
            config.game_data_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_MARKET) {
            config.market_path = PathBuf::from(path);
        }
        if let Some(raw) = get(ENV_WORKERS) {
            match raw.trim().parse::<usize>() {
                Ok(workers) => config.workers = workers,
                Err(_) => log::warn!("invalid {ENV_WORKERS} '{raw}', using all cores"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(AppConfig::from_lookup(|_| None), AppConfig::default());
    }

    #[test]
    fn overrides_and_bad_worker_counts() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_BIND, "0.0.0.0:8080"),
            (ENV_MARKET, "/tmp/market.yaml"),
            (ENV_WORKERS, "many"),
            (ENV_GAME_DATA, "  "),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.market_path, PathBuf::from("/tmp/market.yaml"));
        assert_eq!(config.game_data_path, PathBuf::from(DEFAULT_GAME_DATA_PATH));
        assert_eq!(config.workers, 0);

        let config = AppConfig::from_lookup(lookup(&[(ENV_WORKERS, "4")]));
        assert_eq!(config.workers, 4);
    }
}
