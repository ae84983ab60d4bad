//! Load reference data, price tables and run inputs from JSON or YAML files.
//! The format is picked from the file extension (`.yaml`/`.yml`, anything else is JSON).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::data::game_data::ReferenceData;
use crate::data::market::PriceTable;

pub const DEFAULT_GAME_DATA_PATH: &str = "data/game_data.json";
pub const DEFAULT_MARKET_PATH: &str = "data/market.json";

#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "unable to read '{}': {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "unable to parse json '{}': {source}", path.display())
            }
            Self::Yaml { path, source } => {
                write!(f, "unable to parse yaml '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Yaml { source, .. } => Some(source),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

/// Parses `raw` as the format implied by `path`.
pub fn parse_document<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, LoadError> {
    if is_yaml(path) {
        serde_yaml::from_str(raw).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(raw).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn load_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, LoadError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(path, &raw)
}

pub fn load_reference_data(path: impl AsRef<Path>) -> Result<ReferenceData, LoadError> {
    let data: ReferenceData = load_document(path.as_ref())?;
    log::info!(
        "loaded reference data from {}: {} monsters, {} zones, {} items, {} abilities",
        path.as_ref().display(),
        data.monsters.len(),
        data.zones.len(),
        data.items.len(),
        data.abilities.len()
    );
    Ok(data)
}

pub fn load_price_table(path: impl AsRef<Path>) -> Result<PriceTable, LoadError> {
    let prices: PriceTable = load_document(path.as_ref())?;
    log::info!(
        "loaded {} market prices from {}",
        prices.market.len(),
        path.as_ref().display()
    );
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_is_chosen_by_extension() {
        let yaml = "market:\n  /items/hide:\n    ask: 5\n    bid: 4\n";
        let prices: PriceTable =
            parse_document(Path::new("prices.yml"), yaml).expect("yaml should parse");
        assert_eq!(prices.bid("/items/hide"), Some(4.0));
    }

    #[test]
    fn json_errors_carry_the_path() {
        let err = parse_document::<PriceTable>(Path::new("market.json"), "{not json")
            .expect_err("invalid json should fail");
        assert!(matches!(err, LoadError::Json { .. }));
        assert!(err.to_string().contains("market.json"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_price_table("does/not/exist.json").expect_err("missing file");
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
