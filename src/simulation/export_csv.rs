//! CSV export of a finished run: one row per dropped item, consumable and player.

use std::fmt;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::simulation::result::SimulationResult;

#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Csv(csv::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "export io error: {e}"),
            Self::Csv(e) => write!(f, "export csv error: {e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

/// Flat row shared by every section so the file has a single header.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    section: &'static str,
    hrid: &'a str,
    count: f64,
    no_rng_count: f64,
    price: f64,
    value: f64,
    no_rng_value: f64,
    per_hour: f64,
}

fn per_hour(value: f64, hours: f64) -> f64 {
    if hours > 0.0 {
        value / hours
    } else {
        0.0
    }
}

/// Writes a finalized result. Consumable values are negative so a column sum is the profit.
pub fn write_result_csv<W: io::Write>(result: &SimulationResult, writer: W) -> Result<(), ExportError> {
    let hours = result.simulated_hours();
    let mut out = csv::Writer::from_writer(writer);

    for (hrid, drop) in &result.drops {
        out.serialize(ExportRow {
            section: "drop",
            hrid,
            count: drop.count,
            no_rng_count: drop.no_rng_count,
            price: drop.price,
            value: drop.value,
            no_rng_value: drop.no_rng_value,
            per_hour: per_hour(drop.count, hours),
        })?;
    }
    for (hrid, used) in &result.consumables {
        let count = used.count as f64;
        out.serialize(ExportRow {
            section: "consumable",
            hrid,
            count,
            no_rng_count: count,
            price: used.price,
            value: -used.cost,
            no_rng_value: -used.cost,
            per_hour: per_hour(count, hours),
        })?;
    }
    for player in &result.players {
        let experience = player.total_experience();
        out.serialize(ExportRow {
            section: "experience",
            hrid: &player.hrid,
            count: experience,
            no_rng_count: experience,
            price: 0.0,
            value: 0.0,
            no_rng_value: 0.0,
            per_hour: per_hour(experience, hours),
        })?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_result_csv_file(result: &SimulationResult, path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_result_csv(result, io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MarketPrice, PriceTable};
    use crate::simulation::result::PlayerSummary;
    use std::collections::BTreeMap;

    #[test]
    fn rows_cover_drops_consumables_and_players() {
        let mut market = BTreeMap::new();
        market.insert("/items/hide".to_string(), MarketPrice { ask: 12.0, bid: 10.0 });
        market.insert("/items/stew".to_string(), MarketPrice { ask: 5.0, bid: 4.0 });
        let mut result = SimulationResult::new("/zones/field", 0, 1);
        result.simulated_ms = 3_600_000;
        result.record_drop("/items/hide", 3.0, 2.5);
        result.record_consumable("/items/stew");
        let mut player = PlayerSummary::new("/players/a", 0.0);
        player.experience.insert(crate::combat::Skill::Attack, 40.0);
        result.players.push(player);
        result.finalize(&PriceTable::new(market));

        let mut buf = Vec::new();
        write_result_csv(&result, &mut buf).expect("export");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "section,hrid,count,no_rng_count,price,value,no_rng_value,per_hour"
        );
        assert_eq!(lines[1], "drop,/items/hide,3.0,2.5,10.0,30.0,25.0,3.0");
        assert_eq!(lines[2], "consumable,/items/stew,1.0,1.0,5.0,-5.0,-5.0,1.0");
        assert!(lines[3].starts_with("experience,/players/a,40.0"));
    }
}
