//! Validate the reference data and price table named by MWISIM_GAME_DATA / MWISIM_MARKET.
//! Run: cargo run --bin validate_data

use mwisim::config::AppConfig;
use mwisim::data::{load_price_table, validate_reference_file, ValidationSeverity};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    let report = validate_reference_file(&config.game_data_path)?;
    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }
    let warnings = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == ValidationSeverity::Warning)
        .count();

    let prices = load_price_table(&config.market_path)?;
    let unlisted = prices
        .market
        .values()
        .filter(|price| price.bid < 0.0 && price.ask < 0.0)
        .count();

    println!(
        "Validated {}: {} errors, {} warnings; {} prices ({} unlisted)",
        config.game_data_path.display(),
        report.error_count(),
        warnings,
        prices.market.len(),
        unlisted
    );
    if report.has_errors() || prices.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
