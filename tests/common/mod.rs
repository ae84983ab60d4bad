#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use mwisim::data::{load_document, DataRegistry};
use mwisim::simulation::SimulationInput;

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

pub fn registry() -> Arc<DataRegistry> {
    let dir = data_dir();
    DataRegistry::load(dir.join("game_data.json"), dir.join("market.json"))
        .expect("fixture data should load")
}

pub fn sample_input() -> SimulationInput {
    load_document(data_dir().join("sample_input.json")).expect("sample input should load")
}

pub fn approx_eq(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "expected {b}, got {a}");
}
