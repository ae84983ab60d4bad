pub mod error;
pub mod export_csv;
pub mod history;
pub mod input;
pub mod party;
pub mod result;
pub mod runner;
pub mod spawn;
pub mod state;

pub use error::SimulationError;
pub use export_csv::{write_result_csv, write_result_csv_file, ExportError};
pub use history::{HistoryError, InMemoryRunHistory, RunHistory, RunRecord};
pub use input::{
    AbilitySlotConfig, ConsumableSlot, EquippedItem, GlobalSettings, PlayerConfig,
    SimulationInput,
};
pub use result::{
    ConsumableRecord, DropRecord, HourlyRates, PlayerSummary, RunState, SimulationResult,
};
pub use runner::Simulator;
pub use spawn::{FixedGroupPolicy, SpawnPolicy, StrengthBudgetPolicy};

use crate::data::{PriceTable, ReferenceData};
use crate::parallel::progress::CancelToken;

/// Validates `input`, runs it to the end and returns the finalized result.
pub fn run_simulation(
    data: &ReferenceData,
    prices: &PriceTable,
    input: &SimulationInput,
    cancel: &CancelToken,
    on_progress: impl FnMut(f64),
) -> Result<SimulationResult, SimulationError> {
    Simulator::new(data, prices, input)?.run(cancel, on_progress)
}
