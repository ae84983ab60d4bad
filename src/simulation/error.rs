use std::fmt;

/// Why a run did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Malformed or out-of-range input, reported before the first tick.
    Configuration(String),
    /// Required reference or market data is missing, reported before the first tick.
    DataUnavailable(String),
    /// An invariant broke mid-run; the run is aborted.
    Fault { tick: u64, message: String },
    /// The host asked the run to stop.
    Cancelled { tick: u64 },
}

impl SimulationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn data_unavailable(message: impl Into<String>) -> Self {
        Self::DataUnavailable(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::DataUnavailable(msg) => write!(f, "data unavailable: {msg}"),
            Self::Fault { tick, message } => write!(f, "simulation fault at tick {tick}: {message}"),
            Self::Cancelled { tick } => write!(f, "simulation cancelled at tick {tick}"),
        }
    }
}

impl std::error::Error for SimulationError {}
