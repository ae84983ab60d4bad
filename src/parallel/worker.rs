//! Runs one simulation on a dedicated thread and reports over an mpsc channel.
//!
//! The host sees zero or more `progress` messages followed by exactly one of `result`,
//! `error` or `cancelled`. A cancelled run never yields a partial result.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use crate::data::{PriceTable, ReferenceData};
use crate::parallel::progress::CancelToken;
use crate::simulation::{run_simulation, SimulationError, SimulationInput, SimulationResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostMessage {
    Progress(f64),
    Result(Box<SimulationResult>),
    Error(String),
    Cancelled { tick: u64 },
}

impl HostMessage {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Handle to a running simulation.
pub struct SimulationHandle {
    pub receiver: Receiver<HostMessage>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl SimulationHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Blocks until the final message, dropping progress updates.
    pub fn wait(mut self) -> Option<HostMessage> {
        let last = self.receiver.iter().find(HostMessage::is_final);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("simulation worker thread panicked");
            }
        }
        last
    }
}

fn send(tx: &Sender<HostMessage>, message: HostMessage) {
    // The host may have hung up; the run result is then simply discarded.
    let _ = tx.send(message);
}

pub fn spawn_simulation(
    data: Arc<ReferenceData>,
    prices: Arc<PriceTable>,
    input: SimulationInput,
) -> SimulationHandle {
    spawn_simulation_with_token(data, prices, input, CancelToken::new())
}

pub fn spawn_simulation_with_token(
    data: Arc<ReferenceData>,
    prices: Arc<PriceTable>,
    input: SimulationInput,
    cancel: CancelToken,
) -> SimulationHandle {
    let (tx, receiver) = mpsc::channel();
    let token = cancel.clone();
    let thread = thread::spawn(move || {
        let progress_tx = tx.clone();
        let outcome = run_simulation(&data, &prices, &input, &token, |fraction| {
            send(&progress_tx, HostMessage::Progress(fraction));
        });
        let message = match outcome {
            Ok(result) => HostMessage::Result(Box::new(result)),
            Err(SimulationError::Cancelled { tick }) => HostMessage::Cancelled { tick },
            Err(err) => HostMessage::Error(err.to_string()),
        };
        send(&tx, message);
    });
    SimulationHandle {
        receiver,
        cancel,
        thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_messages_use_the_documented_shapes() {
        let progress = serde_json::to_string(&HostMessage::Progress(0.5)).unwrap_or_default();
        assert_eq!(progress, r#"{"progress":0.5}"#);
        let cancelled = serde_json::to_string(&HostMessage::Cancelled { tick: 7 }).unwrap_or_default();
        assert_eq!(cancelled, r#"{"cancelled":{"tick":7}}"#);
        let error = serde_json::to_string(&HostMessage::Error("boom".into())).unwrap_or_default();
        assert_eq!(error, r#"{"error":"boom"}"#);
        assert!(!HostMessage::Progress(1.0).is_final());
    }

    #[test]
    fn invalid_input_reports_a_single_error() {
        let input = SimulationInput {
            players: Vec::new(),
            zone_hrid: "/zones/none".to_string(),
            difficulty_tier: 0,
            duration_hours: 1,
            settings: Default::default(),
            seed: Some(1),
        };
        let handle = spawn_simulation(
            Arc::new(ReferenceData::default()),
            Arc::new(PriceTable::default()),
            input,
        );
        let messages: Vec<HostMessage> = handle.receiver.iter().collect();
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], HostMessage::Error(msg) if msg.contains("no players")));
    }
}
