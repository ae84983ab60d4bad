mod common;

use std::sync::Arc;

use mwisim::parallel::{spawn_simulation, spawn_simulation_with_token, CancelToken, HostMessage};
use mwisim::simulation::SimulationInput;

#[test]
fn worker_reports_progress_then_one_result() {
    let registry = common::registry();
    let handle = spawn_simulation(
        Arc::clone(&registry.game_data),
        Arc::clone(&registry.prices),
        common::sample_input(),
    );
    let messages: Vec<HostMessage> = handle.receiver.iter().collect();

    let finals: Vec<&HostMessage> = messages.iter().filter(|m| m.is_final()).collect();
    assert_eq!(finals.len(), 1);
    assert!(matches!(messages.last(), Some(HostMessage::Result(_))));

    let progress: Vec<f64> = messages
        .iter()
        .filter_map(|m| match m {
            HostMessage::Progress(f) => Some(*f),
            _ => None,
        })
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last().copied(), Some(1.0));
}

#[test]
fn cancelled_worker_sends_no_result() {
    let registry = common::registry();
    let cancel = CancelToken::new();
    cancel.cancel();
    let handle = spawn_simulation_with_token(
        Arc::clone(&registry.game_data),
        Arc::clone(&registry.prices),
        common::sample_input(),
        cancel,
    );
    let messages: Vec<HostMessage> = handle.receiver.iter().collect();
    assert_eq!(messages, vec![HostMessage::Cancelled { tick: 0 }]);
}

#[test]
fn wait_returns_the_error_for_bad_input() {
    let registry = common::registry();
    let input = SimulationInput {
        duration_hours: 0,
        ..common::sample_input()
    };
    let handle = spawn_simulation(
        Arc::clone(&registry.game_data),
        Arc::clone(&registry.prices),
        input,
    );
    assert!(matches!(handle.wait(), Some(HostMessage::Error(msg)) if msg.contains("duration")));
}
