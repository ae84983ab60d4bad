pub mod batch;
pub mod pool;
pub mod progress;
pub mod worker;

pub use batch::{batch_ranges, replicate_seeds, run_simulation_batches};
pub use pool::WorkerPool;
pub use progress::{CancelToken, Progress, ProgressThrottle};
pub use worker::{spawn_simulation, spawn_simulation_with_token, HostMessage, SimulationHandle};
