use std::sync::Arc;

use crate::data::DataRegistry;
use crate::parallel::WorkerPool;
use crate::simulation::{InMemoryRunHistory, RunHistory};

pub mod api;
pub mod jobs;
pub mod routes;

pub use jobs::{JobRegistry, JobSnapshot, JobStatus};
pub use routes::router;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DataRegistry>,
    pub jobs: Arc<JobRegistry>,
    pub history: Arc<dyn RunHistory>,
    pub pool: WorkerPool,
}

impl AppState {
    pub fn new(registry: Arc<DataRegistry>, pool: WorkerPool) -> Self {
        Self {
            registry,
            jobs: Arc::new(JobRegistry::new()),
            history: Arc::new(InMemoryRunHistory::new()),
            pool,
        }
    }
}

pub async fn serve(bind_addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("mwisim server listening on http://{bind_addr}");
    println!("mwisim server listening on http://{bind_addr}");
    axum::serve(listener, router(state)).await
}

/// Blocks the calling thread on a fresh multi-threaded runtime until the server stops.
pub fn run_server(
    bind_addr: &str,
    registry: Arc<DataRegistry>,
    pool: WorkerPool,
) -> std::io::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(bind_addr, AppState::new(registry, pool)))
}
