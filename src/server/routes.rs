use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use uuid::Uuid;

use crate::optimizer::{sweep_zones, SweepReport, SweepScenario};
use crate::parallel::CancelToken;
use crate::server::api::{self, ApiError, JobCreated, SimulateResponse, ZonesResponse};
use crate::server::jobs::JobSnapshot;
use crate::server::AppState;
use crate::simulation::{run_simulation, RunRecord, SimulationInput};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/zones", get(zones))
        .route("/api/simulate", post(simulate))
        .route("/api/sweep", post(sweep))
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/:job_id", get(job_status))
        .route("/api/jobs/:job_id/cancel", post(cancel_job))
        .route("/api/jobs/:job_id/events", get(job_events))
        .route("/api/history/:run_id", get(history_record))
        .fallback(not_found)
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|err| ApiError::BadRequest(format!("invalid request body: {}", err.body_text())))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(api::health_payload(
        state.registry.game_data.data_version.as_deref(),
    ))
}

async fn zones(State(state): State<AppState>) -> Json<ZonesResponse> {
    Json(ZonesResponse {
        zones: state.registry.zones(),
    })
}

async fn simulate(
    State(state): State<AppState>,
    payload: Result<Json<SimulationInput>, JsonRejection>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let input = body(payload)?;
    let registry = Arc::clone(&state.registry);
    let task_input = input.clone();
    let result = tokio::task::spawn_blocking(move || {
        run_simulation(
            &registry.game_data,
            &registry.prices,
            &task_input,
            &CancelToken::new(),
            |_| {},
        )
    })
    .await??;

    let run_id = match state.history.save(RunRecord::new(input, result.clone())) {
        Ok(id) => Some(id),
        Err(err) => {
            log::warn!("simulation result not saved to history: {err}");
            None
        }
    };
    Ok(Json(SimulateResponse { run_id, result }))
}

async fn sweep(
    State(state): State<AppState>,
    payload: Result<Json<SweepScenario>, JsonRejection>,
) -> Result<Json<SweepReport>, ApiError> {
    let scenario = body(payload)?;
    if scenario.zones.is_empty() {
        return Err(ApiError::BadRequest("sweep needs at least one zone".to_string()));
    }
    let registry = Arc::clone(&state.registry);
    let pool = state.pool;
    let report = tokio::task::spawn_blocking(move || {
        sweep_zones(&registry.game_data, &registry.prices, &scenario, &pool)
    })
    .await??;
    Ok(Json(report))
}

async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<SimulationInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body(payload)?;
    input.validate(&state.registry.game_data)?;
    let job_id = state
        .jobs
        .start(&state.registry, Arc::clone(&state.history), input);
    Ok((StatusCode::ACCEPTED, Json(JobCreated { job_id })))
}

fn unknown_job(job_id: Uuid) -> ApiError {
    ApiError::NotFound(format!("unknown job {job_id}"))
}

async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .jobs
        .snapshot(&job_id)
        .map(Json)
        .ok_or_else(|| unknown_job(job_id))
}

async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .jobs
        .cancel(&job_id)
        .map(Json)
        .ok_or_else(|| unknown_job(job_id))
}

/// Streams `progress` events while the job runs and one `done` event when it stops.
async fn job_events(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if state.jobs.snapshot(&job_id).is_none() {
        return Err(unknown_job(job_id));
    }
    let jobs = Arc::clone(&state.jobs);
    let events = stream::unfold(Some(-1.0_f64), move |last_sent| {
        let jobs = Arc::clone(&jobs);
        async move {
            let last_sent = last_sent?;
            loop {
                let snapshot = jobs.snapshot(&job_id)?;
                if snapshot.status.is_terminal() {
                    let done = serde_json::json!({
                        "status": snapshot.status,
                        "run_id": snapshot.run_id,
                        "error": snapshot.error,
                    });
                    let event = Event::default().event("done").data(done.to_string());
                    return Some((Ok(event), None));
                }
                if snapshot.progress > last_sent {
                    let event = Event::default()
                        .event("progress")
                        .data(snapshot.progress.to_string());
                    return Some((Ok(event), Some(snapshot.progress)));
                }
                tokio::time::sleep(EVENT_POLL_INTERVAL).await;
            }
        }
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn history_record(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunRecord>, ApiError> {
    state
        .history
        .get(&run_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown run {run_id}")))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}
