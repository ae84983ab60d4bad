//! Request and response bodies of the HTTP API, and its error type.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::ZoneSummary;
use crate::simulation::{HistoryError, SimulationError, SimulationResult};

pub fn health_payload(data_version: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "service": "mwisim-api",
        "version": env!("CARGO_PKG_VERSION"),
        "data_version": data_version,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ZonesResponse {
    pub zones: Vec<ZoneSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub run_id: Option<Uuid>,
    pub result: SimulationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    kind: &'static str,
    message: &'a str,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// Input was well-formed but the data it needs is missing.
    Unprocessable(String),
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (status, _, msg) = self.parts();
        write!(f, "{}: {msg}", status.as_u16())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        if status.is_server_error() {
            log::error!("api error: {message}");
        }
        let body = ErrorBody {
            status: "error",
            kind,
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::Configuration(_) => Self::BadRequest(err.to_string()),
            SimulationError::DataUnavailable(_) => Self::Unprocessable(err.to_string()),
            SimulationError::Fault { .. } | SimulationError::Cancelled { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("simulation task failed: {err}"))
    }
}
