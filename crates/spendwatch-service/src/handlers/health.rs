//! Health check handler.
//!
//! Reports whether the SQLite store answers a trivial query. A store that
//! cannot be reached turns the check into a 503 so load balancers stop routing.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` when the store answers, `"degraded"` otherwise.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Store reachability: `"ok"` or `"unavailable"`.
    pub database: &'static str,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION");

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version,
                database: "ok",
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    version,
                    database: "unavailable",
                }),
            )
        }
    }
}
