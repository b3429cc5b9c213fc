use axum::{extract::State, http::StatusCode};
use tracing::warn;

use crate::state::AppState;

/// `GET /readyz`: 200 once Redis and Postgres both answer.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.auth.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!(error = ?e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
