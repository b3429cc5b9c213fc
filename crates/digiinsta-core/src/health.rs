use axum::Json;
use serde_json::{Value, json};

/// Handler for `GET /healthz`, a liveness check. Readiness is service-specific.
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
