use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use digiinsta_auth_types::identity::SessionIdentity;
use digiinsta_core::serde::to_rfc3339_ms;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIndexResponse {
    pub email: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub session_expires_at: DateTime<Utc>,
}

/// `GET /admin`, the back-office entry point. Only reachable through the session guard.
pub async fn admin_index(identity: SessionIdentity) -> Json<AdminIndexResponse> {
    Json(AdminIndexResponse {
        email: identity.email,
        session_expires_at: identity.expires_at,
    })
}
