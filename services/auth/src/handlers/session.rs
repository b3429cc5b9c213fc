use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::warn;

use digiinsta_auth_types::cookie::{clear_session_cookie, set_session_cookie};
use digiinsta_core::serde::to_rfc3339_ms;

use crate::error::AuthServiceError;
use crate::handlers::SuccessResponse;
use crate::state::AppState;

// ── GET /api/auth/session ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub email: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub session: Option<SessionInfo>,
}

impl SessionResponse {
    fn invalid() -> (StatusCode, Json<Self>) {
        (
            StatusCode::UNAUTHORIZED,
            Json(Self {
                valid: false,
                session: None,
            }),
        )
    }
}

pub async fn get_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AuthServiceError> {
    let Some(token) = state.cookies.session_token(&jar) else {
        return Ok(SessionResponse::invalid().into_response());
    };

    let response = match state.auth.get_session_manager().get_session(&token).await? {
        Some(session) => Json(SessionResponse {
            valid: true,
            session: Some(SessionInfo {
                email: session.email,
                expires_at: session.expires_at,
            }),
        })
        .into_response(),
        None => SessionResponse::invalid().into_response(),
    };
    Ok(response)
}

// ── POST /api/auth/refresh-session ────────────────────────────────────────────

pub async fn refresh_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AuthServiceError> {
    let token = state
        .cookies
        .session_token(&jar)
        .ok_or(AuthServiceError::InvalidSession)?;

    if state.auth.get_session_manager().refresh_session(&token).await? {
        // Re-issue so the browser's Max-Age tracks the new expiry.
        let jar = set_session_cookie(jar, &state.cookies, token);
        Ok((jar, Json(SuccessResponse::ok())).into_response())
    } else {
        let jar = clear_session_cookie(jar, &state.cookies);
        Ok((jar, AuthServiceError::InvalidSession).into_response())
    }
}

// ── POST /api/auth/logout ─────────────────────────────────────────────────────

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessResponse>), AuthServiceError> {
    if let Some(token) = state.cookies.session_token(&jar) {
        state
            .auth
            .get_session_manager()
            .invalidate_session(&token)
            .await?;
    }
    let jar = clear_session_cookie(jar, &state.cookies);
    Ok((jar, Json(SuccessResponse::ok())))
}

// ── POST /api/auth/cleanup-sessions ───────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub deleted: u64,
}

fn authorize_cron(secret: Option<&str>, headers: &HeaderMap) -> Result<(), AuthServiceError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if bool::from(provided.as_bytes().ct_eq(secret.as_bytes())) {
        Ok(())
    } else {
        warn!("session cleanup called without a valid cron secret");
        Err(AuthServiceError::Forbidden)
    }
}

pub async fn cleanup_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CleanupResponse>, AuthServiceError> {
    authorize_cron(state.cron_secret.as_deref(), &headers)?;
    let deleted = state
        .auth
        .get_session_manager()
        .cleanup_expired_sessions()
        .await?;
    Ok(Json(CleanupResponse {
        success: true,
        deleted,
    }))
}
