use axum::{Json, extract::State, extract::rejection::JsonRejection};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use digiinsta_auth_types::cookie::set_session_cookie;

use crate::error::AuthServiceError;
use crate::handlers::{SuccessResponse, required};
use crate::state::AppState;

// ── POST /api/auth/send-otp ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
}

pub async fn send_otp(
    State(state): State<AppState>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AuthServiceError> {
    let Json(body) = payload.map_err(|_| AuthServiceError::MalformedBody)?;
    let email = required(body.email, "email")?;

    state.auth.send_otp(&email).await?;
    Ok(Json(SuccessResponse::ok()))
}

// ── POST /api/auth/verify-otp ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub email: String,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<VerifyOtpResponse>), AuthServiceError> {
    let Json(body) = payload.map_err(|_| AuthServiceError::MalformedBody)?;
    let email = required(body.email, "email")?;
    let otp = required(body.otp, "otp")?;

    let session = state.auth.verify_otp(&email, &otp).await?;

    let jar = set_session_cookie(jar, &state.cookies, session.session_token);
    Ok((
        jar,
        Json(VerifyOtpResponse {
            success: true,
            email: session.email,
        }),
    ))
}
