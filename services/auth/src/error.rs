use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use digiinsta_core::error::error_body;

/// Auth service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("request body must be a JSON object")]
    MalformedBody,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("verification code must be 6 digits")]
    InvalidOtpFormat,
    #[error("email is not authorized")]
    NotAuthorized,
    #[error("verification code not found, request a new one")]
    OtpNotFound,
    #[error("verification code expired")]
    OtpExpired,
    #[error("invalid verification code")]
    OtpMismatch,
    #[error("session expired")]
    InvalidSession,
    #[error("forbidden")]
    Forbidden,
    #[error("too many requests")]
    RateLimited { retry_after_secs: u64 },
    #[error("could not send email, please try again")]
    DeliveryUnavailable,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedBody => "MALFORMED_BODY",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidOtpFormat => "INVALID_OTP_FORMAT",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::OtpNotFound => "OTP_NOT_FOUND",
            Self::OtpExpired => "OTP_EXPIRED",
            Self::OtpMismatch => "OTP_MISMATCH",
            Self::InvalidSession => "INVALID_SESSION",
            Self::Forbidden => "FORBIDDEN",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::DeliveryUnavailable => "DELIVERY_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Rejected before any store access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MalformedBody | Self::MissingField(_) | Self::InvalidEmail | Self::InvalidOtpFormat
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedBody
            | Self::MissingField(_)
            | Self::InvalidEmail
            | Self::InvalidOtpFormat
            | Self::OtpNotFound
            | Self::OtpExpired
            | Self::OtpMismatch => StatusCode::BAD_REQUEST,
            Self::InvalidSession => StatusCode::UNAUTHORIZED,
            Self::NotAuthorized | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::DeliveryUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        // TraceLayer records method/uri/status for every request; only 500s need
        // the anyhow chain so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let status = self.status();
        let mut body = error_body(self.kind(), &self.to_string());
        let retry_after = match self {
            Self::RateLimited { retry_after_secs } => {
                body["retryAfter"] = retry_after_secs.into();
                Some(retry_after_secs)
            }
            _ => None,
        };
        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
