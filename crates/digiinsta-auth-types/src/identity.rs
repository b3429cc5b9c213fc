//! Session identity attached to requests by the session guard.

use axum::extract::FromRequestParts;
use chrono::{DateTime, Utc};
use digiinsta_core::error::AppError;
use http::request::Parts;

/// The authenticated admin behind a request.
///
/// The session guard inserts this into request extensions after validating
/// the session cookie. Handlers behind the guard extract it; outside the
/// guard extraction fails with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl<S> FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    // Extract synchronously and return a 'static future; `async fn` here trips
    // E0195 against axum-core's `impl Future + Send` signature.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = parts.extensions.get::<SessionIdentity>().cloned();
        async move { identity.ok_or(AppError::Unauthorized) }
    }
}
