use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use digiinsta_auth_types::client_ip::ClientId;

use crate::domain::types::{RateLimitDecision, RateLimitPolicy};
use crate::error::AuthServiceError;
use crate::usecase::rate_limit::RateLimiter;

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// A limiter bound to one endpoint policy; state for [`enforce_rate_limit`].
#[derive(Clone)]
pub struct PolicyGuard {
    pub limiter: RateLimiter,
    pub policy: RateLimitPolicy,
}

impl PolicyGuard {
    pub fn new(limiter: RateLimiter, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }
}

/// Apply with `axum::middleware::from_fn_with_state(PolicyGuard::new(..), enforce_rate_limit)`.
pub async fn enforce_rate_limit(
    State(guard): State<PolicyGuard>,
    ClientId(client): ClientId,
    request: Request,
    next: Next,
) -> Response {
    match guard.limiter.check(&guard.policy, &client).await {
        RateLimitDecision::Blocked {
            retry_after_secs, ..
        } => AuthServiceError::RateLimited { retry_after_secs }.into_response(),
        RateLimitDecision::Allowed { limit, remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(HeaderName::from_static(X_RATELIMIT_LIMIT), HeaderValue::from(limit));
            headers.insert(
                HeaderName::from_static(X_RATELIMIT_REMAINING),
                HeaderValue::from(remaining),
            );
            response
        }
        RateLimitDecision::Bypassed => next.run(request).await,
    }
}
