use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use digiinsta_core::error::not_found;
use digiinsta_core::health::healthz;
use digiinsta_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::domain::types::RateLimitPolicy;
use crate::handlers::{
    admin::admin_index,
    health::readyz,
    otp::{send_otp, verify_otp},
    session::{cleanup_sessions, get_session, logout, refresh_session},
};
use crate::middleware::guard::require_session;
use crate::middleware::rate_limit::{PolicyGuard, enforce_rate_limit};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let limiter = &state.rate_limiter;
    let send_otp_limit = PolicyGuard::new(limiter.clone(), RateLimitPolicy::SEND_OTP);
    let verify_otp_limit = PolicyGuard::new(limiter.clone(), RateLimitPolicy::VERIFY_OTP);
    let api_limit = PolicyGuard::new(limiter.clone(), RateLimitPolicy::API);

    // Back office: every route here sits behind the session guard.
    let admin = Router::new()
        .route("/admin", get(admin_index))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // OTP
        .route(
            "/api/auth/send-otp",
            post(send_otp).layer(middleware::from_fn_with_state(
                send_otp_limit,
                enforce_rate_limit,
            )),
        )
        .route(
            "/api/auth/verify-otp",
            post(verify_otp).layer(middleware::from_fn_with_state(
                verify_otp_limit,
                enforce_rate_limit,
            )),
        )
        // Session
        .route(
            "/api/auth/session",
            get(get_session).layer(middleware::from_fn_with_state(
                api_limit.clone(),
                enforce_rate_limit,
            )),
        )
        .route(
            "/api/auth/refresh-session",
            post(refresh_session).layer(middleware::from_fn_with_state(
                api_limit.clone(),
                enforce_rate_limit,
            )),
        )
        .route(
            "/api/auth/logout",
            post(logout).layer(middleware::from_fn_with_state(
                api_limit.clone(),
                enforce_rate_limit,
            )),
        )
        // Maintenance (cron)
        .route("/api/auth/cleanup-sessions", post(cleanup_sessions))
        .merge(admin)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(propagate_request_id_layer())
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}
