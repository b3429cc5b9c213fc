use std::sync::Arc;

use digiinsta_auth_types::cookie::CookieSettings;

use crate::usecase::auth::AuthService;
use crate::usecase::rate_limit::RateLimiter;

/// Shared application state passed to every handler via axum `State`.
///
/// Holds injected service handles only; all mutable state lives in the
/// external stores behind them.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub rate_limiter: RateLimiter,
    pub cookies: Arc<CookieSettings>,
    pub login_path: Arc<str>,
    pub cron_secret: Option<Arc<str>>,
}
