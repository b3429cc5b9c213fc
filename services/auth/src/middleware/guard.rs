//! Session guard for protected back-office routes.
//!
//! No cookie → redirect to login. Cookie with an unknown or expired session →
//! clear the cookie and redirect. Valid session → attach [`SessionIdentity`]
//! and continue. The guard never refreshes; every request re-validates
//! against the stored expiry.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use tracing::debug;

use digiinsta_auth_types::cookie::clear_session_cookie;
use digiinsta_auth_types::identity::SessionIdentity;

use crate::domain::types::redact_token;
use crate::state::AppState;

/// `<login>?redirect=<original path and query>`.
fn login_redirect(login_path: &str, request: &Request) -> Redirect {
    let original = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
    Redirect::to(&format!("{login_path}?redirect={encoded}"))
}

pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = state.cookies.session_token(&jar) else {
        debug!(path = %request.uri().path(), "no session cookie, redirecting to login");
        return login_redirect(&state.login_path, &request).into_response();
    };

    match state.auth.get_session_manager().get_session(&token).await {
        Ok(Some(session)) => {
            request.extensions_mut().insert(SessionIdentity {
                email: session.email,
                expires_at: session.expires_at,
            });
            next.run(request).await
        }
        Ok(None) => {
            debug!(token = %redact_token(&token), "invalid or expired session, redirecting to login");
            let jar = clear_session_cookie(jar, &state.cookies);
            (jar, login_redirect(&state.login_path, &request)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
