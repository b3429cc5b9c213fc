//! Request header builders for auth-related tests.

use axum::http::{HeaderMap, HeaderValue, header};

use digiinsta_auth_types::cookie::DEFAULT_SESSION_COOKIE_NAME;

/// A client holding a session token, as seen by the service.
pub struct MockSession {
    pub cookie_name: String,
    pub token: String,
}

impl MockSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_owned(),
            token: token.into(),
        }
    }

    /// `Cookie: <name>=<token>` value.
    pub fn cookie_value(&self) -> String {
        format!("{}={}", self.cookie_name, self.token)
    }

    /// Headers as a browser would send them.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            header::COOKIE,
            HeaderValue::from_str(&self.cookie_value()).unwrap(),
        );
        map
    }
}

/// Headers for a request that arrived through the reverse proxy from `ip`.
pub fn forwarded_for(ip: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert("x-forwarded-for", HeaderValue::from_str(ip).unwrap());
    map
}
