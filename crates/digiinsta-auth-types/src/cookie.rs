//! Session cookie builders.
//!
//! The session cookie is `HttpOnly`, `SameSite=Lax`, scoped to `/`, and
//! `Secure` only when the deployment runs in production.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Default session cookie name, overridable via `SESSION_COOKIE_NAME`.
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "digiinsta_session";

/// Session cookie Max-Age in seconds (24 hours).
pub const SESSION_COOKIE_MAX_AGE: i64 = 86_400;

/// Attributes applied to every session cookie the service writes.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub max_age_secs: i64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SESSION_COOKIE_NAME.to_owned(),
            domain: None,
            secure: false,
            max_age_secs: SESSION_COOKIE_MAX_AGE,
        }
    }
}

impl CookieSettings {
    /// Read the session token from the jar. Empty values count as absent.
    ///
    /// ```
    /// use axum_extra::extract::cookie::{Cookie, CookieJar};
    /// use digiinsta_auth_types::cookie::CookieSettings;
    ///
    /// let settings = CookieSettings::default();
    /// let jar = CookieJar::new().add(Cookie::new("digiinsta_session", "tok"));
    /// assert_eq!(settings.session_token(&jar), Some("tok".to_owned()));
    /// assert_eq!(settings.session_token(&CookieJar::new()), None);
    /// ```
    pub fn session_token(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn cookie(&self, value: String, max_age: Duration) -> Cookie<'static> {
        let builder = Cookie::build((self.name.clone(), value))
            .path("/")
            .max_age(max_age)
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax);
        match &self.domain {
            Some(domain) => builder.domain(domain.clone()).build(),
            None => builder.build(),
        }
    }
}

/// Set the session cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::{CookieJar, SameSite};
/// use digiinsta_auth_types::cookie::{CookieSettings, set_session_cookie};
///
/// let settings = CookieSettings { secure: true, ..CookieSettings::default() };
/// let jar = set_session_cookie(CookieJar::new(), &settings, "token_value".to_owned());
/// let cookie = jar.get("digiinsta_session").unwrap();
/// assert_eq!(cookie.value(), "token_value");
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(86400)));
/// assert_eq!(cookie.same_site(), Some(SameSite::Lax));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_session_cookie(jar: CookieJar, settings: &CookieSettings, token: String) -> CookieJar {
    jar.add(settings.cookie(token, Duration::seconds(settings.max_age_secs)))
}

/// Clear the session cookie by overwriting it with an empty value and Max-Age 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use digiinsta_auth_types::cookie::{CookieSettings, clear_session_cookie, set_session_cookie};
///
/// let settings = CookieSettings::default();
/// let jar = set_session_cookie(CookieJar::new(), &settings, "t".to_owned());
/// let jar = clear_session_cookie(jar, &settings);
/// let cookie = jar.get("digiinsta_session").unwrap();
/// assert_eq!(cookie.value(), "");
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    jar.add(settings.cookie(String::new(), Duration::ZERO))
}
