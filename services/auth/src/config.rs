use std::time::Duration;

use serde::Deserialize;

use digiinsta_auth_types::cookie::{CookieSettings, DEFAULT_SESSION_COOKIE_NAME};
use digiinsta_core::config::Config;

use crate::domain::types::{DEFAULT_OTP_TTL_SECS, DEFAULT_SESSION_LIFETIME_SECS};
use crate::usecase::auth::AccessPolicy;

/// Auth service configuration loaded from environment variables.
///
/// Field names map to upper-case env vars (`database_url` ← `DATABASE_URL`).
#[derive(Deserialize)]
pub struct AuthConfig {
    /// PostgreSQL connection URL (sessions table).
    pub database_url: String,
    /// Redis connection URL (one-time codes).
    pub redis_url: String,
    /// Redis for rate-limit buckets. Unset disables rate limiting (fail open).
    #[serde(default)]
    pub rate_limit_redis_url: Option<String>,
    /// API key of the transactional email provider.
    pub resend_api_key: String,
    /// Sender address for OTP emails.
    pub email_from: String,
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,
    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,
    /// Optional cookie `Domain` attribute.
    #[serde(default)]
    pub cookie_domain: Option<String>,
    /// `production` turns on `Secure` cookies.
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default = "default_session_lifetime_secs")]
    pub session_lifetime_secs: u64,
    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: u64,
    /// Comma-separated emails allowed to request a code. Unset admits any email.
    #[serde(default)]
    pub admin_emails: Option<String>,
    #[serde(default)]
    pub reveal_unauthorized_email: bool,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Bearer secret for the cleanup endpoint. Unset leaves it open.
    #[serde(default)]
    pub cron_secret: Option<String>,
    /// Period of the in-process expired-session sweep; 0 disables it.
    #[serde(default = "default_cleanup_interval_secs")]
    pub session_cleanup_interval_secs: u64,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_email_timeout_ms")]
    pub email_timeout_ms: u64,
    /// TCP port to listen on (default 3000).
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
}

impl Config for AuthConfig {}

fn default_email_api_url() -> String {
    "https://api.resend.com/emails".to_owned()
}

fn default_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE_NAME.to_owned()
}

fn default_app_env() -> String {
    "development".to_owned()
}

fn default_session_lifetime_secs() -> u64 {
    DEFAULT_SESSION_LIFETIME_SECS
}

fn default_otp_ttl_secs() -> u64 {
    DEFAULT_OTP_TTL_SECS
}

fn default_login_path() -> String {
    "/admin/login".to_owned()
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_store_timeout_ms() -> u64 {
    3000
}

fn default_email_timeout_ms() -> u64 {
    5000
}

fn default_auth_port() -> u16 {
    3000
}

/// Longest accepted session lifetime (366 days).
pub const MAX_SESSION_LIFETIME_SECS: u64 = 366 * 86_400;

/// Longest accepted one-time code lifetime (1 day).
pub const MAX_OTP_TTL_SECS: u64 = 86_400;

fn clamped_secs(secs: u64, max: u64) -> chrono::Duration {
    i64::try_from(secs.min(max))
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or_else(chrono::Duration::zero)
}

impl AuthConfig {
    /// Reject settings that would make expiry arithmetic meaningless.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=MAX_SESSION_LIFETIME_SECS).contains(&self.session_lifetime_secs),
            "SESSION_LIFETIME_SECS must be between 1 and {MAX_SESSION_LIFETIME_SECS}"
        );
        anyhow::ensure!(
            (1..=MAX_OTP_TTL_SECS).contains(&self.otp_ttl_secs),
            "OTP_TTL_SECS must be between 1 and {MAX_OTP_TTL_SECS}"
        );
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            name: self.session_cookie_name.clone(),
            domain: self.cookie_domain.clone().filter(|d| !d.is_empty()),
            secure: self.is_production(),
            max_age_secs: self.session_lifetime().num_seconds(),
        }
    }

    pub fn access_policy(&self) -> AccessPolicy {
        match self.admin_emails.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(list) => AccessPolicy::allow_list(list.split(','), self.reveal_unauthorized_email),
            None => AccessPolicy::open(),
        }
    }

    pub fn session_lifetime(&self) -> chrono::Duration {
        clamped_secs(self.session_lifetime_secs, MAX_SESSION_LIFETIME_SECS)
    }

    pub fn otp_ttl(&self) -> chrono::Duration {
        clamped_secs(self.otp_ttl_secs, MAX_OTP_TTL_SECS)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn email_timeout(&self) -> Duration {
        Duration::from_millis(self.email_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.session_cleanup_interval_secs > 0)
            .then(|| Duration::from_secs(self.session_cleanup_interval_secs))
    }
}
