use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of digits in a one-time code.
pub const OTP_LEN: usize = 6;

/// Default one-time code time-to-live in seconds (10 minutes).
pub const DEFAULT_OTP_TTL_SECS: u64 = 600;

/// Default session lifetime in seconds (24 hours).
pub const DEFAULT_SESSION_LIFETIME_SECS: u64 = 86_400;

/// Random bytes behind every session token (256 bits).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Longest email address accepted (RFC 5321 path limit).
const MAX_EMAIL_LEN: usize = 254;

/// One-time code on file for an email. At most one per email.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// How long the store keeps the record from `created_at`: twice the code
    /// lifetime, so a late attempt still finds it and reports the expiry.
    pub fn retention(&self) -> chrono::Duration {
        (self.expires_at - self.created_at) * 2
    }
}

// The code never shows up in logs or panic messages.
impl fmt::Debug for OtpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpRecord")
            .field("email", &self.email)
            .field("code", &"******")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Server-side session behind the session cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_token: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("session_token", &redact_token(&self.session_token))
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Shorten a bearer token for logs: first 8 characters plus an ellipsis.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}…")
}

/// Trim and lowercase an email. Every store key and allow-list entry goes through this.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check on an already normalized email: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // At least `host.tld`, and no empty labels anywhere.
    let mut labels = 0;
    for label in domain.split('.') {
        if label.is_empty() {
            return false;
        }
        labels += 1;
    }
    labels >= 2
}

/// Exactly [`OTP_LEN`] ASCII digits.
pub fn is_valid_otp_format(code: &str) -> bool {
    code.len() == OTP_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

// ── Rate limiting ─────────────────────────────────────────────────────────────

/// Requests allowed per client identifier within a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Bucket namespace; part of the store key.
    pub name: &'static str,
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(name: &'static str, limit: u32, window_secs: u64) -> Self {
        Self {
            name,
            limit,
            window: Duration::from_secs(window_secs),
        }
    }

    pub const NEWSLETTER: Self = Self::new("newsletter", 3, 3600);
    pub const CONTACT: Self = Self::new("contact", 5, 3600);
    pub const CHECKOUT: Self = Self::new("checkout", 10, 60);
    pub const SEARCH: Self = Self::new("search", 30, 60);
    pub const API: Self = Self::new("api", 100, 60);
    pub const SEND_OTP: Self = Self::new("send_otp", 5, 3600);
    pub const VERIFY_OTP: Self = Self::new("verify_otp", 10, 900);

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn bucket_key(&self, identifier: &str) -> String {
        format!("ratelimit:{}:{}", self.name, identifier)
    }
}

/// State of a sliding window right after recording one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Requests in the window including this one.
    pub count: u64,
    /// Timestamp (ms) of the oldest request still counted, if any.
    pub oldest_ms: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { limit: u32, remaining: u32 },
    Blocked { limit: u32, retry_after_secs: u64 },
    /// The backing store was unavailable or not configured; the request goes through.
    Bypassed,
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Blocked { .. })
    }
}
