use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::types::{OtpRecord, SessionRecord, WindowHit};
use crate::error::AuthServiceError;

// Ports are object-safe (`async_trait`) so request handlers receive them as
// `Arc<dyn ...>` handles injected at startup.

/// Store for one-time codes, keyed by normalized email.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store `record`, replacing any code already on file for the email.
    async fn put(&self, record: &OtpRecord) -> Result<(), AuthServiceError>;

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>, AuthServiceError>;

    /// Atomically delete the code on file iff it is still exactly `record`.
    /// Returns `true` for the one caller that removed it.
    async fn consume(&self, record: &OtpRecord) -> Result<bool, AuthServiceError>;

    async fn ping(&self) -> Result<(), AuthServiceError> {
        Ok(())
    }
}

/// Persistent session table.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &SessionRecord) -> Result<(), AuthServiceError>;

    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, AuthServiceError>;

    /// Set `expires_at = new_expires_at` only if the session is still active at
    /// `now` and the new expiry is not earlier than the current one.
    /// Check and write happen in one store operation.
    async fn extend_if_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError>;

    /// Delete unconditionally. Returns whether a row existed.
    async fn delete(&self, token: &str) -> Result<bool, AuthServiceError>;

    /// Delete one session if it has expired at `now`.
    async fn delete_if_expired(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError>;

    /// Delete every session with `expires_at < now`. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError>;

    async fn ping(&self) -> Result<(), AuthServiceError> {
        Ok(())
    }
}

/// Shared sliding-window counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one request at `now_ms` in the window `key`, drop entries older
    /// than `window_ms`, and report the resulting count. A request that pushes
    /// the count above `limit` is not kept in the window.
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
    ) -> Result<WindowHit, AuthServiceError>;
}

/// Out-of-band delivery of one-time codes.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), AuthServiceError>;
}
