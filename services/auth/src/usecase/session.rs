use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use rand::RngExt;
use tracing::{debug, info};

use digiinsta_core::clock::Clock;

use crate::domain::repository::SessionRepository;
use crate::domain::types::{SESSION_TOKEN_BYTES, SessionRecord, redact_token};
use crate::error::AuthServiceError;

/// Opaque URL-safe token carrying 256 bits from the thread CSPRNG.
fn generate_session_token() -> String {
    let bytes: [u8; SESSION_TOKEN_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Session lifecycle: create, validate, refresh, invalidate, sweep.
#[derive(Clone)]
pub struct SessionManager {
    repo: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
}

impl SessionManager {
    pub fn new(repo: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>, lifetime: Duration) -> Self {
        Self {
            repo,
            clock,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Create a session for an already verified email.
    pub async fn create_session(&self, email: &str) -> Result<SessionRecord, AuthServiceError> {
        let now = self.clock.now();
        let session = SessionRecord {
            session_token: generate_session_token(),
            email: email.to_owned(),
            created_at: now,
            expires_at: now + self.lifetime,
        };
        self.repo.insert(&session).await?;
        info!(
            email = %session.email,
            token = %redact_token(&session.session_token),
            expires_at = %session.expires_at,
            "session created"
        );
        Ok(session)
    }

    /// The session behind `token` if it is still active. Expired rows are
    /// swept on the way out.
    pub async fn get_session(&self, token: &str) -> Result<Option<SessionRecord>, AuthServiceError> {
        if token.is_empty() {
            return Ok(None);
        }
        let now = self.clock.now();
        match self.repo.find(token).await? {
            Some(session) if session.is_active(now) => Ok(Some(session)),
            Some(_) => {
                self.repo.delete_if_expired(token, now).await?;
                debug!(token = %redact_token(token), "expired session swept on lookup");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn validate_session(&self, token: &str) -> Result<bool, AuthServiceError> {
        Ok(self.get_session(token).await?.is_some())
    }

    /// Push expiry to `now + lifetime`. Returns `false` without writing when the
    /// session is unknown or already expired.
    pub async fn refresh_session(&self, token: &str) -> Result<bool, AuthServiceError> {
        if token.is_empty() {
            return Ok(false);
        }
        let now = self.clock.now();
        let extended = self
            .repo
            .extend_if_active(token, now, now + self.lifetime)
            .await?;
        debug!(token = %redact_token(token), extended, "session refresh");
        Ok(extended)
    }

    /// Idempotent; unknown tokens are not an error.
    pub async fn invalidate_session(&self, token: &str) -> Result<(), AuthServiceError> {
        if token.is_empty() {
            return Ok(());
        }
        let existed = self.repo.delete(token).await?;
        info!(token = %redact_token(token), existed, "session invalidated");
        Ok(())
    }

    /// Bulk-delete expired sessions. Safe to run concurrently and repeatedly.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthServiceError> {
        let deleted = self.repo.delete_expired(self.clock.now()).await?;
        info!(deleted, "expired sessions cleaned up");
        Ok(deleted)
    }

    pub(crate) async fn ping(&self) -> Result<(), AuthServiceError> {
        self.repo.ping().await
    }
}
