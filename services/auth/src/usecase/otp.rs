use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use digiinsta_core::clock::Clock;

use crate::domain::repository::OtpStore;
use crate::domain::types::{OTP_LEN, OtpRecord, is_valid_email, is_valid_otp_format, normalize_email};
use crate::error::AuthServiceError;

/// Uniform 6-digit code, leading zeros kept.
fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:0width$}", width = OTP_LEN)
}

/// A freshly issued code, handed to the mailer and nowhere else.
pub struct IssuedOtp {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedOtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedOtp")
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Issues and checks one-time codes.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Issue a new code for `email`, replacing any unconsumed one.
    pub async fn generate(&self, email: &str) -> Result<IssuedOtp, AuthServiceError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthServiceError::InvalidEmail);
        }

        let now = self.clock.now();
        let record = OtpRecord {
            email: email.clone(),
            code: generate_code(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.put(&record).await?;
        info!(email = %email, expires_at = %record.expires_at, "otp issued");

        Ok(IssuedOtp {
            email,
            code: record.code,
            expires_at: record.expires_at,
        })
    }

    /// Check `code` against the code on file and consume it on success.
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), AuthServiceError> {
        let code = code.trim();
        if !is_valid_otp_format(code) {
            return Err(AuthServiceError::InvalidOtpFormat);
        }
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthServiceError::InvalidEmail);
        }

        let Some(record) = self.store.get(&email).await? else {
            warn!(email = %email, outcome = "not_found", "otp verify");
            return Err(AuthServiceError::OtpNotFound);
        };

        if record.is_expired(self.clock.now()) {
            // Best effort; the store TTL removes it anyway.
            self.store.consume(&record).await?;
            warn!(email = %email, outcome = "expired", "otp verify");
            return Err(AuthServiceError::OtpExpired);
        }

        let matches: bool = record.code.as_bytes().ct_eq(code.as_bytes()).into();
        if !matches {
            warn!(email = %email, outcome = "mismatch", "otp verify");
            return Err(AuthServiceError::OtpMismatch);
        }

        // Only one of several concurrent verifies gets `true` here.
        if !self.store.consume(&record).await? {
            warn!(email = %email, outcome = "not_found", reason = "consumed concurrently", "otp verify");
            return Err(AuthServiceError::OtpNotFound);
        }

        info!(email = %email, outcome = "success", "otp verify");
        Ok(())
    }

    pub(crate) async fn ping(&self) -> Result<(), AuthServiceError> {
        self.store.ping().await
    }
}
