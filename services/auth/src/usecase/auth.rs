use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use tracing::{info, warn};

use crate::domain::repository::OtpMailer;
use crate::domain::types::{SessionRecord, is_valid_email, normalize_email};
use crate::error::AuthServiceError;
use crate::usecase::otp::OtpService;
use crate::usecase::session::SessionManager;

/// Who may request a one-time code.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Normalized allowed emails; `None` admits everyone.
    allow_list: Option<HashSet<String>>,
    /// Answer non-allowed emails with `NotAuthorized` instead of a silent success.
    reveal_unauthorized: bool,
}

impl AccessPolicy {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn allow_list<I, S>(emails: I, reveal_unauthorized: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allow_list = emails
            .into_iter()
            .map(|e| normalize_email(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            allow_list: Some(allow_list),
            reveal_unauthorized,
        }
    }

    pub fn permits(&self, normalized_email: &str) -> bool {
        self.allow_list
            .as_ref()
            .is_none_or(|list| list.contains(normalized_email))
    }
}

/// Delay assumed for a code send before any real one has been timed.
const INITIAL_SEND_LATENCY: Duration = Duration::from_millis(250);

/// Running average of how long a successful code send takes, so a request for
/// an unlisted email can be answered no faster than a real one.
#[derive(Debug, Default)]
struct SendLatency {
    /// Milliseconds; 0 until the first sample.
    avg_ms: AtomicU64,
}

impl SendLatency {
    fn record(&self, took: Duration) {
        let sample = u64::try_from(took.as_millis()).unwrap_or(u64::MAX).max(1);
        // Concurrent updates may drop a sample; the average stays close enough.
        let prev = self.avg_ms.load(Ordering::Relaxed);
        let next = if prev == 0 {
            sample
        } else {
            prev.saturating_mul(3).saturating_add(sample) / 4
        };
        self.avg_ms.store(next, Ordering::Relaxed);
    }

    fn current(&self) -> Duration {
        match self.avg_ms.load(Ordering::Relaxed) {
            0 => INITIAL_SEND_LATENCY,
            ms => Duration::from_millis(ms),
        }
    }
}

/// Facade over OTP issuance/verification and session creation.
#[derive(Clone)]
pub struct AuthService {
    otp: OtpService,
    sessions: SessionManager,
    mailer: Arc<dyn OtpMailer>,
    access: AccessPolicy,
    email_timeout: Duration,
    send_latency: Arc<SendLatency>,
}

impl AuthService {
    pub fn new(
        otp: OtpService,
        sessions: SessionManager,
        mailer: Arc<dyn OtpMailer>,
        access: AccessPolicy,
        email_timeout: Duration,
    ) -> Self {
        Self {
            otp,
            sessions,
            mailer,
            access,
            email_timeout,
            send_latency: Arc::default(),
        }
    }

    /// Issue a code for `email` and mail it.
    pub async fn send_otp(&self, email: &str) -> Result<(), AuthServiceError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthServiceError::InvalidEmail);
        }

        if !self.access.permits(&email) {
            if self.access.reveal_unauthorized {
                warn!(email = %email, "otp requested for unauthorized email");
                return Err(AuthServiceError::NotAuthorized);
            }
            // Same answer, after about the same time, as a real send.
            tokio::time::sleep(self.send_latency.current()).await;
            info!(email = %email, "otp request for unlisted email ignored");
            return Ok(());
        }

        let started = Instant::now();
        let issued = self.otp.generate(&email).await?;

        match tokio::time::timeout(
            self.email_timeout,
            self.mailer.send_otp(&issued.email, &issued.code),
        )
        .await
        {
            Ok(Ok(())) => {
                self.send_latency.record(started.elapsed());
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    email = %issued.email,
                    timeout_ms = self.email_timeout.as_millis(),
                    "otp email delivery timed out"
                );
                Err(AuthServiceError::DeliveryUnavailable)
            }
        }
    }

    /// Verify the code and open a session. No session is created on failure.
    pub async fn verify_otp(
        &self,
        email: &str,
        code: &str,
    ) -> Result<SessionRecord, AuthServiceError> {
        self.otp.verify(email, code).await?;
        self.sessions.create_session(&normalize_email(email)).await
    }

    pub fn get_session_manager(&self) -> &SessionManager {
        &self.sessions
    }

    /// Readiness: both backing stores answer.
    pub async fn ping(&self) -> Result<(), AuthServiceError> {
        self.otp.ping().await?;
        self.sessions.ping().await
    }
}
