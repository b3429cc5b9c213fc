use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Barrier;

use digiinsta_auth::domain::repository::{OtpMailer, OtpStore, RateLimitStore, SessionRepository};
use digiinsta_auth::domain::types::{OtpRecord, SessionRecord, WindowHit};
use digiinsta_auth::error::AuthServiceError;
use digiinsta_auth::state::AppState;
use digiinsta_auth::usecase::auth::{AccessPolicy, AuthService};
use digiinsta_auth::usecase::otp::OtpService;
use digiinsta_auth::usecase::rate_limit::RateLimiter;
use digiinsta_auth::usecase::session::SessionManager;
use digiinsta_auth_types::cookie::CookieSettings;
use digiinsta_core::clock::Clock;
use digiinsta_testing::clock::ManualClock;

pub const TEST_EMAIL: &str = "owner@digiinsta.test";
pub const LOGIN_PATH: &str = "/admin/login";

pub fn otp_ttl() -> Duration {
    Duration::minutes(10)
}

pub fn session_lifetime() -> Duration {
    Duration::hours(24)
}

// ── MemoryOtpStore ───────────────────────────────────────────────────────────

/// Keeps each record for its retention, like the Redis key TTL.
pub struct MemoryOtpStore {
    clock: ManualClock,
    records: Mutex<HashMap<String, OtpRecord>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    lost_consumes: AtomicUsize,
    read_barrier: Option<Arc<Barrier>>,
}

impl MemoryOtpStore {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            lost_consumes: AtomicUsize::new(0),
            read_barrier: None,
        }
    }

    /// Hold every `get` until `readers` callers have read, so they all see the
    /// same record before any of them consumes it.
    pub fn with_read_barrier(mut self, readers: usize) -> Self {
        self.read_barrier = Some(Arc::new(Barrier::new(readers)));
        self
    }

    /// Number of store accesses of any kind.
    pub fn touches(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// `consume` calls that found the record already gone or replaced.
    pub fn lost_consumes(&self) -> usize {
        self.lost_consumes.load(Ordering::SeqCst)
    }

    /// The record on file, as the store sees it right now.
    pub fn record(&self, email: &str) -> Option<OtpRecord> {
        self.live_records().get(email).cloned()
    }

    /// Replace the code on file with a known one.
    pub fn force_code(&self, email: &str, code: &str, created_at: DateTime<Utc>) {
        self.records.lock().unwrap().insert(
            email.to_owned(),
            OtpRecord {
                email: email.to_owned(),
                code: code.to_owned(),
                created_at,
                expires_at: created_at + otp_ttl(),
            },
        );
    }

    fn live_records(&self) -> MutexGuard<'_, HashMap<String, OtpRecord>> {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        records.retain(|_, r| now < r.created_at + r.retention());
        records
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn put(&self, record: &OtpRecord) -> Result<(), AuthServiceError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.live_records()
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>, AuthServiceError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let record = self.live_records().get(email).cloned();
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(record)
    }

    async fn consume(&self, record: &OtpRecord) -> Result<bool, AuthServiceError> {
        let mut records = self.live_records();
        if records.get(&record.email) == Some(record) {
            records.remove(&record.email);
            Ok(true)
        } else {
            self.lost_consumes.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }
}

// ── MemorySessionRepo ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySessionRepo {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionRepo {
    pub fn get(&self, token: &str) -> Option<SessionRecord> {
        self.sessions.lock().unwrap().get(token).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn seed(&self, session: SessionRecord) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.session_token.clone(), session);
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepo {
    async fn insert(&self, session: &SessionRecord) -> Result<(), AuthServiceError> {
        self.seed(session.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, AuthServiceError> {
        Ok(self.get(token))
    }

    async fn extend_if_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(token) {
            Some(s) if s.expires_at > now && s.expires_at <= new_expires_at => {
                s.expires_at = new_expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, token: &str) -> Result<bool, AuthServiceError> {
        Ok(self.sessions.lock().unwrap().remove(token).is_some())
    }

    async fn delete_if_expired(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get(token) {
            Some(s) if s.expires_at <= now => {
                sessions.remove(token);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }
}

// ── Rate limit stores ────────────────────────────────────────────────────────

/// Sliding log per key; rejected hits are not kept.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, Vec<i64>>>,
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
    ) -> Result<WindowHit, AuthServiceError> {
        let mut windows = self.windows.lock().unwrap();
        let log = windows.entry(key.to_owned()).or_default();
        log.retain(|&ts| ts > now_ms - window_ms);
        log.push(now_ms);
        let count = log.len() as u64;
        if count > u64::from(limit) {
            log.pop();
        }
        Ok(WindowHit {
            count,
            oldest_ms: log.iter().copied().min(),
        })
    }
}

pub struct FailingRateLimitStore;

#[async_trait]
impl RateLimitStore for FailingRateLimitStore {
    async fn hit(&self, _: &str, _: i64, _: i64, _: u32) -> Result<WindowHit, AuthServiceError> {
        Err(AuthServiceError::Internal(anyhow::anyhow!("connection refused")))
    }
}

// ── Mailers ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl OtpMailer for RecordingMailer {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), AuthServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_owned(), code.to_owned()));
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl OtpMailer for FailingMailer {
    async fn send_otp(&self, _: &str, _: &str) -> Result<(), AuthServiceError> {
        Err(AuthServiceError::DeliveryUnavailable)
    }
}

/// Delivers after a fixed delay.
pub struct DelayedMailer(pub StdDuration);

#[async_trait]
impl OtpMailer for DelayedMailer {
    async fn send_otp(&self, _: &str, _: &str) -> Result<(), AuthServiceError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

/// Never answers within any sane timeout.
pub struct SlowMailer;

#[async_trait]
impl OtpMailer for SlowMailer {
    async fn send_otp(&self, _: &str, _: &str) -> Result<(), AuthServiceError> {
        tokio::time::sleep(StdDuration::from_secs(60)).await;
        Ok(())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

/// Services wired to in-memory stores and a manual clock.
pub struct Harness {
    pub clock: ManualClock,
    pub otp_store: Arc<MemoryOtpStore>,
    pub sessions: Arc<MemorySessionRepo>,
    pub mailer: Arc<RecordingMailer>,
    pub otp: OtpService,
    pub manager: SessionManager,
    pub auth: AuthService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_access(AccessPolicy::open())
    }

    pub fn with_access(access: AccessPolicy) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        Self::build(access, mailer.clone(), mailer)
    }

    /// Same wiring with a mailer that does not record.
    pub fn with_mailer(mailer: Arc<dyn OtpMailer>) -> Self {
        Self::with_access_and_mailer(AccessPolicy::open(), mailer)
    }

    pub fn with_access_and_mailer(access: AccessPolicy, mailer: Arc<dyn OtpMailer>) -> Self {
        Self::build(access, mailer, Arc::new(RecordingMailer::default()))
    }

    fn build(access: AccessPolicy, mailer: Arc<dyn OtpMailer>, recorder: Arc<RecordingMailer>) -> Self {
        let clock = ManualClock::fixed();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let otp_store = Arc::new(MemoryOtpStore::new(clock.clone()));
        let sessions = Arc::new(MemorySessionRepo::default());

        let otp = OtpService::new(otp_store.clone(), shared_clock.clone(), otp_ttl());
        let manager = SessionManager::new(sessions.clone(), shared_clock, session_lifetime());
        let auth = AuthService::new(
            otp.clone(),
            manager.clone(),
            mailer,
            access,
            StdDuration::from_millis(200),
        );

        Self {
            clock,
            otp_store,
            sessions,
            mailer: recorder,
            otp,
            manager,
            auth,
        }
    }

    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::new(
            Some(Arc::new(MemoryRateLimitStore::default())),
            Arc::new(self.clock.clone()),
        )
    }

    pub fn state(&self, rate_limiter: RateLimiter) -> AppState {
        AppState {
            auth: self.auth.clone(),
            rate_limiter,
            cookies: Arc::new(CookieSettings::default()),
            login_path: LOGIN_PATH.into(),
            cron_secret: None,
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A session that is active at the harness clock.
    pub async fn signed_in(&self) -> SessionRecord {
        self.manager.create_session(TEST_EMAIL).await.unwrap()
    }
}
