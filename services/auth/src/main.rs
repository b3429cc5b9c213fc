use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::{PoolConfig, Runtime, Timeouts};
use sea_orm::{ConnectOptions, Database};
use tracing::{info, warn};

use digiinsta_auth::config::AuthConfig;
use digiinsta_auth::domain::repository::RateLimitStore;
use digiinsta_auth::infra::cache::RedisOtpStore;
use digiinsta_auth::infra::db::DbSessionRepository;
use digiinsta_auth::infra::mailer::ResendMailer;
use digiinsta_auth::infra::rate_limit::RedisRateLimitStore;
use digiinsta_auth::router::build_router;
use digiinsta_auth::state::AppState;
use digiinsta_auth::usecase::auth::AuthService;
use digiinsta_auth::usecase::otp::OtpService;
use digiinsta_auth::usecase::rate_limit::RateLimiter;
use digiinsta_auth::usecase::session::SessionManager;
use digiinsta_core::clock::{Clock, SystemClock};
use digiinsta_core::config::Config;
use digiinsta_core::tracing::init_tracing;

fn redis_pool(url: &str, timeout: Duration) -> deadpool_redis::Pool {
    let mut cfg = deadpool_redis::Config::from_url(url);
    cfg.pool = Some(PoolConfig {
        timeouts: Timeouts {
            wait: Some(timeout),
            create: Some(timeout),
            recycle: Some(timeout),
        },
        ..PoolConfig::default()
    });
    cfg.create_pool(Some(Runtime::Tokio1))
        .expect("failed to create Redis pool")
}

/// Periodic expired-session sweep; the cron endpoint covers deployments that disable it.
fn spawn_session_sweeper(sessions: SessionManager, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sessions.cleanup_expired_sessions().await {
                warn!(error = ?e, "scheduled session cleanup failed");
            }
        }
    });
}

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AuthConfig::from_env();
    config.validate().expect("invalid configuration");
    let store_timeout = config.store_timeout();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut db_opts = ConnectOptions::new(config.database_url.clone());
    db_opts
        .connect_timeout(store_timeout)
        .acquire_timeout(store_timeout)
        .sqlx_logging(false);
    let db = Database::connect(db_opts)
        .await
        .expect("failed to connect to database");

    let redis = redis_pool(&config.redis_url, store_timeout);

    let rate_limit_store: Option<Arc<dyn RateLimitStore>> = match &config.rate_limit_redis_url {
        Some(url) if !url.is_empty() => Some(Arc::new(RedisRateLimitStore {
            pool: redis_pool(url, store_timeout),
            timeout: store_timeout,
        })),
        _ => {
            warn!("RATE_LIMIT_REDIS_URL not set, rate limiting disabled");
            None
        }
    };

    let http = reqwest::Client::builder()
        .timeout(config.email_timeout())
        .build()
        .expect("failed to build HTTP client");
    let mailer = ResendMailer {
        client: http,
        api_url: config.email_api_url.clone(),
        api_key: config.resend_api_key.clone(),
        from: config.email_from.clone(),
        otp_ttl_minutes: config.otp_ttl_secs / 60,
    };

    let otp = OtpService::new(
        Arc::new(RedisOtpStore {
            pool: redis,
            timeout: store_timeout,
        }),
        clock.clone(),
        config.otp_ttl(),
    );
    let sessions = SessionManager::new(
        Arc::new(DbSessionRepository {
            db,
            timeout: store_timeout,
        }),
        clock.clone(),
        config.session_lifetime(),
    );

    if let Some(every) = config.cleanup_interval() {
        spawn_session_sweeper(sessions.clone(), every);
    }

    let auth = AuthService::new(
        otp,
        sessions,
        Arc::new(mailer),
        config.access_policy(),
        config.email_timeout(),
    );

    let state = AppState {
        auth,
        rate_limiter: RateLimiter::new(rate_limit_store, clock),
        cookies: Arc::new(config.cookie_settings()),
        login_path: config.login_path.as_str().into(),
        cron_secret: config
            .cron_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Into::into),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
