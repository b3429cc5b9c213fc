use chrono::Duration;

use digiinsta_auth::domain::types::SessionRecord;

use crate::helpers::{Harness, TEST_EMAIL};

fn seeded(h: &Harness, token: &str, expires_in: Duration) -> SessionRecord {
    let now = h.clock_now();
    let session = SessionRecord {
        session_token: token.to_owned(),
        email: TEST_EMAIL.to_owned(),
        created_at: now,
        expires_at: now + expires_in,
    };
    h.sessions.seed(session.clone());
    session
}

// ── create / get ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_session_with_configured_lifetime() {
    let h = Harness::new();

    let session = h.manager.create_session(TEST_EMAIL).await.unwrap();

    assert_eq!(session.email, TEST_EMAIL);
    assert_eq!(session.expires_at, session.created_at + Duration::hours(24));
    assert_eq!(h.sessions.get(&session.session_token), Some(session));
}

#[tokio::test]
async fn should_issue_distinct_tokens() {
    let h = Harness::new();

    let a = h.manager.create_session(TEST_EMAIL).await.unwrap();
    let b = h.manager.create_session(TEST_EMAIL).await.unwrap();

    assert_ne!(a.session_token, b.session_token);
    assert_eq!(h.sessions.len(), 2);
}

#[tokio::test]
async fn should_return_active_session() {
    let h = Harness::new();
    seeded(&h, "tok-active", Duration::hours(1));

    let found = h.manager.get_session("tok-active").await.unwrap();

    assert_eq!(found.map(|s| s.email), Some(TEST_EMAIL.to_owned()));
    assert!(h.manager.validate_session("tok-active").await.unwrap());
}

#[tokio::test]
async fn should_treat_expired_session_as_absent_and_sweep_it() {
    let h = Harness::new();
    seeded(&h, "tok-old", Duration::hours(1));

    h.clock.advance(Duration::hours(1));

    assert!(h.manager.get_session("tok-old").await.unwrap().is_none());
    assert!(h.sessions.get("tok-old").is_none());
}

#[tokio::test]
async fn should_treat_unknown_and_empty_tokens_as_absent() {
    let h = Harness::new();

    assert!(h.manager.get_session("nope").await.unwrap().is_none());
    assert!(!h.manager.validate_session("").await.unwrap());
}

// ── refresh ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_extend_active_session_to_now_plus_lifetime() {
    let h = Harness::new();
    let session = h.signed_in().await;

    h.clock.advance(Duration::hours(20));
    assert!(h.manager.refresh_session(&session.session_token).await.unwrap());

    let refreshed = h.sessions.get(&session.session_token).unwrap();
    assert_eq!(refreshed.expires_at, h.clock_now() + Duration::hours(24));
    assert_eq!(refreshed.created_at, session.created_at);
}

#[tokio::test]
async fn should_not_resurrect_expired_session_on_refresh() {
    let h = Harness::new();
    let session = seeded(&h, "tok-stale", Duration::minutes(5));

    h.clock.advance(Duration::minutes(6));

    assert!(!h.manager.refresh_session("tok-stale").await.unwrap());
    assert!(h.manager.get_session("tok-stale").await.unwrap().is_none());
    assert!(h.sessions.get(&session.session_token).is_none());
}

#[tokio::test]
async fn should_not_refresh_unknown_session() {
    let h = Harness::new();

    assert!(!h.manager.refresh_session("ghost").await.unwrap());
    assert!(!h.manager.refresh_session("").await.unwrap());
    assert_eq!(h.sessions.len(), 0);
}

// ── invalidate ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_invalidate_idempotently() {
    let h = Harness::new();
    let session = h.signed_in().await;

    h.manager.invalidate_session(&session.session_token).await.unwrap();
    h.manager.invalidate_session(&session.session_token).await.unwrap();
    h.manager.invalidate_session("never-existed").await.unwrap();

    assert!(!h.manager.validate_session(&session.session_token).await.unwrap());
}

// ── cleanup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_remove_only_expired_sessions() {
    let h = Harness::new();
    seeded(&h, "a", Duration::minutes(1));
    seeded(&h, "b", Duration::minutes(2));
    seeded(&h, "c", Duration::hours(2));

    h.clock.advance(Duration::minutes(30));
    let deleted = h.manager.cleanup_expired_sessions().await.unwrap();

    assert_eq!(deleted, 2);
    assert!(h.sessions.get("c").is_some());
    assert_eq!(h.manager.cleanup_expired_sessions().await.unwrap(), 0);
}
