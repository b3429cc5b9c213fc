use std::sync::Arc;

use chrono::Duration;

use digiinsta_auth::domain::types::is_valid_otp_format;
use digiinsta_auth::error::AuthServiceError;
use digiinsta_auth::usecase::otp::OtpService;

use crate::helpers::{Harness, MemoryOtpStore, TEST_EMAIL, otp_ttl};

// ── generate ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_six_digit_code_with_ttl() {
    let h = Harness::new();

    let issued = h.otp.generate(TEST_EMAIL).await.unwrap();

    assert!(is_valid_otp_format(&issued.code));
    assert_eq!(issued.expires_at, h.clock_now() + Duration::minutes(10));
    let stored = h.otp_store.record(TEST_EMAIL).unwrap();
    assert_eq!(stored.code, issued.code);
}

#[tokio::test]
async fn should_store_code_under_normalized_email() {
    let h = Harness::new();

    let issued = h.otp.generate("  Owner@DigiInsta.TEST ").await.unwrap();

    assert_eq!(issued.email, TEST_EMAIL);
    assert!(h.otp_store.record(TEST_EMAIL).is_some());
}

#[tokio::test]
async fn should_reject_invalid_email_without_touching_store() {
    let h = Harness::new();

    let result = h.otp.generate("not-an-email").await;

    assert!(matches!(result, Err(AuthServiceError::InvalidEmail)));
    assert_eq!(h.otp_store.touches(), 0);
}

// ── verify ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_verify_code_exactly_once() {
    let h = Harness::new();
    let issued = h.otp.generate(TEST_EMAIL).await.unwrap();

    h.otp.verify(TEST_EMAIL, &issued.code).await.unwrap();
    let second = h.otp.verify(TEST_EMAIL, &issued.code).await;

    assert!(matches!(second, Err(AuthServiceError::OtpNotFound)));
}

#[tokio::test]
async fn should_invalidate_previous_code_on_reissue() {
    let h = Harness::new();
    let first = h.otp.generate(TEST_EMAIL).await.unwrap();
    let mut second = h.otp.generate(TEST_EMAIL).await.unwrap();
    while second.code == first.code {
        second = h.otp.generate(TEST_EMAIL).await.unwrap();
    }

    let stale = h.otp.verify(TEST_EMAIL, &first.code).await;
    assert!(matches!(stale, Err(AuthServiceError::OtpMismatch)));

    h.otp.verify(TEST_EMAIL, &second.code).await.unwrap();
}

#[tokio::test]
async fn should_report_expired_one_second_after_deadline() {
    let h = Harness::new();
    let issued = h.otp.generate(TEST_EMAIL).await.unwrap();

    h.clock.advance(Duration::minutes(10) + Duration::seconds(1));
    assert!(h.otp_store.record(TEST_EMAIL).is_some(), "store dropped the code at expiry");

    let result = h.otp.verify(TEST_EMAIL, &issued.code).await;
    assert!(matches!(result, Err(AuthServiceError::OtpExpired)));
    assert!(h.otp_store.record(TEST_EMAIL).is_none());
}

#[tokio::test]
async fn should_report_not_found_once_store_retention_lapses() {
    let h = Harness::new();
    let issued = h.otp.generate(TEST_EMAIL).await.unwrap();

    h.clock.advance(Duration::minutes(20));

    let result = h.otp.verify(TEST_EMAIL, &issued.code).await;
    assert!(matches!(result, Err(AuthServiceError::OtpNotFound)));
}

#[tokio::test]
async fn should_accept_code_at_exact_expiry_instant() {
    let h = Harness::new();
    let issued = h.otp.generate(TEST_EMAIL).await.unwrap();

    h.clock.advance(Duration::minutes(10));

    h.otp.verify(TEST_EMAIL, &issued.code).await.unwrap();
}

#[tokio::test]
async fn should_keep_code_after_mismatch() {
    let h = Harness::new();
    h.otp_store.force_code(TEST_EMAIL, "042917", h.clock_now());

    let wrong = h.otp.verify(TEST_EMAIL, "042918").await;
    assert!(matches!(wrong, Err(AuthServiceError::OtpMismatch)));

    h.otp.verify(TEST_EMAIL, "042917").await.unwrap();
}

#[tokio::test]
async fn should_report_not_found_when_no_code_issued() {
    let h = Harness::new();

    let result = h.otp.verify(TEST_EMAIL, "123456").await;

    assert!(matches!(result, Err(AuthServiceError::OtpNotFound)));
}

#[tokio::test]
async fn should_reject_malformed_codes_without_touching_store() {
    let h = Harness::new();

    for code in ["12345", "1234567", "12a456", "", "１２３４５６"] {
        let result = h.otp.verify(TEST_EMAIL, code).await;
        assert!(
            matches!(result, Err(AuthServiceError::InvalidOtpFormat)),
            "code {code:?} gave {result:?}"
        );
    }
    assert_eq!(h.otp_store.touches(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_let_only_one_concurrent_verify_succeed() {
    const ATTEMPTS: usize = 8;
    let h = Harness::new();
    // Every attempt reads the code before any of them tries to consume it.
    let store = Arc::new(MemoryOtpStore::new(h.clock.clone()).with_read_barrier(ATTEMPTS));
    store.force_code(TEST_EMAIL, "555555", h.clock_now());
    let otp = OtpService::new(store.clone(), Arc::new(h.clock.clone()), otp_ttl());

    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|_| {
            let otp = otp.clone();
            tokio::spawn(async move { otp.verify(TEST_EMAIL, "555555").await })
        })
        .collect();
    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(AuthServiceError::OtpNotFound) => {}
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }

    assert_eq!(store.gets(), ATTEMPTS);
    assert_eq!(successes, 1);
    assert_eq!(store.lost_consumes(), ATTEMPTS - 1);
}
