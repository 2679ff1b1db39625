// ABOUTME: Integration tests for the OTP challenge engine
// ABOUTME: Single consumption, re-issuance invalidation, expiry, and purpose isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::Utc;
use common::{create_test_harness, unique_register_request, TestHarness};
use gatewarden::models::{AdminIdentity, OtpPurpose};
use gatewarden::store::NewAdmin;

async fn register_admin(harness: &TestHarness) -> (AdminIdentity, String) {
    let request = unique_register_request();
    let admin = harness
        .resources
        .store
        .register(NewAdmin {
            full_name: request.full_name,
            email: request.email,
            phone: request.phone.clone(),
            password: request.password,
            role: None,
        })
        .await
        .unwrap();
    (admin, format!("+91{}", request.phone))
}

#[tokio::test]
async fn test_correct_code_verifies_exactly_once() {
    let harness = create_test_harness().await;
    let (admin, phone) = register_admin(&harness).await;

    let issued = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 10)
        .await
        .unwrap();
    assert_eq!(issued.code.len(), 6);

    let first = harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &issued.code)
        .await
        .unwrap();
    assert!(first);

    // Replay within the expiry window still fails: consumed is consumed
    let replay = harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &issued.code)
        .await
        .unwrap();
    assert!(!replay);
}

#[tokio::test]
async fn test_reissuance_invalidates_prior_challenge() {
    let harness = create_test_harness().await;
    let (admin, phone) = register_admin(&harness).await;

    let first = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 10)
        .await
        .unwrap();
    let second = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 10)
        .await
        .unwrap();
    assert_ne!(first.challenge_id, second.challenge_id);

    // The first challenge's code no longer verifies, even if the codes
    // happen to collide the first row is gone
    if first.code != second.code {
        let stale = harness
            .resources
            .otp
            .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &first.code)
            .await
            .unwrap();
        assert!(!stale);
    }

    let live = harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &second.code)
        .await
        .unwrap();
    assert!(live);
}

#[tokio::test]
async fn test_mismatch_leaves_challenge_live() {
    let harness = create_test_harness().await;
    let (admin, phone) = register_admin(&harness).await;

    let issued = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 10)
        .await
        .unwrap();

    let wrong_code = if issued.code == "000000" { "000001" } else { "000000" };
    let wrong = harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, wrong_code)
        .await
        .unwrap();
    assert!(!wrong);

    // A failed guess does not invalidate the live challenge
    let correct = harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &issued.code)
        .await
        .unwrap();
    assert!(correct);
}

#[tokio::test]
async fn test_expired_challenge_fails_at_verification_time() {
    let harness = create_test_harness().await;
    let (admin, phone) = register_admin(&harness).await;

    let issued = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 0)
        .await
        .unwrap();

    let verified = harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &issued.code)
        .await
        .unwrap();
    assert!(!verified);
}

#[tokio::test]
async fn test_destination_and_purpose_must_match() {
    let harness = create_test_harness().await;
    let (admin, phone) = register_admin(&harness).await;

    let issued = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 10)
        .await
        .unwrap();

    // Wrong destination
    assert!(!harness
        .resources
        .otp
        .verify(
            admin.id,
            "+919999999999",
            OtpPurpose::TwoFactorLogin,
            &issued.code
        )
        .await
        .unwrap());

    // Wrong purpose
    assert!(!harness
        .resources
        .otp
        .verify(
            admin.id,
            &phone,
            OtpPurpose::PhoneVerification,
            &issued.code
        )
        .await
        .unwrap());

    // Exact match still live
    assert!(harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &issued.code)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_purposes_do_not_invalidate_each_other() {
    let harness = create_test_harness().await;
    let (admin, phone) = register_admin(&harness).await;

    let login = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 10)
        .await
        .unwrap();
    let verification = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::PhoneVerification, 10)
        .await
        .unwrap();

    // Issuing the verification challenge did not invalidate the login one
    assert!(harness
        .resources
        .otp
        .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &login.code)
        .await
        .unwrap());
    assert!(harness
        .resources
        .otp
        .verify(
            admin.id,
            &phone,
            OtpPurpose::PhoneVerification,
            &verification.code
        )
        .await
        .unwrap());
}

#[tokio::test]
async fn test_purge_removes_only_expired_challenges() {
    let harness = create_test_harness().await;
    let (admin, phone) = register_admin(&harness).await;

    let expired = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::PhoneVerification, 0)
        .await
        .unwrap();
    let live = harness
        .resources
        .otp
        .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, 10)
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let purged = harness
        .database
        .purge_expired_challenges(Utc::now())
        .await
        .unwrap();
    assert_eq!(purged, 1);

    assert!(harness
        .database
        .get_challenge(expired.challenge_id)
        .await
        .unwrap()
        .is_none());
    assert!(harness
        .database
        .get_challenge(live.challenge_id)
        .await
        .unwrap()
        .is_some());
}
