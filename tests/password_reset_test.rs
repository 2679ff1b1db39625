// ABOUTME: Integration tests for the password reset flow
// ABOUTME: Enumeration safety, exactly-once redemption, and expiry enforcement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::{Duration, Utc};
use common::{create_test_harness, unique_register_request};
use gatewarden::errors::{AuthError, TokenScope};
use gatewarden::models::PasswordResetToken;
use gatewarden::routes::auth::LoginRequest;
use uuid::Uuid;

#[tokio::test]
async fn test_unknown_identifier_looks_like_success() {
    let harness = create_test_harness().await;

    // Unknown email, unknown phone, and malformed identifier all succeed
    // without sending anything
    for identifier in ["nobody@example.com", "9111111111", "not even a phone"] {
        harness
            .service
            .request_password_reset(identifier)
            .await
            .unwrap();
    }
    assert!(harness.email.is_empty());
}

#[tokio::test]
async fn test_reset_flow_end_to_end() {
    let harness = create_test_harness().await;
    let request = unique_register_request();
    let email = request.email.clone();
    let old_password = request.password.clone();
    harness.service.register(request).await.unwrap();

    harness.service.request_password_reset(&email).await.unwrap();
    let token = harness.email.wait_for_reset_token().await;

    harness
        .service
        .redeem_password_reset(&token, "fresh-new-password")
        .await
        .unwrap();

    // New password works, old one does not
    assert!(harness
        .service
        .login(LoginRequest {
            identifier: email.clone(),
            password: "fresh-new-password".into(),
            remember_me: None,
        })
        .await
        .is_ok());
    assert!(matches!(
        harness
            .service
            .login(LoginRequest {
                identifier: email,
                password: old_password,
                remember_me: None,
            })
            .await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_token_redeems_exactly_once() {
    let harness = create_test_harness().await;
    let request = unique_register_request();
    let email = request.email.clone();
    harness.service.register(request).await.unwrap();

    harness.service.request_password_reset(&email).await.unwrap();
    let token = harness.email.wait_for_reset_token().await;

    harness
        .service
        .redeem_password_reset(&token, "first-redemption")
        .await
        .unwrap();

    let second = harness
        .service
        .redeem_password_reset(&token, "second-redemption")
        .await;
    assert!(matches!(
        second,
        Err(AuthError::InvalidOrExpiredToken(TokenScope::Reset))
    ));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let harness = create_test_harness().await;
    let request = unique_register_request();
    let email = request.email.clone();
    let bundle = harness.service.register(request).await.unwrap();

    // Persist a token that expired a minute ago
    let stale = PasswordResetToken {
        id: Uuid::new_v4(),
        admin_id: bundle.admin.id,
        token: "a".repeat(64),
        expires_at: Utc::now() - Duration::minutes(1),
        used: false,
        created_at: Utc::now() - Duration::minutes(31),
    };
    harness.database.create_reset_token(&stale).await.unwrap();

    let result = harness
        .service
        .redeem_password_reset(&stale.token, "does-not-matter-8")
        .await;
    assert!(matches!(
        result,
        Err(AuthError::InvalidOrExpiredToken(TokenScope::Reset))
    ));

    // The failed redemption did not change the credential
    assert!(harness
        .service
        .login(LoginRequest {
            identifier: email,
            password: "correct-horse-battery".into(),
            remember_me: None,
        })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_unknown_token_and_weak_password_are_rejected() {
    let harness = create_test_harness().await;

    assert!(matches!(
        harness
            .service
            .redeem_password_reset(&"f".repeat(64), "good-enough-password")
            .await,
        Err(AuthError::InvalidOrExpiredToken(TokenScope::Reset))
    ));

    assert!(matches!(
        harness
            .service
            .redeem_password_reset(&"f".repeat(64), "short")
            .await,
        Err(AuthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_purge_removes_only_expired_tokens() {
    let harness = create_test_harness().await;
    let bundle = harness
        .service
        .register(unique_register_request())
        .await
        .unwrap();

    let expired = PasswordResetToken {
        id: Uuid::new_v4(),
        admin_id: bundle.admin.id,
        token: "b".repeat(64),
        expires_at: Utc::now() - Duration::minutes(1),
        used: false,
        created_at: Utc::now(),
    };
    let live = PasswordResetToken {
        id: Uuid::new_v4(),
        admin_id: bundle.admin.id,
        token: "c".repeat(64),
        expires_at: Utc::now() + Duration::minutes(30),
        used: false,
        created_at: Utc::now(),
    };
    harness.database.create_reset_token(&expired).await.unwrap();
    harness.database.create_reset_token(&live).await.unwrap();

    let purged = harness
        .database
        .purge_expired_reset_tokens(Utc::now())
        .await
        .unwrap();
    assert_eq!(purged, 1);

    assert!(harness
        .database
        .get_unused_reset_token(&live.token)
        .await
        .unwrap()
        .is_some());
    assert!(harness
        .database
        .get_unused_reset_token(&expired.token)
        .await
        .unwrap()
        .is_none());
}
