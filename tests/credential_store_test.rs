// ABOUTME: Integration tests for the credential store
// ABOUTME: Registration, uniqueness enforcement, password verification, and phone lookups
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{create_test_harness, unique_register_request};
use gatewarden::errors::AuthError;
use gatewarden::models::AdminRole;
use gatewarden::store::NewAdmin;

fn new_admin_from(request: &gatewarden::routes::auth::RegisterRequest) -> NewAdmin {
    NewAdmin {
        full_name: request.full_name.clone(),
        email: request.email.clone(),
        phone: request.phone.clone(),
        password: request.password.clone(),
        role: request.role,
    }
}

#[tokio::test]
async fn test_register_produces_complete_identity() {
    let harness = create_test_harness().await;
    let request = unique_register_request();

    let admin = harness
        .resources
        .store
        .register(new_admin_from(&request))
        .await
        .unwrap();

    assert_eq!(admin.email, request.email);
    assert_eq!(admin.role, AdminRole::Admin);
    assert!(!admin.two_factor_enabled);
    assert!(!admin.phone_verified);

    // Password stored only as a bcrypt hash
    assert_ne!(admin.password_hash, request.password);
    assert!(admin.password_hash.starts_with("$2"));

    // Phone stored only as derived artifacts
    let phone = admin.phone.as_ref().unwrap();
    assert!(!phone.ciphertext.contains(&request.phone));
    assert_eq!(phone.last4, &request.phone[request.phone.len() - 4..]);
    assert_eq!(phone.lookup_hash.len(), 64);
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let harness = create_test_harness().await;
    let request = unique_register_request();

    harness
        .resources
        .store
        .register(new_admin_from(&request))
        .await
        .unwrap();

    // Same email, different phone
    let mut second = new_admin_from(&unique_register_request());
    second.email = request.email.clone();

    let err = harness.resources.store.register(second).await.unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));
}

#[tokio::test]
async fn test_register_rejects_duplicate_phone_across_formats() {
    let harness = create_test_harness().await;
    let request = unique_register_request();

    harness
        .resources
        .store
        .register(new_admin_from(&request))
        .await
        .unwrap();

    // Same number, different formatting and a country code prefix
    let mut second = new_admin_from(&unique_register_request());
    let second_email = second.email.clone();
    second.phone = format!("+91 {}", request.phone);

    let err = harness.resources.store.register(second).await.unwrap_err();
    assert!(matches!(err, AuthError::DuplicatePhone));

    // No partial record left behind
    let leftover = harness
        .resources
        .store
        .find_by_email(&second_email)
        .await
        .unwrap();
    assert!(leftover.is_none());
}

#[tokio::test]
async fn test_register_validates_input() {
    let harness = create_test_harness().await;

    let mut bad_phone = new_admin_from(&unique_register_request());
    bad_phone.phone = "12345".into();
    assert!(matches!(
        harness.resources.store.register(bad_phone).await,
        Err(AuthError::Validation(_))
    ));

    let mut bad_email = new_admin_from(&unique_register_request());
    bad_email.email = "not-an-email".into();
    assert!(matches!(
        harness.resources.store.register(bad_email).await,
        Err(AuthError::Validation(_))
    ));

    let mut weak_password = new_admin_from(&unique_register_request());
    weak_password.password = "short".into();
    assert!(matches!(
        harness.resources.store.register(weak_password).await,
        Err(AuthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_verify_password() {
    let harness = create_test_harness().await;
    let request = unique_register_request();
    let admin = harness
        .resources
        .store
        .register(new_admin_from(&request))
        .await
        .unwrap();

    assert!(harness
        .resources
        .store
        .verify_password(&admin, &request.password)
        .await
        .unwrap());
    assert!(!harness
        .resources
        .store
        .verify_password(&admin, "definitely-wrong")
        .await
        .unwrap());
    assert!(!harness
        .resources
        .store
        .verify_password(&admin, "")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_find_by_phone_uses_normalized_lookup() {
    let harness = create_test_harness().await;
    let request = unique_register_request();
    let admin = harness
        .resources
        .store
        .register(new_admin_from(&request))
        .await
        .unwrap();

    // Different raw shapes of the same number resolve to the same identity
    let found = harness
        .resources
        .store
        .find_by_phone(&format!("91{}", request.phone))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, admin.id);

    assert!(matches!(
        harness.resources.store.find_by_phone("garbage").await,
        Err(AuthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_update_password_changes_credential() {
    let harness = create_test_harness().await;
    let request = unique_register_request();
    let admin = harness
        .resources
        .store
        .register(new_admin_from(&request))
        .await
        .unwrap();

    harness
        .resources
        .store
        .update_password(admin.id, "brand-new-password")
        .await
        .unwrap();

    let updated = harness
        .resources
        .store
        .find_by_id(admin.id)
        .await
        .unwrap()
        .unwrap();
    assert!(harness
        .resources
        .store
        .verify_password(&updated, "brand-new-password")
        .await
        .unwrap());
    assert!(!harness
        .resources
        .store
        .verify_password(&updated, &request.password)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_touch_last_login_and_flags() {
    let harness = create_test_harness().await;
    let admin = harness
        .resources
        .store
        .register(new_admin_from(&unique_register_request()))
        .await
        .unwrap();
    assert!(admin.last_login_at.is_none());

    harness
        .resources
        .store
        .touch_last_login(admin.id)
        .await
        .unwrap();
    harness
        .resources
        .store
        .set_phone_verified(admin.id, true)
        .await
        .unwrap();
    harness
        .resources
        .store
        .set_two_factor(admin.id, true)
        .await
        .unwrap();

    let updated = harness
        .resources
        .store
        .find_by_id(admin.id)
        .await
        .unwrap()
        .unwrap();
    assert!(updated.last_login_at.is_some());
    assert!(updated.phone_verified);
    assert!(updated.two_factor_enabled);
}

#[tokio::test]
async fn test_phone_plaintext_round_trips() {
    let harness = create_test_harness().await;
    let request = unique_register_request();
    let admin = harness
        .resources
        .store
        .register(new_admin_from(&request))
        .await
        .unwrap();

    let plaintext = harness
        .resources
        .store
        .phone_plaintext(&admin)
        .unwrap()
        .unwrap();
    assert_eq!(plaintext, format!("+91{}", request.phone));
}
