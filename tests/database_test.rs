// ABOUTME: Storage-level tests for the database capability
// ABOUTME: File-backed persistence and constraint-level uniqueness enforcement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::init_test_logging;
use gatewarden::crypto::{PhoneArtifacts, PhoneCodec};
use gatewarden::database::Database;
use gatewarden::errors::AuthError;
use gatewarden::models::{AdminIdentity, AdminRole};

fn artifacts_for(phone: &str) -> PhoneArtifacts {
    let codec = PhoneCodec::new([9u8; 32]);
    codec.seal(phone).unwrap().unwrap()
}

fn test_identity(email: &str, phone: &str) -> AdminIdentity {
    AdminIdentity::new(
        "Storage Test".into(),
        email.into(),
        "$2b$04$placeholderhashplaceholderhash".into(),
        Some(artifacts_for(phone)),
        AdminRole::Admin,
    )
}

#[tokio::test]
async fn test_file_backed_database_persists_across_connections() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("gatewarden.db").display());

    let admin = test_identity("persist@example.com", "+919876500001");
    {
        let database = Database::new(&url).await.unwrap();
        database.create_admin(&admin).await.unwrap();
    }

    // Fresh connection over the same file sees the record
    let database = Database::new(&url).await.unwrap();
    let found = database
        .get_admin_by_email("persist@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, admin.id);
    assert_eq!(found.phone.unwrap(), admin.phone.unwrap());
}

#[tokio::test]
async fn test_unique_constraints_are_the_authoritative_guard() {
    init_test_logging();
    let database = Database::new("sqlite::memory:").await.unwrap();

    let first = test_identity("unique@example.com", "+919876500002");
    database.create_admin(&first).await.unwrap();

    // Insert bypasses any application-level pre-check; the constraint
    // itself must reject the duplicate
    let same_email = test_identity("unique@example.com", "+919876500003");
    assert!(matches!(
        database.create_admin(&same_email).await,
        Err(AuthError::DuplicateEmail)
    ));

    let same_phone = test_identity("other@example.com", "+919876500002");
    assert!(matches!(
        database.create_admin(&same_phone).await,
        Err(AuthError::DuplicatePhone)
    ));
}

#[tokio::test]
async fn test_admins_without_phone_do_not_collide() {
    init_test_logging();
    let database = Database::new("sqlite::memory:").await.unwrap();

    let mut first = test_identity("nophone1@example.com", "+919876500004");
    first.phone = None;
    let mut second = test_identity("nophone2@example.com", "+919876500005");
    second.phone = None;

    // NULL phone hashes are not treated as equal by the unique index
    database.create_admin(&first).await.unwrap();
    database.create_admin(&second).await.unwrap();
}
