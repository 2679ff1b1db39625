// ABOUTME: Password reset flow: request tokens and redeem them exactly once
// ABOUTME: Enumeration-safe requests; redemption commits atomically with the credential change
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Password Reset Flow
//!
//! Lets a principal who knows their registered email or phone, but not
//! their password, set a new one, without ever confirming account
//! existence to an unauthenticated caller. `request` resolves the
//! identifier internally and the orchestrator answers identically whether
//! or not an account was found.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::{AdminIdentity, PasswordResetToken};
use crate::store::CredentialStore;

/// Bytes of entropy in a reset token (hex-encoded for transport)
const TOKEN_BYTES: usize = 32;

/// Password reset flow over the injected store and storage capability
pub struct ResetFlow {
    database: Arc<Database>,
    store: Arc<CredentialStore>,
    token_ttl_minutes: i64,
}

impl ResetFlow {
    #[must_use]
    pub const fn new(
        database: Arc<Database>,
        store: Arc<CredentialStore>,
        token_ttl_minutes: i64,
    ) -> Self {
        Self {
            database,
            store,
            token_ttl_minutes,
        }
    }

    /// Handle a reset request for an email-or-phone identifier.
    ///
    /// Returns `Ok(None)` when no account resolves, including when the
    /// identifier fails validation, so the caller can produce the same
    /// success-shaped response either way. When an account is found, a
    /// high-entropy token is persisted and returned with the identity for
    /// delivery to the registered email.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure; resolution failures are
    /// deliberately indistinguishable from success.
    pub async fn request(
        &self,
        identifier: &str,
    ) -> AuthResult<Option<(AdminIdentity, String)>> {
        let admin = match self.store.find_by_identifier(identifier).await {
            Ok(Some(admin)) => admin,
            // Unknown account and malformed identifier look identical
            Ok(None) | Err(AuthError::Validation(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let raw_token = generate_reset_token();
        let now = Utc::now();

        let record = PasswordResetToken {
            id: Uuid::new_v4(),
            admin_id: admin.id,
            token: raw_token.clone(),
            expires_at: now + Duration::minutes(self.token_ttl_minutes),
            used: false,
            created_at: now,
        };

        self.database.create_reset_token(&record).await?;

        tracing::info!(admin_id = %admin.id, "password reset token issued");
        Ok(Some((admin, raw_token)))
    }

    /// Redeem a reset token and set the new password.
    ///
    /// The token lookup, single-use consumption, and credential update are
    /// one atomic storage operation: of any concurrent redemptions with the
    /// same token, exactly one succeeds and the rest fail with the collapsed
    /// token error.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a weak password, or the collapsed
    /// `InvalidOrExpiredToken` for an unknown, used, or expired token.
    pub async fn redeem(&self, token: &str, new_password: &str) -> AuthResult<Uuid> {
        if new_password.len() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }

        let new_hash = self.store.hash_password(new_password.to_owned()).await?;
        let admin_id = self
            .database
            .redeem_reset_token(token, &new_hash, Utc::now())
            .await?;

        tracing::info!(admin_id = %admin_id, "password reset completed");
        Ok(admin_id)
    }
}

/// 256 bits of entropy, hex-encoded
fn generate_reset_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
