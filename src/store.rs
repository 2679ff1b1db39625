// ABOUTME: Credential store service over the database capability
// ABOUTME: Registration, password verification, hash-based phone lookups, and credential updates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Credential Store
//!
//! Owns the lifecycle of [`AdminIdentity`] records. Phone numbers are
//! normalized before any hashing or encryption, so the three stored
//! artifacts are always derived from the same canonical plaintext. Lookups
//! by phone go through the deterministic lookup hash; no operation scans and
//! decrypts rows.

use std::sync::Arc;

use uuid::Uuid;

use crate::crypto::{phone_format, PhoneCodec};
use crate::database::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::{AdminIdentity, AdminRole};

/// New admin registration input
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Option<AdminRole>,
}

/// Credential store service
pub struct CredentialStore {
    database: Arc<Database>,
    codec: Arc<PhoneCodec>,
    bcrypt_cost: u32,
}

impl CredentialStore {
    #[must_use]
    pub const fn new(database: Arc<Database>, codec: Arc<PhoneCodec>, bcrypt_cost: u32) -> Self {
        Self {
            database,
            codec,
            bcrypt_cost,
        }
    }

    /// Register a new admin identity.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed input (including a phone that does
    /// not normalize), `DuplicateEmail`/`DuplicatePhone` on conflict. The
    /// storage-level unique constraints are the authoritative guard, so two
    /// concurrent registrations with the same phone cannot both succeed.
    pub async fn register(&self, new_admin: NewAdmin) -> AuthResult<AdminIdentity> {
        if new_admin.full_name.trim().is_empty() {
            return Err(AuthError::Validation("Full name is required".into()));
        }
        if !Self::is_valid_email(&new_admin.email) {
            return Err(AuthError::Validation("Invalid email format".into()));
        }
        if !Self::is_valid_password(&new_admin.password) {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }

        let normalized_phone = phone_format::normalize(&new_admin.phone).ok_or_else(|| {
            AuthError::Validation(
                "Phone number must be an Indian number: +91 followed by 10 digits".into(),
            )
        })?;

        let artifacts = self
            .codec
            .seal(&normalized_phone)
            .map_err(|e| AuthError::internal(format!("phone encryption failed: {e}")))?;

        let password_hash = self.hash_password(new_admin.password).await?;

        let admin = AdminIdentity::new(
            new_admin.full_name,
            new_admin.email,
            password_hash,
            artifacts,
            new_admin.role.unwrap_or(AdminRole::Admin),
        );

        self.database.create_admin(&admin).await?;

        tracing::info!(admin_id = %admin.id, "admin registered");
        Ok(admin)
    }

    /// Check a candidate password against the stored credential.
    ///
    /// bcrypt's own verify performs the comparison; timing does not depend
    /// on which byte differs. Runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the hash is unparseable or the blocking
    /// task fails.
    pub async fn verify_password(
        &self,
        admin: &AdminIdentity,
        candidate: &str,
    ) -> AuthResult<bool> {
        let candidate = candidate.to_owned();
        let password_hash = admin.password_hash.clone();

        tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &password_hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))?
            .map_err(|e| AuthError::internal(format!("password verification error: {e}")))
    }

    /// Find an admin by email
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<AdminIdentity>> {
        self.database.get_admin_by_email(email).await
    }

    /// Find an admin by raw phone number: normalize, hash, look up by hash.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the phone does not normalize.
    pub async fn find_by_phone(&self, raw_phone: &str) -> AuthResult<Option<AdminIdentity>> {
        let normalized = phone_format::normalize(raw_phone)
            .ok_or_else(|| AuthError::Validation("Invalid phone number format".into()))?;
        let hash = PhoneCodec::lookup_hash(&normalized)
            .ok_or_else(|| AuthError::Validation("Invalid phone number format".into()))?;
        self.database.get_admin_by_phone_hash(&hash).await
    }

    /// Find an admin by email-or-phone identifier, as login and reset accept
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a phone identifier that does not normalize.
    pub async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<AdminIdentity>> {
        if identifier.contains('@') {
            self.find_by_email(identifier).await
        } else {
            self.find_by_phone(identifier).await
        }
    }

    /// Find an admin by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn find_by_id(&self, admin_id: Uuid) -> AuthResult<Option<AdminIdentity>> {
        self.database.get_admin(admin_id).await
    }

    /// Replace an admin's password through the explicit password-change path.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a weak password or an error if the update
    /// fails.
    pub async fn update_password(&self, admin_id: Uuid, new_password: &str) -> AuthResult<()> {
        if !Self::is_valid_password(new_password) {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }
        let hash = self.hash_password(new_password.to_owned()).await?;
        self.database.update_admin_password(admin_id, &hash).await?;
        Ok(())
    }

    /// Record a successful login
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn touch_last_login(&self, admin_id: Uuid) -> AuthResult<()> {
        self.database.touch_last_login(admin_id).await
    }

    /// Toggle the two-factor flag
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn set_two_factor(&self, admin_id: Uuid, enabled: bool) -> AuthResult<()> {
        self.database.set_two_factor(admin_id, enabled).await?;
        Ok(())
    }

    /// Mark the registered phone verified
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn set_phone_verified(&self, admin_id: Uuid, verified: bool) -> AuthResult<()> {
        self.database.set_phone_verified(admin_id, verified).await?;
        Ok(())
    }

    /// Change an admin's role
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_role(&self, admin_id: Uuid, role: AdminRole) -> AuthResult<()> {
        self.database.update_admin_role(admin_id, role).await?;
        Ok(())
    }

    /// Decrypt the registered phone for authorized internal callers
    /// (delivery, display); the ciphertext itself never leaves the store.
    ///
    /// # Errors
    ///
    /// Returns an internal error if decryption fails closed.
    pub fn phone_plaintext(&self, admin: &AdminIdentity) -> AuthResult<Option<String>> {
        admin
            .phone
            .as_ref()
            .map(|artifacts| {
                self.codec
                    .decrypt(&artifacts.ciphertext)
                    .map_err(|e| AuthError::internal(format!("phone decryption failed: {e}")))
            })
            .transpose()
    }

    /// Hash a password on the blocking pool
    ///
    /// # Errors
    ///
    /// Returns an internal error if hashing fails.
    pub(crate) async fn hash_password(&self, password: String) -> AuthResult<String> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| AuthError::internal(format!("password hashing error: {e}")))
    }

    // Simple shape checks; full sanitization is the HTTP layer's concern
    fn is_valid_email(email: &str) -> bool {
        if email.len() <= 5 {
            return false;
        }
        let Some(at_pos) = email.find('@') else {
            return false;
        };
        if at_pos == 0 || at_pos == email.len() - 1 {
            return false;
        }
        email[at_pos + 1..].contains('.')
    }

    const fn is_valid_password(password: &str) -> bool {
        password.len() >= 8
    }
}
