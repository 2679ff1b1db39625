// ABOUTME: One-time-password challenge engine for step-up verification
// ABOUTME: Issues and verifies short-lived single-use codes bound to an admin and a purpose
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # OTP Challenge Engine
//!
//! The challenge state machine per `(admin, purpose)`:
//!
//! ```text
//! NoChallenge -> Issued -> { Consumed | Expired }
//!                  ^  |
//!                  +--+  re-issuance (invalidates the prior challenge)
//! ```
//!
//! At most one live challenge per purpose exists at any time; issuing a new
//! one invalidates the prior unconsumed challenge in the same transaction.
//! Codes come from the OS randomness source, are handed to the caller
//! exactly once, and are persisted only as a SHA-256 digest.
//!
//! Verification leaves a mismatched challenge live until it expires or is
//! replaced. There is no lockout here; unlimited guesses against a live
//! code are a known weakness of this contract, left to the surrounding
//! rate limiter.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::{OtpChallenge, OtpPurpose};

/// The one moment a raw code exists outside the delivery message
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub challenge_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// OTP challenge engine over the injected storage capability
pub struct OtpEngine {
    database: Arc<Database>,
}

impl OtpEngine {
    #[must_use]
    pub const fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Issue a fresh challenge, invalidating any prior unconsumed challenge
    /// of the same purpose for this admin.
    ///
    /// The raw code is returned once for the caller to hand to a delivery
    /// channel and is never persisted; the destination is stored only as its
    /// lookup hash.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty destination or an error if the
    /// transaction fails.
    pub async fn issue(
        &self,
        admin_id: Uuid,
        destination: &str,
        purpose: OtpPurpose,
        ttl_minutes: i64,
    ) -> AuthResult<IssuedChallenge> {
        let destination_hash = crate::crypto::PhoneCodec::lookup_hash(destination)
            .ok_or_else(|| AuthError::Validation("Destination is required".into()))?;

        let code = generate_code();
        let now = Utc::now();

        let challenge = OtpChallenge {
            id: Uuid::new_v4(),
            admin_id,
            destination_hash,
            code_hash: hash_code(&code),
            purpose,
            expires_at: now + Duration::minutes(ttl_minutes),
            consumed: false,
            created_at: now,
        };

        self.database.replace_challenge(&challenge).await?;

        tracing::info!(
            admin_id = %admin_id,
            purpose = purpose.as_str(),
            challenge_id = %challenge.id,
            "otp challenge issued"
        );

        Ok(IssuedChallenge {
            challenge_id: challenge.id,
            code,
            expires_at: challenge.expires_at,
        })
    }

    /// Verify a submitted code against the live challenge for
    /// `(admin, destination, purpose)`.
    ///
    /// On success the challenge is consumed atomically; a consumed
    /// challenge can never verify again, even under concurrent attempts. On
    /// mismatch the challenge stays live and consumable until expiry or
    /// replacement.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure; "no", "expired", and
    /// "wrong code" all return `Ok(false)`.
    pub async fn verify(
        &self,
        admin_id: Uuid,
        destination: &str,
        purpose: OtpPurpose,
        submitted_code: &str,
    ) -> AuthResult<bool> {
        let Some(destination_hash) = crate::crypto::PhoneCodec::lookup_hash(destination) else {
            return Ok(false);
        };

        let Some(challenge) = self
            .database
            .latest_unconsumed_challenge(admin_id, &destination_hash, purpose)
            .await?
        else {
            return Ok(false);
        };

        if challenge.is_expired(Utc::now()) {
            return Ok(false);
        }

        let submitted_hash = hash_code(submitted_code);
        let matches: bool = submitted_hash
            .as_bytes()
            .ct_eq(challenge.code_hash.as_bytes())
            .into();
        if !matches {
            tracing::debug!(admin_id = %admin_id, purpose = purpose.as_str(), "otp code mismatch");
            return Ok(false);
        }

        // The conditional update is what makes consumption exactly-once
        let consumed = self.database.consume_challenge(challenge.id).await?;
        if consumed {
            tracing::info!(
                admin_id = %admin_id,
                purpose = purpose.as_str(),
                challenge_id = %challenge.id,
                "otp challenge consumed"
            );
        }
        Ok(consumed)
    }
}

/// Fixed-width 6-digit code from the OS randomness source
fn generate_code() -> String {
    rand::rngs::OsRng.gen_range(100_000..1_000_000).to_string()
}

fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}
