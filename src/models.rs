// ABOUTME: Core data model for the credential core
// ABOUTME: Admin identities, OTP challenges, reset tokens, and the closed role hierarchy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! Core data model.
//!
//! [`AdminIdentity`] is the internal representation and carries the password
//! hash and phone artifacts; [`AdminProfile`] is the only shape that crosses
//! the API boundary. Roles form a closed hierarchy checked through a single
//! authorization function, never through scattered string comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::PhoneArtifacts;
use crate::errors::{AuthError, AuthResult};

/// Raised when a stored role or purpose string is not part of the closed set
#[derive(Debug, Error)]
#[error("unknown value in closed enumeration: {0}")]
pub struct UnknownVariant(pub String);

/// Closed admin role hierarchy: `SuperAdmin ⊇ Admin ⊇ Viewer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
    Viewer,
}

impl AdminRole {
    /// Stable storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Viewer => "viewer",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::SuperAdmin => 2,
            Self::Admin => 1,
            Self::Viewer => 0,
        }
    }

    /// Whether this role carries at least the capabilities of `required`
    #[must_use]
    pub const fn includes(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// The single authorization check point for role-gated operations.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Forbidden`] when this role does not include the
    /// required one.
    pub fn authorize(self, required: Self) -> AuthResult<()> {
        if self.includes(required) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            other => Err(UnknownVariant(other.into())),
        }
    }
}

/// One authenticated principal.
///
/// The phone number exists only as its derived artifacts; the password only
/// as a bcrypt hash. Neither field may appear in an API response; use
/// [`AdminIdentity::profile`] for that.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<PhoneArtifacts>,
    pub password_hash: String,
    pub role: AdminRole,
    pub two_factor_enabled: bool,
    pub phone_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AdminIdentity {
    /// Create a new identity at registration time
    #[must_use]
    pub fn new(
        full_name: String,
        email: String,
        password_hash: String,
        phone: Option<PhoneArtifacts>,
        role: AdminRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            full_name,
            email,
            phone,
            password_hash,
            role,
            two_factor_enabled: false,
            phone_verified: false,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Response-safe projection of this identity
    #[must_use]
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone_last4: self.phone.as_ref().map(|p| p.last4.clone()),
            role: self.role,
        }
    }
}

/// The only identity shape that crosses the API boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_last4: Option<String>,
    pub role: AdminRole,
}

/// What an OTP challenge proves possession of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    PhoneVerification,
    TwoFactorLogin,
}

impl OtpPurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PhoneVerification => "phone_verification",
            Self::TwoFactorLogin => "two_factor_login",
        }
    }
}

impl std::str::FromStr for OtpPurpose {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone_verification" => Ok(Self::PhoneVerification),
            "two_factor_login" => Ok(Self::TwoFactorLogin),
            other => Err(UnknownVariant(other.into())),
        }
    }
}

/// A one-time verification code bound to an admin and a purpose.
///
/// The raw code is never persisted; `code_hash` holds its SHA-256 digest.
/// The destination is held only as its lookup hash.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub destination_hash: String,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl OtpChallenge {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A single-use secret granting permission to set a new password
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
