// ABOUTME: Unified error handling for the credential core
// ABOUTME: Defines the externally visible error taxonomy and its HTTP response mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Unified Error Handling
//!
//! Every failure this core can surface to a caller is one of the variants
//! below. The taxonomy is deliberately coarse at the security boundaries:
//! wrong password and unknown identifier collapse into
//! [`AuthError::InvalidCredentials`], and for each token scope the "wrong"
//! and "expired" cases collapse into a single
//! [`AuthError::InvalidOrExpiredToken`] so that responses never reveal which
//! check failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which credential artifact an `InvalidOrExpiredToken` failure refers to.
///
/// The scope is visible to callers (a reset failure reads differently from a
/// session failure) but within a scope the reason never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// Signed session bearer token
    Session,
    /// Single-use password reset token
    Reset,
    /// One-time two-factor / verification code
    Otp,
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "token"),
            Self::Reset => write!(f, "reset token"),
            Self::Otp => write!(f, "verification code"),
        }
    }
}

/// Unified error type for the credential core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input the caller can correct
    #[error("{0}")]
    Validation(String),

    /// Registration conflict on the email column
    #[error("Email already registered")]
    DuplicateEmail,

    /// Registration conflict on the phone lookup hash
    #[error("Phone number already registered")]
    DuplicatePhone,

    /// Wrong password or unknown identifier; always this single generic kind
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token failure, scoped but never distinguishing wrong from expired
    #[error("Invalid or expired {0}")]
    InvalidOrExpiredToken(TokenScope),

    /// No usable credential presented
    #[error("Not authorized to access this route")]
    Unauthorized,

    /// Authenticated but insufficient role
    #[error("You do not have permission to perform this action")]
    Forbidden,

    /// Outbound delivery failed; logged, not fatal to the triggering operation
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Storage failure; detail is logged, never surfaced
    #[error("Database operation failed")]
    Database(#[from] sqlx::Error),

    /// Anything else that should not happen; detail is logged, never surfaced
    #[error("Internal error")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for API consumers
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::DuplicatePhone => "DUPLICATE_PHONE",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidOrExpiredToken(_) => "INVALID_OR_EXPIRED_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Delivery(_) => "DELIVERY_FAILURE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail | Self::DuplicatePhone => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidOrExpiredToken(scope) => match scope {
                // Session failures read as auth failures; reset/OTP
                // submissions are request-payload problems.
                TokenScope::Session => StatusCode::UNAUTHORIZED,
                TokenScope::Reset | TokenScope::Otp => StatusCode::BAD_REQUEST,
            },
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to place in a response payload.
    ///
    /// Storage and internal errors keep their detail in the logs only.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }

    /// Shorthand for an internal error with context
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type alias for the credential core
pub type AuthResult<T> = Result<T, AuthError>;

/// JSON error envelope returned by all handlers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl From<&AuthError> for ErrorResponse {
    fn from(error: &AuthError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.code().into(),
                message: error.public_message(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "database error while handling request");
            }
            AuthError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error while handling request");
            }
            _ => {}
        }
        let body = ErrorResponse::from(&self);
        (self.http_status(), Json(body)).into_response()
    }
}
