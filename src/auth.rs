// ABOUTME: JWT-based session token issuance and verification
// ABOUTME: Signs self-contained identity claims with a server secret; stateless on the server side
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Session Token Service
//!
//! Issues and verifies signed, time-bounded bearer tokens carrying identity
//! claims. The server holds only the signing secret, never an issued token;
//! revocation before natural expiry is not supported; rotate the secret to
//! invalidate everything at once.
//!
//! Verification collapses every failure mode (missing, malformed, tampered,
//! expired, wrong secret) into the single externally visible
//! `InvalidOrExpiredToken` kind so responses never leak which check failed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, AuthResult, TokenScope};
use crate::models::{AdminIdentity, AdminRole};

/// Identity claims carried by a session token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Admin ID
    pub sub: String,
    /// Admin email
    pub email: String,
    /// Admin role at issuance time
    pub role: AdminRole,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

/// A freshly signed token plus its lifetime, for payload and cookie delivery
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub max_age_secs: i64,
}

/// Session token manager holding the signing secret
pub struct AuthManager {
    secret: Vec<u8>,
    session_expiry: Duration,
    long_session_expiry: Duration,
}

impl AuthManager {
    /// Create a new session token manager.
    ///
    /// The two expiries come from configuration and must differ meaningfully;
    /// `long_session_expiry` backs the "remember me" path.
    #[must_use]
    pub const fn new(secret: Vec<u8>, session_expiry: Duration, long_session_expiry: Duration) -> Self {
        Self {
            secret,
            session_expiry,
            long_session_expiry,
        }
    }

    /// Sign a session token for an admin.
    ///
    /// # Errors
    ///
    /// Returns an internal error if JWT encoding fails.
    pub fn issue(&self, admin: &AdminIdentity, long_lived: bool) -> AuthResult<IssuedToken> {
        let now = Utc::now();
        let lifetime = if long_lived {
            self.long_session_expiry
        } else {
            self.session_expiry
        };
        let expires_at = now + lifetime;

        let claims = Claims {
            sub: admin.id.to_string(),
            email: admin.email.clone(),
            role: admin.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| AuthError::internal(format!("JWT encoding failed: {e}")))?;

        Ok(IssuedToken {
            token,
            expires_at,
            max_age_secs: lifetime.num_seconds(),
        })
    }

    /// Verify a session token and return its claims.
    ///
    /// # Errors
    ///
    /// Any tampering with claims or expiry, any malformed encoding, a wrong
    /// secret, and natural expiry all return the same
    /// [`AuthError::InvalidOrExpiredToken`].
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "session token rejected");
                AuthError::InvalidOrExpiredToken(TokenScope::Session)
            })
    }
}

/// Generate a random signing secret.
///
/// Development fallback when `JWT_SECRET` is unset; sessions signed with a
/// generated secret do not survive a restart.
#[must_use]
pub fn generate_jwt_secret() -> Vec<u8> {
    use rand::RngCore;
    let mut secret = [0u8; 64];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    secret.to_vec()
}

/// Build the http-only session cookie carrying a freshly issued token.
///
/// `HttpOnly` keeps the token out of page scripts; `SameSite=Lax` limits
/// cross-site sends; `Max-Age` matches the token expiry.
#[must_use]
pub fn session_cookie(name: &str, token: &str, max_age_secs: i64, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!("{name}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}{secure_attr}")
}

/// Build the expired cookie that instructs the client to discard its session
#[must_use]
pub fn clear_session_cookie(name: &str, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!("{name}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0{secure_attr}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdminRole;

    fn test_admin() -> AdminIdentity {
        AdminIdentity::new(
            "Test Admin".into(),
            "admin@example.com".into(),
            "$2b$04$hash".into(),
            None,
            AdminRole::Admin,
        )
    }

    fn manager_with(secret: &[u8]) -> AuthManager {
        AuthManager::new(secret.to_vec(), Duration::hours(24), Duration::days(30))
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let manager = manager_with(b"test-secret-test-secret-test-secret!");
        let admin = test_admin();

        let issued = manager.issue(&admin, false).unwrap();
        let claims = manager.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, admin.id.to_string());
        assert_eq!(claims.email, admin.email);
        assert_eq!(claims.role, AdminRole::Admin);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_long_lived_token_outlives_default() {
        let manager = manager_with(b"test-secret-test-secret-test-secret!");
        let admin = test_admin();

        let short = manager.issue(&admin, false).unwrap();
        let long = manager.issue(&admin, true).unwrap();
        assert!(long.expires_at > short.expires_at);
        assert!(long.max_age_secs > short.max_age_secs);
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let manager = manager_with(b"test-secret-test-secret-test-secret!");
        let issued = manager.issue(&test_admin(), false).unwrap();

        // Corrupt the payload segment
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let tampered_payload = format!("{}AA", parts[1]);
        parts[1] = &tampered_payload;
        let tampered = parts.join(".");

        assert!(matches!(
            manager.verify(&tampered),
            Err(AuthError::InvalidOrExpiredToken(TokenScope::Session))
        ));
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let issuer = manager_with(b"secret-a-secret-a-secret-a-secret-a!");
        let verifier = manager_with(b"secret-b-secret-b-secret-b-secret-b!");
        let issued = issuer.issue(&test_admin(), false).unwrap();
        assert!(verifier.verify(&issued.token).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let manager = manager_with(b"test-secret-test-secret-test-secret!");
        for junk in ["", "not.a.jwt", "a.b", "ey.ey.ey"] {
            assert!(manager.verify(junk).is_err(), "accepted {junk:?}");
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("gw_session", "tok", 86400, true);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Secure"));

        let cleared = clear_session_cookie("gw_session", false);
        assert!(cleared.contains("Max-Age=0"));
        assert!(!cleared.contains("Secure"));
    }
}
