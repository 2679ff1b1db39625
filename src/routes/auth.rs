// ABOUTME: Authentication orchestrator and its HTTP route handlers
// ABOUTME: Sequences store, OTP, reset, and token services into the login/register/reset use cases
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Authentication Orchestrator
//!
//! [`AuthService`] owns no state of its own; it sequences the credential
//! store, OTP engine, reset flow, and session token service, and translates
//! internal outcomes into the external error taxonomy. The axum handlers
//! below are thin wrappers around it.
//!
//! Delivery of codes and reset instructions is fire-and-forget with respect
//! to the authentication outcome: a two-factor challenge counts as issued
//! once persisted, and a failed send is logged, never silently dropped.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::IssuedToken;
use crate::crypto::phone_format;
use crate::delivery::{DeliveryChannel, Message};
use crate::errors::{AuthError, AuthResult, TokenScope};
use crate::models::{AdminIdentity, AdminProfile, AdminRole, OtpPurpose};
use crate::resources::ServerResources;
use crate::store::NewAdmin;

/// Admin registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Option<AdminRole>,
}

/// Login request; identifier is an email address or phone number
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    pub remember_me: Option<bool>,
}

/// Two-factor verification request
#[derive(Debug, Deserialize)]
pub struct VerifyTwoFactorRequest {
    pub challenge_id: Uuid,
    pub code: String,
    pub remember_me: Option<bool>,
}

/// Password reset request
#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    pub identifier: String,
}

/// Password reset redemption
#[derive(Debug, Deserialize)]
pub struct ResetRedeemBody {
    pub token: String,
    pub new_password: String,
}

/// Phone verification confirmation
#[derive(Debug, Deserialize)]
pub struct ConfirmPhoneRequest {
    pub code: String,
}

/// Two-factor toggle
#[derive(Debug, Deserialize)]
pub struct TwoFactorToggleRequest {
    pub enabled: bool,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: AdminRole,
}

/// Successful login / registration payload
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub admin: AdminProfile,
}

/// Two-factor step-up payload; carries no session token
#[derive(Debug, Serialize)]
pub struct TwoFactorRequiredResponse {
    pub success: bool,
    pub requires_two_factor: bool,
    pub challenge_id: Uuid,
    /// Masked destination hint, e.g. `******3210`
    pub message: String,
    /// Seconds until the challenge expires
    pub expires_in: i64,
}

/// Phone-verification challenge payload
#[derive(Debug, Serialize)]
pub struct ChallengeStartedResponse {
    pub success: bool,
    pub challenge_id: Uuid,
    /// Masked destination hint, e.g. `******3210`
    pub message: String,
    /// Seconds until the challenge expires
    pub expires_in: i64,
}

/// Generic success envelope
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Current identity payload
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub admin: AdminProfile,
}

/// A signed session plus the identity it was issued for
#[derive(Debug)]
pub struct SessionBundle {
    pub issued: IssuedToken,
    pub admin: AdminIdentity,
}

/// Outcome of a password login attempt
#[derive(Debug)]
pub enum LoginOutcome {
    Session(SessionBundle),
    TwoFactorRequired {
        challenge_id: Uuid,
        message: String,
        expires_in: i64,
    },
}

/// Authentication orchestrator
#[derive(Clone)]
pub struct AuthService {
    resources: Arc<ServerResources>,
}

impl AuthService {
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Register a new admin and issue an initial session.
    ///
    /// # Errors
    ///
    /// Returns `Validation` or a duplicate error from the store.
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<SessionBundle> {
        let admin = self
            .resources
            .store
            .register(NewAdmin {
                full_name: request.full_name,
                email: request.email,
                phone: request.phone,
                password: request.password,
                role: request.role,
            })
            .await?;

        let issued = self.resources.auth_manager.issue(&admin, false)?;
        Ok(SessionBundle { issued, admin })
    }

    /// Password login. With two-factor enabled a correct password yields a
    /// challenge, not a session; the session is issued only after
    /// [`Self::verify_two_factor`] succeeds.
    ///
    /// # Errors
    ///
    /// Unknown identifier and wrong password both return the single
    /// `InvalidCredentials` kind.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginOutcome> {
        let admin = self
            .resources
            .store
            .find_by_identifier(&request.identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password_ok = self
            .resources
            .store
            .verify_password(&admin, &request.password)
            .await?;
        if !password_ok {
            tracing::warn!(admin_id = %admin.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if admin.two_factor_enabled {
            return self.begin_two_factor(admin).await;
        }

        self.resources.store.touch_last_login(admin.id).await?;
        let issued = self
            .resources
            .auth_manager
            .issue(&admin, request.remember_me.unwrap_or(false))?;

        tracing::info!(admin_id = %admin.id, "login successful");
        Ok(LoginOutcome::Session(SessionBundle { issued, admin }))
    }

    async fn begin_two_factor(&self, admin: AdminIdentity) -> AuthResult<LoginOutcome> {
        let phone = self
            .resources
            .store
            .phone_plaintext(&admin)?
            .ok_or_else(|| {
                AuthError::Validation(
                    "Two-factor authentication enabled but phone number missing".into(),
                )
            })?;

        let ttl_minutes = self.resources.config.phone.otp_expiry_minutes;
        let issued = self
            .resources
            .otp
            .issue(admin.id, &phone, OtpPurpose::TwoFactorLogin, ttl_minutes)
            .await?;

        let message = format!(
            "Enter the verification code sent to {}.",
            phone_format::mask(&phone)
        );
        let challenge_id = issued.challenge_id;

        self.deliver_code(&admin, phone, issued.code, ttl_minutes, "Login Verification Code");

        Ok(LoginOutcome::TwoFactorRequired {
            challenge_id,
            message,
            expires_in: ttl_minutes * 60,
        })
    }

    /// Verify a two-factor challenge and issue the withheld session.
    ///
    /// # Errors
    ///
    /// Any unknown, expired, consumed, or mismatched challenge collapses
    /// into `InvalidOrExpiredToken` for the OTP scope.
    pub async fn verify_two_factor(
        &self,
        request: VerifyTwoFactorRequest,
    ) -> AuthResult<SessionBundle> {
        let challenge = self
            .resources
            .database
            .get_challenge(request.challenge_id)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken(TokenScope::Otp))?;

        if challenge.purpose != OtpPurpose::TwoFactorLogin {
            return Err(AuthError::InvalidOrExpiredToken(TokenScope::Otp));
        }

        let admin = self
            .resources
            .store
            .find_by_id(challenge.admin_id)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken(TokenScope::Otp))?;

        let phone = self
            .resources
            .store
            .phone_plaintext(&admin)?
            .ok_or(AuthError::InvalidOrExpiredToken(TokenScope::Otp))?;

        let verified = self
            .resources
            .otp
            .verify(admin.id, &phone, OtpPurpose::TwoFactorLogin, &request.code)
            .await?;
        if !verified {
            return Err(AuthError::InvalidOrExpiredToken(TokenScope::Otp));
        }

        self.resources.store.touch_last_login(admin.id).await?;
        let issued = self
            .resources
            .auth_manager
            .issue(&admin, request.remember_me.unwrap_or(false))?;

        tracing::info!(admin_id = %admin.id, "two-factor login successful");
        Ok(SessionBundle { issued, admin })
    }

    /// Handle a password reset request; the visible outcome is identical
    /// whether or not an account exists.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure.
    pub async fn request_password_reset(&self, identifier: &str) -> AuthResult<()> {
        if let Some((admin, token)) = self.resources.reset.request(identifier).await? {
            let ttl = self.resources.config.reset.token_expiry_minutes;
            let email = Arc::clone(&self.resources.email);
            let destination = admin.email.clone();
            let body = format!(
                "A password reset was requested for your account. \
                 Use this token to set a new password: {token}\n\
                 It expires in {ttl} minutes. If you did not request this, ignore this message."
            );
            tokio::spawn(async move {
                let outcome = email
                    .send(
                        &destination,
                        &Message {
                            subject: "Password Reset Request".into(),
                            body,
                        },
                    )
                    .await;
                if !outcome.success {
                    tracing::error!(
                        error = outcome.error.as_deref().unwrap_or("unknown"),
                        "password reset delivery failed"
                    );
                }
            });
        }
        Ok(())
    }

    /// Redeem a reset token.
    ///
    /// # Errors
    ///
    /// Returns `Validation` or the collapsed reset-token error.
    pub async fn redeem_password_reset(&self, token: &str, new_password: &str) -> AuthResult<()> {
        self.resources.reset.redeem(token, new_password).await?;
        Ok(())
    }

    /// Issue a phone-verification challenge for the authenticated admin.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when no phone number is on record.
    pub async fn start_phone_verification(
        &self,
        admin: &AdminIdentity,
    ) -> AuthResult<LoginOutcome> {
        let phone = self
            .resources
            .store
            .phone_plaintext(admin)?
            .ok_or_else(|| AuthError::Validation("No phone number on record".into()))?;

        let ttl_minutes = self.resources.config.phone.otp_expiry_minutes;
        let issued = self
            .resources
            .otp
            .issue(admin.id, &phone, OtpPurpose::PhoneVerification, ttl_minutes)
            .await?;

        let message = format!(
            "Enter the verification code sent to {}.",
            phone_format::mask(&phone)
        );
        let challenge_id = issued.challenge_id;

        self.deliver_code(
            admin,
            phone,
            issued.code,
            ttl_minutes,
            "Phone Verification Code",
        );

        Ok(LoginOutcome::TwoFactorRequired {
            challenge_id,
            message,
            expires_in: ttl_minutes * 60,
        })
    }

    /// Confirm a phone-verification challenge and mark the phone verified.
    ///
    /// # Errors
    ///
    /// Returns the collapsed OTP error for any failed verification.
    pub async fn confirm_phone_verification(
        &self,
        admin: &AdminIdentity,
        code: &str,
    ) -> AuthResult<()> {
        let phone = self
            .resources
            .store
            .phone_plaintext(admin)?
            .ok_or_else(|| AuthError::Validation("No phone number on record".into()))?;

        let verified = self
            .resources
            .otp
            .verify(admin.id, &phone, OtpPurpose::PhoneVerification, code)
            .await?;
        if !verified {
            return Err(AuthError::InvalidOrExpiredToken(TokenScope::Otp));
        }

        self.resources.store.set_phone_verified(admin.id, true).await
    }

    /// Enable or disable two-factor login for the authenticated admin.
    ///
    /// # Errors
    ///
    /// Enabling requires a verified phone number.
    pub async fn set_two_factor(&self, admin: &AdminIdentity, enabled: bool) -> AuthResult<()> {
        if enabled && !admin.phone_verified {
            return Err(AuthError::Validation(
                "Phone number must be verified before enabling two-factor authentication".into(),
            ));
        }
        self.resources.store.set_two_factor(admin.id, enabled).await
    }

    /// Change another admin's role; requires the super-admin capability.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for insufficient role, `Validation` for an
    /// unknown target.
    pub async fn update_role(
        &self,
        acting: &AdminIdentity,
        target_id: Uuid,
        role: AdminRole,
    ) -> AuthResult<()> {
        acting.role.authorize(AdminRole::SuperAdmin)?;

        self.resources
            .store
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| AuthError::Validation("Unknown admin".into()))?;

        self.resources.store.update_role(target_id, role).await?;
        tracing::info!(acting = %acting.id, target = %target_id, role = role.as_str(), "role updated");
        Ok(())
    }

    /// Resolve the authenticated admin from a bearer header or the session
    /// cookie.
    ///
    /// # Errors
    ///
    /// A missing token, a malformed or tampered token, and an expired token
    /// all collapse into the same session token error; `Unauthorized` is
    /// returned only when a valid token refers to an identity that no
    /// longer exists.
    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthResult<AdminIdentity> {
        let token = bearer_token(headers)
            .or_else(|| cookie_value(headers, &self.resources.config.auth.cookie_name))
            .ok_or(AuthError::InvalidOrExpiredToken(TokenScope::Session))?;

        let claims = self.resources.auth_manager.verify(&token)?;
        let admin_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidOrExpiredToken(TokenScope::Session))?;

        self.resources
            .store
            .find_by_id(admin_id)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    /// Fire-and-forget delivery of a verification code over SMS and email.
    /// The challenge is considered issued once persisted; failures here are
    /// logged, never surfaced.
    fn deliver_code(
        &self,
        admin: &AdminIdentity,
        phone: String,
        code: String,
        ttl_minutes: i64,
        subject: &str,
    ) {
        let sms = Arc::clone(&self.resources.sms);
        let email = Arc::clone(&self.resources.email);
        let email_destination = admin.email.clone();
        let subject = subject.to_owned();
        let body = format!(
            "Your verification code is {code}. It expires in {ttl_minutes} minutes. \
             Do not share this code."
        );

        tokio::spawn(async move {
            let sms_outcome = sms
                .send(
                    &phone,
                    &Message {
                        subject: String::new(),
                        body: body.clone(),
                    },
                )
                .await;
            if !sms_outcome.success {
                tracing::error!(
                    error = sms_outcome.error.as_deref().unwrap_or("unknown"),
                    "verification code SMS delivery failed"
                );
            }

            let email_outcome = email
                .send(&email_destination, &Message { subject, body })
                .await;
            if !email_outcome.success {
                tracing::error!(
                    error = email_outcome.error.as_deref().unwrap_or("unknown"),
                    "verification code email delivery failed"
                );
            }
        });
    }
}

/// Extract a bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
}

/// Extract a named cookie value from the Cookie header
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())?
        .split(';')
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
        .next()
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/register", post(Self::handle_register))
            .route("/auth/login", post(Self::handle_login))
            .route("/auth/two-factor/verify", post(Self::handle_verify_two_factor))
            .route("/auth/two-factor", put(Self::handle_two_factor_toggle))
            .route("/auth/logout", post(Self::handle_logout))
            .route("/auth/me", get(Self::handle_me))
            .route("/auth/password/request-reset", post(Self::handle_request_reset))
            .route("/auth/password/reset", post(Self::handle_redeem_reset))
            .route(
                "/auth/phone/request-verification",
                post(Self::handle_start_phone_verification),
            )
            .route("/auth/phone/verify", post(Self::handle_confirm_phone_verification))
            .route("/auth/admins/:admin_id/role", put(Self::handle_update_role))
            .with_state(resources)
    }

    /// Token in payload plus the matching http-only session cookie
    fn session_response(resources: &ServerResources, bundle: &SessionBundle) -> Response {
        let cookie = crate::auth::session_cookie(
            &resources.config.auth.cookie_name,
            &bundle.issued.token,
            bundle.issued.max_age_secs,
            resources.config.auth.cookie_secure,
        );
        let body = SessionResponse {
            success: true,
            token: bundle.issued.token.clone(),
            admin: bundle.admin.profile(),
        };
        (
            StatusCode::OK,
            [(header::SET_COOKIE, cookie)],
            Json(body),
        )
            .into_response()
    }

    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RegisterRequest>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        let bundle = service.register(request).await?;
        Ok(Self::session_response(&resources, &bundle))
    }

    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<LoginRequest>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        match service.login(request).await? {
            LoginOutcome::Session(bundle) => Ok(Self::session_response(&resources, &bundle)),
            LoginOutcome::TwoFactorRequired {
                challenge_id,
                message,
                expires_in,
            } => Ok((
                StatusCode::OK,
                Json(TwoFactorRequiredResponse {
                    success: true,
                    requires_two_factor: true,
                    challenge_id,
                    message,
                    expires_in,
                }),
            )
                .into_response()),
        }
    }

    async fn handle_verify_two_factor(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<VerifyTwoFactorRequest>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        let bundle = service.verify_two_factor(request).await?;
        Ok(Self::session_response(&resources, &bundle))
    }

    async fn handle_logout(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        service.authenticate(&headers).await?;

        // Tokens stay valid until natural expiry; logout only instructs the
        // client to discard its copy.
        let cookie = crate::auth::clear_session_cookie(
            &resources.config.auth.cookie_name,
            resources.config.auth.cookie_secure,
        );
        Ok((
            StatusCode::OK,
            [(header::SET_COOKIE, cookie)],
            Json(MessageResponse {
                success: true,
                message: "Logged out successfully".into(),
            }),
        )
            .into_response())
    }

    async fn handle_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        let admin = service.authenticate(&headers).await?;
        Ok((
            StatusCode::OK,
            Json(MeResponse {
                success: true,
                admin: admin.profile(),
            }),
        )
            .into_response())
    }

    async fn handle_request_reset(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ResetRequestBody>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        service.request_password_reset(&request.identifier).await?;
        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "If an account exists, password reset instructions have been sent".into(),
            }),
        )
            .into_response())
    }

    async fn handle_redeem_reset(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ResetRedeemBody>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        service
            .redeem_password_reset(&request.token, &request.new_password)
            .await?;
        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Password reset successfully".into(),
            }),
        )
            .into_response())
    }

    async fn handle_start_phone_verification(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        let admin = service.authenticate(&headers).await?;
        match service.start_phone_verification(&admin).await? {
            LoginOutcome::TwoFactorRequired {
                challenge_id,
                message,
                expires_in,
            } => Ok((
                StatusCode::OK,
                Json(ChallengeStartedResponse {
                    success: true,
                    challenge_id,
                    message,
                    expires_in,
                }),
            )
                .into_response()),
            LoginOutcome::Session(_) => Err(AuthError::internal(
                "phone verification produced a session",
            )),
        }
    }

    async fn handle_confirm_phone_verification(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<ConfirmPhoneRequest>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        let admin = service.authenticate(&headers).await?;
        service
            .confirm_phone_verification(&admin, &request.code)
            .await?;
        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Phone number verified".into(),
            }),
        )
            .into_response())
    }

    async fn handle_two_factor_toggle(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<TwoFactorToggleRequest>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        let admin = service.authenticate(&headers).await?;
        service.set_two_factor(&admin, request.enabled).await?;
        let state = if request.enabled { "enabled" } else { "disabled" };
        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: format!("Two-factor authentication {state}"),
            }),
        )
            .into_response())
    }

    async fn handle_update_role(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(admin_id): Path<Uuid>,
        Json(request): Json<UpdateRoleRequest>,
    ) -> Result<Response, AuthError> {
        let service = AuthService::new(Arc::clone(&resources));
        let acting = service.authenticate(&headers).await?;
        service.update_role(&acting, admin_id, request.role).await?;
        Ok((
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Role updated".into(),
            }),
        )
            .into_response())
    }
}
