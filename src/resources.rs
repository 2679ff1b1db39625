// ABOUTME: Shared server dependencies wired once at startup
// ABOUTME: Builds the codec, token manager, and services from validated configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! Dependency wiring.
//!
//! Every component receives its collaborators through its constructor; the
//! only place that knows how to assemble them is here. Secrets behave per
//! the deployment rules: production refuses to start without them,
//! development generates process-local values and says so loudly.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use tracing::warn;

use crate::auth::{generate_jwt_secret, AuthManager};
use crate::config::ServerConfig;
use crate::crypto::PhoneCodec;
use crate::database::Database;
use crate::delivery::DeliveryChannel;
use crate::otp::OtpEngine;
use crate::reset::ResetFlow;
use crate::store::CredentialStore;

/// Shared dependencies handed to route handlers
pub struct ServerResources {
    pub config: ServerConfig,
    pub database: Arc<Database>,
    pub store: Arc<CredentialStore>,
    pub auth_manager: Arc<AuthManager>,
    pub otp: Arc<OtpEngine>,
    pub reset: Arc<ResetFlow>,
    pub email: Arc<dyn DeliveryChannel>,
    pub sms: Arc<dyn DeliveryChannel>,
}

impl ServerResources {
    /// Wire all services from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error in production when the phone encryption key or JWT
    /// secret is missing or malformed.
    pub fn new(
        config: ServerConfig,
        database: Arc<Database>,
        email: Arc<dyn DeliveryChannel>,
        sms: Arc<dyn DeliveryChannel>,
    ) -> Result<Self> {
        let codec = match &config.phone.encryption_key {
            Some(encoded) => Arc::new(
                PhoneCodec::from_base64(encoded)
                    .context("PHONE_ENCRYPTION_KEY is not a valid base64 256-bit key")?,
            ),
            None => {
                if config.environment.is_production() {
                    bail!("PHONE_ENCRYPTION_KEY must be set in production");
                }
                let codec = PhoneCodec::generate();
                warn!(
                    "PHONE_ENCRYPTION_KEY not set; generated a process-local key. \
                     Phone data encrypted now is unrecoverable after restart."
                );
                warn!(
                    "Generated key (save for later runs): PHONE_ENCRYPTION_KEY={}",
                    codec.key_base64()
                );
                Arc::new(codec)
            }
        };

        let jwt_secret = match &config.auth.jwt_secret {
            Some(secret) => secret.clone().into_bytes(),
            None => {
                if config.environment.is_production() {
                    bail!("JWT_SECRET must be set in production");
                }
                warn!("JWT_SECRET not set; sessions will not survive a restart");
                generate_jwt_secret()
            }
        };

        let auth_manager = Arc::new(AuthManager::new(
            jwt_secret,
            Duration::hours(config.auth.session_expiry_hours),
            Duration::days(config.auth.long_session_expiry_days),
        ));

        let store = Arc::new(CredentialStore::new(
            Arc::clone(&database),
            codec,
            config.auth.bcrypt_cost,
        ));

        let otp = Arc::new(OtpEngine::new(Arc::clone(&database)));

        let reset = Arc::new(ResetFlow::new(
            Arc::clone(&database),
            Arc::clone(&store),
            config.reset.token_expiry_minutes,
        ));

        Ok(Self {
            config,
            database,
            store,
            auth_manager,
            otp,
            reset,
            email,
            sms,
        })
    }
}
