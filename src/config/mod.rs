// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, typed sub-configs, and production validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! Environment-based configuration management.
//!
//! Every knob is an environment variable with a development-friendly default.
//! [`ServerConfig::validate`] enforces the production rules: a missing phone
//! encryption key or JWT secret is a startup failure, never a silent
//! degradation to a process-local random key.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Environment type for security-sensitive behavior switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database file
    Sqlite { path: String },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from a `sqlite:` URL or bare file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path = s.strip_prefix("sqlite:").unwrap_or(s);
        if path == ":memory:" {
            Self::Memory
        } else {
            Self::Sqlite { path: path.into() }
        }
    }

    /// Convert to a sqlx connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::Sqlite { path } => format!("sqlite:{path}"),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::Sqlite {
            path: "./data/gatewarden.db".into(),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Database location
    pub database_url: DatabaseUrl,
    /// Session token settings
    pub auth: AuthConfig,
    /// Phone PII settings
    pub phone: PhoneConfig,
    /// Password reset settings
    pub reset: ResetConfig,
    /// Outbound delivery settings
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret; required in production
    pub jwt_secret: Option<String>,
    /// Default session lifetime in hours
    pub session_expiry_hours: i64,
    /// Long-lived ("remember me") session lifetime in days
    pub long_session_expiry_days: i64,
    /// Name of the http-only session cookie
    pub cookie_name: String,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
    /// bcrypt work factor for password hashing
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct PhoneConfig {
    /// Base64-encoded 256-bit AES key; required in production
    pub encryption_key: Option<String>,
    /// OTP challenge lifetime in minutes
    pub otp_expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ResetConfig {
    /// Reset token lifetime in minutes
    pub token_expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub email: EmailConfig,
    pub sms: SmsConfig,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// HTTP mail relay endpoint; unset means log-only mode
    pub api_url: Option<String>,
    /// Bearer token for the relay
    pub api_token: Option<String>,
    /// From address placed on outbound mail
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub enabled: bool,
    /// SMS gateway messages endpoint; unset means log-only mode
    pub api_url: Option<String>,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.into())
}

fn env_var_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("Invalid {name} value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse. Missing variables
    /// fall back to development defaults; [`Self::validate`] decides whether
    /// those defaults are acceptable for the deployment environment.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present; absence is fine
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: env_parse("HTTP_PORT", 8081)?,
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            database_url: DatabaseUrl::parse_url(&env_var_or(
                "DATABASE_URL",
                "sqlite:./data/gatewarden.db",
            )),
            auth: AuthConfig {
                jwt_secret: env_var_opt("JWT_SECRET"),
                session_expiry_hours: env_parse("JWT_EXPIRY_HOURS", 24)?,
                long_session_expiry_days: env_parse("JWT_REMEMBER_EXPIRY_DAYS", 30)?,
                cookie_name: env_var_or("JWT_COOKIE_NAME", "gw_session"),
                cookie_secure: env_parse("COOKIE_SECURE", false)?,
                bcrypt_cost: env_parse("BCRYPT_COST", 12)?,
            },
            phone: PhoneConfig {
                encryption_key: env_var_opt("PHONE_ENCRYPTION_KEY"),
                otp_expiry_minutes: env_parse("PHONE_OTP_EXPIRY_MINUTES", 10)?,
            },
            reset: ResetConfig {
                token_expiry_minutes: env_parse("PASSWORD_RESET_EXPIRY_MINUTES", 30)?,
            },
            delivery: DeliveryConfig {
                email: EmailConfig {
                    api_url: env_var_opt("EMAIL_API_URL"),
                    api_token: env_var_opt("EMAIL_API_TOKEN"),
                    from: env_var_or("EMAIL_FROM", "Gatewarden <noreply@localhost>"),
                },
                sms: SmsConfig {
                    enabled: env_parse("SMS_ENABLED", false)?,
                    api_url: env_var_opt("SMS_API_URL"),
                    account_sid: env_var_opt("SMS_ACCOUNT_SID"),
                    auth_token: env_var_opt("SMS_AUTH_TOKEN"),
                    from_number: env_var_opt("SMS_FROM_NUMBER"),
                },
            },
        })
    }

    /// Enforce deployment rules.
    ///
    /// In production a missing `PHONE_ENCRYPTION_KEY` or `JWT_SECRET` aborts
    /// startup: a generated key would make previously encrypted phone data
    /// unrecoverable after a restart and silently invalidate all sessions.
    ///
    /// # Errors
    ///
    /// Returns an error describing every production rule the current
    /// environment violates.
    pub fn validate(&self) -> Result<()> {
        if !self.environment.is_production() {
            if self.phone.encryption_key.is_none() {
                warn!(
                    "PHONE_ENCRYPTION_KEY not set; a process-local key will be generated. \
                     Encrypted phone data will NOT be recoverable after restart."
                );
            }
            if self.auth.jwt_secret.is_none() {
                warn!("JWT_SECRET not set; sessions will not survive a restart.");
            }
            return Ok(());
        }

        if self.phone.encryption_key.is_none() {
            bail!("PHONE_ENCRYPTION_KEY must be set in production (base64, 32 bytes decoded)");
        }
        if self.auth.jwt_secret.as_ref().map_or(true, |s| s.len() < 32) {
            bail!("JWT_SECRET must be set in production and at least 32 characters long");
        }
        if !self.auth.cookie_secure {
            bail!("COOKIE_SECURE must be true in production");
        }
        if self.auth.long_session_expiry_days * 24 <= self.auth.session_expiry_hours {
            bail!("JWT_REMEMBER_EXPIRY_DAYS must be meaningfully longer than JWT_EXPIRY_HOURS");
        }
        Ok(())
    }

    /// One-line summary safe to log (no secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "env={} port={} db={} otp_ttl={}m reset_ttl={}m sms={}",
            self.environment,
            self.http_port,
            self.database_url.to_connection_string(),
            self.phone.otp_expiry_minutes,
            self.reset.token_expiry_minutes,
            self.delivery.sms.enabled,
        )
    }
}
