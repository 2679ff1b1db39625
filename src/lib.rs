// ABOUTME: Main library entry point for the Gatewarden credential core
// ABOUTME: Provides authentication, two-factor challenges, password reset, and phone PII protection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

#![deny(unsafe_code)]

//! # Gatewarden
//!
//! Credential and PII-protection core for admin portals. The crate owns the
//! security-critical state of an admin backend and nothing else:
//!
//! - **Credential store**: admin identities with bcrypt password credentials
//!   and phone numbers held only as `(ciphertext, lookup hash, last4)`.
//! - **Session tokens**: signed, self-contained, stateless bearer tokens.
//! - **Two-factor challenges**: short-lived single-use OTP codes bound to an
//!   admin and a purpose.
//! - **Password reset**: single-use high-entropy reset tokens redeemed
//!   atomically with the credential change.
//!
//! Business forms, rate limiting, and message transport are external
//! collaborators reached through narrow interfaces ([`delivery`],
//! [`database`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gatewarden::config::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     config.validate()?;
//!     println!("Gatewarden configured for port {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Session token issuance and verification
pub mod auth;

/// Environment-based configuration management
pub mod config;

/// Cryptographic primitives for phone PII protection
pub mod crypto;

/// SQLite-backed persistent store for credential entities
pub mod database;

/// Outbound delivery channel capability (email, SMS)
pub mod delivery;

/// Unified error taxonomy with HTTP response mapping
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Core data model: identities, challenges, reset tokens, roles
pub mod models;

/// One-time-password challenge engine
pub mod otp;

/// Password reset flow
pub mod reset;

/// Shared server dependencies wired at startup
pub mod resources;

/// HTTP routes and the authentication orchestrator
pub mod routes;

/// Credential store service over the database capability
pub mod store;
