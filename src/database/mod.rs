// ABOUTME: SQLite-backed persistent store for the credential core
// ABOUTME: Owns the connection pool, schema migrations, and the atomicity guarantees
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Database Management
//!
//! The storage capability behind the credential core. It is injected into
//! each service constructor as `Arc<Database>`; there is no global
//! connection singleton.
//!
//! The guarantees the services lean on live here:
//! - uniqueness of `email` and `phone_hash` is enforced by `UNIQUE`
//!   constraints, not by check-then-insert;
//! - OTP re-issuance is an invalidate-plus-insert transaction;
//! - reset-token redemption is a conditional update that can succeed at most
//!   once, committed together with the password change.

mod admins;
mod otp;
mod reset_tokens;

use sqlx::{Pool, Sqlite, SqlitePool};

use crate::errors::AuthResult;

/// Database manager for credential entities
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn new(database_url: &str) -> AuthResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains(":memory:")
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_string()
        };

        let pool = SqlitePool::connect(&connection_options).await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the pool for advanced operations
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run schema migrations
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails.
    pub async fn migrate(&self) -> AuthResult<()> {
        self.migrate_admins().await?;
        self.migrate_reset_tokens().await?;
        self.migrate_otp().await?;
        Ok(())
    }
}
