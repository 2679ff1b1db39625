// ABOUTME: Admin identity database operations
// ABOUTME: Handles registration inserts, hash-based lookups, and credential updates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

use super::Database;
use crate::crypto::PhoneArtifacts;
use crate::errors::{AuthError, AuthResult};
use crate::models::{AdminIdentity, AdminRole};
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the admins table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails.
    pub(super) async fn migrate_admins(&self) -> AuthResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS admins (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone_encrypted TEXT,
                phone_hash TEXT UNIQUE,
                phone_last4 TEXT,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'admin' CHECK (role IN ('super_admin', 'admin', 'viewer')),
                two_factor_enabled BOOLEAN NOT NULL DEFAULT 0,
                phone_verified BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                last_login_at DATETIME
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_admins_email ON admins(email)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_admins_phone_hash ON admins(phone_hash)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new admin identity.
    ///
    /// The `UNIQUE` constraints on `email` and `phone_hash` are the
    /// authoritative guard against concurrent duplicate registrations; a
    /// violation maps to the matching duplicate error and leaves no partial
    /// record behind.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateEmail`] or [`AuthError::DuplicatePhone`]
    /// on a uniqueness conflict, or a database error otherwise.
    pub async fn create_admin(&self, admin: &AdminIdentity) -> AuthResult<Uuid> {
        let (phone_encrypted, phone_hash, phone_last4) = admin
            .phone
            .as_ref()
            .map_or((None, None, None), |p| {
                (
                    Some(&p.ciphertext),
                    Some(&p.lookup_hash),
                    Some(&p.last4),
                )
            });

        let result = sqlx::query(
            r"
            INSERT INTO admins (
                id, full_name, email, phone_encrypted, phone_hash, phone_last4,
                password_hash, role, two_factor_enabled, phone_verified,
                created_at, updated_at, last_login_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(admin.id.to_string())
        .bind(&admin.full_name)
        .bind(&admin.email)
        .bind(phone_encrypted)
        .bind(phone_hash)
        .bind(phone_last4)
        .bind(&admin.password_hash)
        .bind(admin.role.as_str())
        .bind(admin.two_factor_enabled)
        .bind(admin.phone_verified)
        .bind(admin.created_at)
        .bind(admin.updated_at)
        .bind(admin.last_login_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(admin.id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                if db_err.message().contains("admins.phone_hash") {
                    Err(AuthError::DuplicatePhone)
                } else {
                    Err(AuthError::DuplicateEmail)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get an admin by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_admin(&self, admin_id: Uuid) -> AuthResult<Option<AdminIdentity>> {
        self.get_admin_impl("id", &admin_id.to_string()).await
    }

    /// Get an admin by email (exact, case-sensitive as stored)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_admin_by_email(&self, email: &str) -> AuthResult<Option<AdminIdentity>> {
        self.get_admin_impl("email", email).await
    }

    /// Get an admin by phone lookup hash.
    ///
    /// Lookups never scan and decrypt rows; equality on the deterministic
    /// hash is the only search path for phones.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_admin_by_phone_hash(
        &self,
        phone_hash: &str,
    ) -> AuthResult<Option<AdminIdentity>> {
        self.get_admin_impl("phone_hash", phone_hash).await
    }

    async fn get_admin_impl(&self, field: &str, value: &str) -> AuthResult<Option<AdminIdentity>> {
        let query = format!(
            r"
            SELECT id, full_name, email, phone_encrypted, phone_hash, phone_last4,
                   password_hash, role, two_factor_enabled, phone_verified,
                   created_at, updated_at, last_login_at
            FROM admins WHERE {field} = $1
            "
        );

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::row_to_admin(&row)).transpose()
    }

    fn row_to_admin(row: &sqlx::sqlite::SqliteRow) -> AuthResult<AdminIdentity> {
        let id: String = row.get("id");
        let role: String = row.get("role");

        let phone = match (
            row.get::<Option<String>, _>("phone_encrypted"),
            row.get::<Option<String>, _>("phone_hash"),
            row.get::<Option<String>, _>("phone_last4"),
        ) {
            (Some(ciphertext), Some(lookup_hash), Some(last4)) => Some(PhoneArtifacts {
                ciphertext,
                lookup_hash,
                last4,
            }),
            _ => None,
        };

        Ok(AdminIdentity {
            id: Uuid::parse_str(&id)
                .map_err(|e| AuthError::internal(format!("corrupt admin id: {e}")))?,
            full_name: row.get("full_name"),
            email: row.get("email"),
            phone,
            password_hash: row.get("password_hash"),
            role: role
                .parse()
                .map_err(|e| AuthError::internal(format!("corrupt admin role: {e}")))?,
            two_factor_enabled: row.get("two_factor_enabled"),
            phone_verified: row.get("phone_verified"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            last_login_at: row.get("last_login_at"),
        })
    }

    /// Replace an admin's password credential
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn update_admin_password(
        &self,
        admin_id: Uuid,
        password_hash: &str,
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE admins SET password_hash = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(admin_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a successful login
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn touch_last_login(&self, admin_id: Uuid) -> AuthResult<()> {
        sqlx::query("UPDATE admins SET last_login_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(admin_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Toggle the two-factor flag
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn set_two_factor(&self, admin_id: Uuid, enabled: bool) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE admins SET two_factor_enabled = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(enabled)
        .bind(Utc::now())
        .bind(admin_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the registered phone as verified (or not)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn set_phone_verified(&self, admin_id: Uuid, verified: bool) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE admins SET phone_verified = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(verified)
        .bind(Utc::now())
        .bind(admin_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Change an admin's role
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn update_admin_role(&self, admin_id: Uuid, role: AdminRole) -> AuthResult<bool> {
        let result = sqlx::query("UPDATE admins SET role = $1, updated_at = $2 WHERE id = $3")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(admin_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
