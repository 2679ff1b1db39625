// ABOUTME: Password reset token database operations
// ABOUTME: Exactly-once redemption committed atomically with the credential change
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

use super::Database;
use crate::errors::{AuthError, AuthResult, TokenScope};
use crate::models::PasswordResetToken;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the password reset tokens table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails.
    pub(super) async fn migrate_reset_tokens(&self) -> AuthResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS password_reset_tokens (
                id TEXT PRIMARY KEY,
                admin_id TEXT NOT NULL REFERENCES admins(id) ON DELETE CASCADE,
                token TEXT NOT NULL UNIQUE,
                expires_at DATETIME NOT NULL,
                used BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reset_tokens_admin ON password_reset_tokens(admin_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a freshly issued reset token
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()> {
        sqlx::query(
            r"
            INSERT INTO password_reset_tokens (id, admin_id, token, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(token.id.to_string())
        .bind(token.admin_id.to_string())
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Look up an unused reset token by exact value
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_unused_reset_token(
        &self,
        token: &str,
    ) -> AuthResult<Option<PasswordResetToken>> {
        let row = sqlx::query(
            r"
            SELECT id, admin_id, token, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = $1 AND used = 0
            ",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_reset_token(&row)).transpose()
    }

    /// Redeem a reset token and replace the owning admin's password, as one
    /// transaction.
    ///
    /// The conditional `used` update makes redemption exactly-once: of any
    /// set of concurrent attempts with the same token, one commits and the
    /// rest fail with the collapsed token error. An expired token is rejected
    /// without side effects. Returns the owning admin's ID on success.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidOrExpiredToken`] with [`TokenScope::Reset`]
    /// for an unknown, already-used, concurrently-redeemed, or expired token,
    /// or a database error otherwise.
    pub async fn redeem_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r"
            SELECT id, admin_id, token, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = $1 AND used = 0
            ",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(AuthError::InvalidOrExpiredToken(TokenScope::Reset));
        };
        let record = Self::row_to_reset_token(&row)?;

        if record.is_expired(now) {
            return Err(AuthError::InvalidOrExpiredToken(TokenScope::Reset));
        }

        let consumed = sqlx::query(
            "UPDATE password_reset_tokens SET used = 1 WHERE id = $1 AND used = 0",
        )
        .bind(record.id.to_string())
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() != 1 {
            return Err(AuthError::InvalidOrExpiredToken(TokenScope::Reset));
        }

        sqlx::query("UPDATE admins SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(new_password_hash)
            .bind(now)
            .bind(record.admin_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record.admin_id)
    }

    /// Remove reset tokens past their expiry
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn row_to_reset_token(row: &sqlx::sqlite::SqliteRow) -> AuthResult<PasswordResetToken> {
        let id: String = row.get("id");
        let admin_id: String = row.get("admin_id");

        Ok(PasswordResetToken {
            id: Uuid::parse_str(&id)
                .map_err(|e| AuthError::internal(format!("corrupt reset token id: {e}")))?,
            admin_id: Uuid::parse_str(&admin_id)
                .map_err(|e| AuthError::internal(format!("corrupt reset token admin id: {e}")))?,
            token: row.get("token"),
            expires_at: row.get("expires_at"),
            used: row.get("used"),
            created_at: row.get("created_at"),
        })
    }
}
