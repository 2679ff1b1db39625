// ABOUTME: OTP challenge database operations
// ABOUTME: Transactional re-issuance and atomic single-consumption of verification codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

use super::Database;
use crate::errors::{AuthError, AuthResult};
use crate::models::{OtpChallenge, OtpPurpose};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the OTP challenges table
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails.
    pub(super) async fn migrate_otp(&self) -> AuthResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS otp_challenges (
                id TEXT PRIMARY KEY,
                admin_id TEXT NOT NULL REFERENCES admins(id) ON DELETE CASCADE,
                destination_hash TEXT NOT NULL,
                code_hash TEXT NOT NULL,
                purpose TEXT NOT NULL CHECK (purpose IN ('phone_verification', 'two_factor_login')),
                expires_at DATETIME NOT NULL,
                consumed BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_otp_admin_purpose ON otp_challenges(admin_id, purpose)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_otp_destination ON otp_challenges(destination_hash)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Invalidate any unconsumed challenge for `(admin, purpose)` and insert
    /// the replacement, as one transaction.
    ///
    /// At most one live challenge per purpose can exist at any time; a
    /// concurrent `verify` either consumes the old row before the delete
    /// commits or finds only the new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub async fn replace_challenge(&self, challenge: &OtpChallenge) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM otp_challenges WHERE admin_id = $1 AND purpose = $2 AND consumed = 0",
        )
        .bind(challenge.admin_id.to_string())
        .bind(challenge.purpose.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO otp_challenges (
                id, admin_id, destination_hash, code_hash, purpose,
                expires_at, consumed, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(challenge.id.to_string())
        .bind(challenge.admin_id.to_string())
        .bind(&challenge.destination_hash)
        .bind(&challenge.code_hash)
        .bind(challenge.purpose.as_str())
        .bind(challenge.expires_at)
        .bind(challenge.consumed)
        .bind(challenge.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Most recent unconsumed challenge matching admin, destination hash, and
    /// purpose. Expiry is checked by the caller against its own clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn latest_unconsumed_challenge(
        &self,
        admin_id: Uuid,
        destination_hash: &str,
        purpose: OtpPurpose,
    ) -> AuthResult<Option<OtpChallenge>> {
        let row = sqlx::query(
            r"
            SELECT id, admin_id, destination_hash, code_hash, purpose,
                   expires_at, consumed, created_at
            FROM otp_challenges
            WHERE admin_id = $1 AND destination_hash = $2 AND purpose = $3 AND consumed = 0
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(admin_id.to_string())
        .bind(destination_hash)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_challenge(&row)).transpose()
    }

    /// Get a challenge by ID regardless of state
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_challenge(&self, challenge_id: Uuid) -> AuthResult<Option<OtpChallenge>> {
        let row = sqlx::query(
            r"
            SELECT id, admin_id, destination_hash, code_hash, purpose,
                   expires_at, consumed, created_at
            FROM otp_challenges WHERE id = $1
            ",
        )
        .bind(challenge_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_challenge(&row)).transpose()
    }

    /// Mark a challenge consumed, succeeding for exactly one caller.
    ///
    /// The conditional update is the atomicity point: under concurrent
    /// verification attempts only one sees `rows_affected == 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn consume_challenge(&self, challenge_id: Uuid) -> AuthResult<bool> {
        let result =
            sqlx::query("UPDATE otp_challenges SET consumed = 1 WHERE id = $1 AND consumed = 0")
                .bind(challenge_id.to_string())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove challenges past their expiry. Correctness never depends on this
    /// sweep; expiry is enforced at verification time.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn purge_expired_challenges(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn row_to_challenge(row: &sqlx::sqlite::SqliteRow) -> AuthResult<OtpChallenge> {
        let id: String = row.get("id");
        let admin_id: String = row.get("admin_id");
        let purpose: String = row.get("purpose");

        Ok(OtpChallenge {
            id: Uuid::parse_str(&id)
                .map_err(|e| AuthError::internal(format!("corrupt challenge id: {e}")))?,
            admin_id: Uuid::parse_str(&admin_id)
                .map_err(|e| AuthError::internal(format!("corrupt challenge admin id: {e}")))?,
            destination_hash: row.get("destination_hash"),
            code_hash: row.get("code_hash"),
            purpose: purpose
                .parse()
                .map_err(|e| AuthError::internal(format!("corrupt challenge purpose: {e}")))?,
            expires_at: row.get("expires_at"),
            consumed: row.get("consumed"),
            created_at: row.get("created_at"),
        })
    }
}
