//! Opaque bearer-token sessions. One live token per account: issuing or
//! refreshing overwrites the previous token, and revocation backdates the
//! expiry instead of deleting the row, so "logged out" and "expired" read
//! the same at the storage layer.

use chrono::Utc;
use rand::Rng;
use sqlx::SqliteConnection;

use crate::db::DbPool;

use super::error::CoreError;

/// Generate a random token (256 bits of entropy, hex encoded)
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct TokenManager {
    db: DbPool,
    ttl_days: i64,
}

impl TokenManager {
    pub fn new(db: DbPool, ttl_days: i64) -> Self {
        Self { db, ttl_days }
    }

    fn expiry_from(&self, now: i64) -> i64 {
        now + self.ttl_days * 24 * 3600
    }

    /// Issue a fresh token for an account, invalidating any prior one.
    pub async fn issue(&self, account_id: i64) -> Result<(String, i64), CoreError> {
        let token = generate_token();
        let expires_at = self.expiry_from(Utc::now().timestamp());

        let result = sqlx::query(
            "UPDATE accounts SET token = ?, token_expire = ? WHERE account_id = ?",
        )
        .bind(&token)
        .bind(expires_at)
        .bind(account_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::AccountNotFound);
        }
        Ok((token, expires_at))
    }

    /// Resolve a token to the account that holds it.
    pub async fn resolve(&self, token: &str) -> Result<i64, CoreError> {
        let mut conn = self.db.acquire().await?;
        Self::resolve_with(&mut conn, token, Utc::now().timestamp()).await
    }

    /// Token lookup usable inside a caller-owned transaction, so ownership
    /// checks and mutations serialize with the resolution.
    ///
    /// Expiry is exclusive: a token is valid only while `now < expiry`.
    pub(crate) async fn resolve_with(
        conn: &mut SqliteConnection,
        token: &str,
        now: i64,
    ) -> Result<i64, CoreError> {
        let row: Option<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT account_id, token_expire FROM accounts WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&mut *conn)
        .await?;

        let (account_id, expires_at) = row.ok_or(CoreError::TokenNotFound)?;
        if expires_at.is_some_and(|e| now < e) {
            Ok(account_id)
        } else {
            Err(CoreError::TokenExpired)
        }
    }

    /// Exchange a still-valid token for a new one with a fresh expiry.
    pub async fn refresh(&self, old_token: &str) -> Result<(String, i64), CoreError> {
        let now = Utc::now().timestamp();
        let mut tx = self.db.begin().await?;

        let account_id = Self::resolve_with(&mut tx, old_token, now).await?;

        let token = generate_token();
        let expires_at = self.expiry_from(now);
        sqlx::query("UPDATE accounts SET token = ?, token_expire = ? WHERE account_id = ?")
            .bind(&token)
            .bind(expires_at)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((token, expires_at))
    }

    /// Revoke a token by moving its expiry one second into the past.
    /// Revoking an already-expired token is a no-op success.
    pub async fn revoke(&self, token: &str) -> Result<(), CoreError> {
        let now = Utc::now().timestamp();
        let mut tx = self.db.begin().await?;

        let row: Option<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT account_id, token_expire FROM accounts WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let (account_id, expires_at) = row.ok_or(CoreError::TokenNotFound)?;
        if !expires_at.is_some_and(|e| now < e) {
            // Already unusable, nothing to change
            return Ok(());
        }

        sqlx::query("UPDATE accounts SET token_expire = ? WHERE account_id = ?")
            .bind(now - 1)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
