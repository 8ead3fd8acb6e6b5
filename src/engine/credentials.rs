//! Account identity: registration, password verification, password change.
//! The password hash is an opaque caller-supplied credential; this store
//! compares it in constant time and makes no claim about its strength.

use lazy_static::lazy_static;
use regex::Regex;
use subtle::ConstantTimeEq;

use crate::db::DbPool;

use super::error::{is_unique_violation, CoreError};

lazy_static! {
    /// Regex for a minimally plausible email: local part, @, dotted domain
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Compare two stored/presented hashes without leaking a prefix length
fn hashes_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[derive(Clone)]
pub struct CredentialStore {
    db: DbPool,
}

impl CredentialStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Create a new account with no session token set.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        pwd_hash: &str,
    ) -> Result<i64, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::MissingField("name"));
        }
        if pwd_hash.is_empty() {
            return Err(CoreError::MissingField("pwd_hash"));
        }
        if !EMAIL_REGEX.is_match(email) {
            return Err(CoreError::InvalidEmail);
        }

        let result = sqlx::query("INSERT INTO accounts (name, email, pwd) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(pwd_hash)
            .execute(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CoreError::DuplicateIdentity
                } else {
                    CoreError::Database(e)
                }
            })?;

        Ok(result.last_insert_rowid())
    }

    /// Check a password hash against the account matching `identity`
    /// (name or email) and return the account id.
    pub async fn verify_password(
        &self,
        identity: &str,
        pwd_hash: &str,
    ) -> Result<i64, CoreError> {
        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT account_id, pwd FROM accounts WHERE name = ? OR email = ?",
        )
        .bind(identity)
        .bind(identity)
        .fetch_optional(&self.db)
        .await?;

        let (account_id, stored) = row.ok_or(CoreError::AccountNotFound)?;
        if !hashes_match(&stored, pwd_hash) {
            return Err(CoreError::PasswordMismatch);
        }
        Ok(account_id)
    }

    /// Replace the stored hash after verifying the old one. Verification
    /// and overwrite run in one transaction.
    pub async fn change_password(
        &self,
        identity: &str,
        old_hash: &str,
        new_hash: &str,
    ) -> Result<(), CoreError> {
        if new_hash.is_empty() {
            return Err(CoreError::MissingField("new_pwd_hash"));
        }

        let mut tx = self.db.begin().await?;

        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT account_id, pwd FROM accounts WHERE name = ? OR email = ?",
        )
        .bind(identity)
        .bind(identity)
        .fetch_optional(&mut *tx)
        .await?;

        let (account_id, stored) = row.ok_or(CoreError::AccountNotFound)?;
        if !hashes_match(&stored, old_hash) {
            return Err(CoreError::PasswordMismatch);
        }

        sqlx::query("UPDATE accounts SET pwd = ? WHERE account_id = ?")
            .bind(new_hash)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Name and email for a resolved account.
    pub async fn profile(&self, account_id: i64) -> Result<(String, String), CoreError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT name, email FROM accounts WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(&self.db)
                .await?;
        row.ok_or(CoreError::AccountNotFound)
    }
}
