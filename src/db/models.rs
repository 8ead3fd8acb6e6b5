use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A transaction as stored: `time` is RFC 3339 text and `category` is the
/// discriminated tag (e.g. `income:salary`). The engine converts rows into
/// typed transactions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub account_book_id: i64,
    pub amount: f64,
    pub time: String,
    pub note: String,
    pub category: String,
}

// DTOs for API

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub pwd_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account name or email address
    pub identity: String,
    pub pwd_hash: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub identity: String,
    pub old_pwd_hash: String,
    pub new_pwd_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBookResponse {
    pub book_id: i64,
}

#[derive(Debug, Serialize)]
pub struct BookSummary {
    pub book_id: i64,
    pub name: String,
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    pub amount: f64,
    /// RFC 3339 or `YYYY-MM-DDTHH:MM:SS` (assumed UTC); defaults to now
    pub time: Option<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub category_index: u32,
}

#[derive(Debug, Serialize)]
pub struct TransactionEntry {
    pub id: i64,
    pub amount: f64,
    pub time: String,
    pub note: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub note: Option<String>,
}
