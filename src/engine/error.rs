use thiserror::Error;

/// Every engine operation fails with exactly one of these kinds. The API
/// layer translates them to transport responses in one place; the engine
/// itself never logs or swallows a violation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("an account with this name or email already exists")]
    DuplicateIdentity,

    #[error("a book with this name already exists for this account")]
    DuplicateBookName,

    #[error("no account matches this identity")]
    AccountNotFound,

    #[error("password does not match")]
    PasswordMismatch,

    #[error("token not found")]
    TokenNotFound,

    #[error("token expired")]
    TokenExpired,

    #[error("book not found or not owned by this account")]
    BookNotOwned,

    #[error("income categories require a non-negative amount")]
    NegativeIncome,

    #[error("outcome categories require a negative amount")]
    NonNegativeOutcome,

    #[error("required field is missing or blank: {0}")]
    MissingField(&'static str),

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("malformed category tag: {0}")]
    MalformedCategory(String),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// SQLite reports uniqueness conflicts as a generic database error; match
/// on the message the way the driver surfaces it.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE constraint failed")
    )
}
