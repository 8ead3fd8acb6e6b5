//! The core engine: credentials, token sessions, books/transactions, and
//! read-side queries. Everything here takes and returns plain values over
//! an explicit database handle; transport concerns live in `api`.

pub mod category;
pub mod credentials;
pub mod error;
pub mod ledger;
pub mod query;
pub mod tokens;

pub use category::{Category, IncomeCategory, OutcomeCategory};
pub use credentials::CredentialStore;
pub use error::CoreError;
pub use ledger::{LedgerStore, Transaction};
pub use query::{QueryEngine, TxFilter};
pub use tokens::TokenManager;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use crate::db::DbPool;

/// Timestamps are persisted as fixed-width RFC 3339 UTC seconds
/// (`2024-05-01T08:00:00Z`), which keeps lexicographic and chronological
/// order identical for range predicates.
pub(crate) fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a client- or store-supplied timestamp: RFC 3339, a naive
/// `YYYY-MM-DDTHH:MM:SS` (taken as UTC), or a bare date.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(CoreError::MalformedTimestamp(s.to_string()))
}

/// All engine components wired over one shared pool.
pub struct Engine {
    pub credentials: CredentialStore,
    pub tokens: TokenManager,
    pub ledger: LedgerStore,
    pub query: QueryEngine,
}

impl Engine {
    pub fn new(db: DbPool, token_ttl_days: i64) -> Self {
        Self {
            credentials: CredentialStore::new(db.clone()),
            tokens: TokenManager::new(db.clone(), token_ttl_days),
            ledger: LedgerStore::new(db.clone()),
            query: QueryEngine::new(db),
        }
    }
}
