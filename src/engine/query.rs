//! Read-side queries over transactions: calendar-day and note-substring
//! filtering, time-range listing, and on-demand balance summation.

use chrono::{DateTime, Utc};

use crate::db::{DbPool, TransactionRow};

use super::error::CoreError;
use super::format_timestamp;
use super::ledger::{verify_book_ownership, Transaction};
use super::tokens::TokenManager;

/// The predicate shape shared by lookups and bulk deletion: an exact
/// calendar-day match and/or a case-sensitive note substring, ANDed.
#[derive(Debug, Clone, Default)]
pub struct TxFilter {
    pub day: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

pub struct QueryEngine {
    db: DbPool,
}

impl QueryEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Transactions of a book matching the filter. Day filters compare
    /// calendar dates, not instants. The note match uses `instr` because
    /// SQLite's LIKE folds ASCII case.
    pub async fn find_transactions(
        &self,
        book_id: i64,
        filter: &TxFilter,
    ) -> Result<Vec<Transaction>, CoreError> {
        let mut sql = String::from(
            "SELECT id, account_book_id, amount, time, note, category \
             FROM transactions WHERE account_book_id = ?",
        );
        if filter.day.is_some() {
            sql.push_str(" AND DATE(time) = DATE(?)");
        }
        if filter.note.is_some() {
            sql.push_str(" AND instr(note, ?) > 0");
        }

        let mut query = sqlx::query_as::<_, TransactionRow>(&sql).bind(book_id);
        if let Some(day) = filter.day {
            query = query.bind(format_timestamp(day));
        }
        if let Some(ref note) = filter.note {
            query = query.bind(note);
        }

        let rows = query.fetch_all(&self.db).await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Transactions in `[start, end]` (both inclusive) sorted by time
    /// ascending, after token resolution and an ownership check. An absent
    /// range means "everything to date": start defaults to the epoch and
    /// end to now.
    pub async fn transactions_in_range(
        &self,
        token: &str,
        book_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        note: Option<&str>,
    ) -> Result<Vec<Transaction>, CoreError> {
        let mut conn = self.db.acquire().await?;
        let account_id =
            TokenManager::resolve_with(&mut conn, token, Utc::now().timestamp()).await?;
        verify_book_ownership(&mut conn, account_id, book_id).await?;

        let start = start.unwrap_or(DateTime::UNIX_EPOCH);
        let end = end.unwrap_or_else(Utc::now);

        let mut sql = String::from(
            "SELECT id, account_book_id, amount, time, note, category \
             FROM transactions \
             WHERE account_book_id = ? AND time >= ? AND time <= ?",
        );
        if note.is_some() {
            sql.push_str(" AND instr(note, ?) > 0");
        }
        sql.push_str(" ORDER BY time ASC");

        let mut query = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(book_id)
            .bind(format_timestamp(start))
            .bind(format_timestamp(end));
        if let Some(note) = note {
            query = query.bind(note);
        }

        let rows = query.fetch_all(&mut *conn).await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// The book's balance, summed fresh on every call so out-of-band
    /// deletes can never leave a stale running total.
    pub async fn balance(&self, book_id: i64) -> Result<f64, CoreError> {
        let (sum,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0.0) FROM transactions WHERE account_book_id = ?",
        )
        .bind(book_id)
        .fetch_one(&self.db)
        .await?;
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::engine::category::{Category, IncomeCategory, OutcomeCategory};
    use crate::engine::credentials::CredentialStore;
    use crate::engine::ledger::LedgerStore;
    use chrono::TimeZone;

    async fn setup(pool: &DbPool, name: &str) -> String {
        let creds = CredentialStore::new(pool.clone());
        let tokens = TokenManager::new(pool.clone(), 15);
        let id = creds
            .register(name, &format!("{name}@example.com"), "h1")
            .await
            .unwrap();
        let (token, _) = tokens.issue(id).await.unwrap();
        token
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn balance_is_recomputed_from_the_rows() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let query = QueryEngine::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        assert_eq!(query.balance(book).await.unwrap(), 0.0);

        ledger
            .add_transaction(&token, book, 100.0, Category::Income(IncomeCategory::Salary), Utc::now(), "pay")
            .await
            .unwrap();
        ledger
            .add_transaction(&token, book, -30.0, Category::Outcome(OutcomeCategory::Food), Utc::now(), "food")
            .await
            .unwrap();
        assert_eq!(query.balance(book).await.unwrap(), 70.0);

        // an out-of-band delete must be reflected on the next call
        ledger
            .remove_transactions(
                book,
                &TxFilter {
                    note: Some("food".to_string()),
                    ..TxFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(query.balance(book).await.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn day_filter_matches_the_calendar_date() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let query = QueryEngine::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        let cat = Category::Income(IncomeCategory::Other);
        ledger.add_transaction(&token, book, 1.0, cat, at(2024, 5, 1, 8), "a").await.unwrap();
        ledger.add_transaction(&token, book, 2.0, cat, at(2024, 5, 1, 22), "b").await.unwrap();
        ledger.add_transaction(&token, book, 3.0, cat, at(2024, 5, 2, 8), "c").await.unwrap();

        let found = query
            .find_transactions(
                book,
                &TxFilter {
                    day: Some(at(2024, 5, 1, 15)),
                    ..TxFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn note_filter_is_case_sensitive_and_unanchored() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let query = QueryEngine::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        let cat = Category::Outcome(OutcomeCategory::Food);
        ledger.add_transaction(&token, book, -1.0, cat, Utc::now(), "coffee shop").await.unwrap();
        ledger.add_transaction(&token, book, -2.0, cat, Utc::now(), "iced coffee").await.unwrap();

        let lower = query
            .find_transactions(
                book,
                &TxFilter {
                    note: Some("coffee".to_string()),
                    ..TxFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(lower.len(), 2);

        let upper = query
            .find_transactions(
                book,
                &TxFilter {
                    note: Some("Coffee".to_string()),
                    ..TxFilter::default()
                },
            )
            .await
            .unwrap();
        assert!(upper.is_empty());
    }

    #[tokio::test]
    async fn range_defaults_cover_everything_and_sort_ascending() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let query = QueryEngine::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        let cat = Category::Income(IncomeCategory::Other);
        // inserted out of order on purpose
        ledger.add_transaction(&token, book, 2.0, cat, at(2024, 5, 2, 0), "").await.unwrap();
        ledger.add_transaction(&token, book, 1.0, cat, at(2024, 5, 1, 0), "").await.unwrap();
        ledger.add_transaction(&token, book, 3.0, cat, at(2024, 5, 3, 0), "").await.unwrap();

        let all = query
            .transactions_in_range(&token, book, None, None, None)
            .await
            .unwrap();
        let amounts: Vec<f64> = all.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn range_bounds_are_inclusive() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let query = QueryEngine::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        let cat = Category::Income(IncomeCategory::Other);
        ledger.add_transaction(&token, book, 1.0, cat, at(2024, 5, 1, 0), "").await.unwrap();
        ledger.add_transaction(&token, book, 2.0, cat, at(2024, 5, 2, 0), "").await.unwrap();
        ledger.add_transaction(&token, book, 3.0, cat, at(2024, 5, 3, 0), "").await.unwrap();

        let mid = query
            .transactions_in_range(
                &token,
                book,
                Some(at(2024, 5, 1, 0)),
                Some(at(2024, 5, 2, 0)),
                None,
            )
            .await
            .unwrap();
        assert_eq!(mid.len(), 2);
    }

    #[tokio::test]
    async fn range_listing_enforces_ownership() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let query = QueryEngine::new(pool.clone());
        let alice = setup(&pool, "alice").await;
        let bob = setup(&pool, "bob").await;
        let theirs = ledger.create_book(&bob, "Y").await.unwrap();

        assert!(matches!(
            query.transactions_in_range(&alice, theirs, None, None, None).await,
            Err(CoreError::BookNotOwned)
        ));
        assert!(matches!(
            query.transactions_in_range("bogus", theirs, None, None, None).await,
            Err(CoreError::TokenNotFound)
        ));
    }
}
