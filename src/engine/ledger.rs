//! Books and the transactions inside them. Every mutating operation takes
//! a bearer token, resolves it, and checks ownership with the resolved
//! account id inside the same SQL transaction as the mutation, so a
//! concurrent book removal cannot slip between check and write.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db::{BookSummary, DbPool, TransactionRow};

use super::category::Category;
use super::error::{is_unique_violation, CoreError};
use super::query::TxFilter;
use super::tokens::TokenManager;
use super::{format_timestamp, parse_timestamp};

/// A fully-typed transaction as the engine hands it out.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub book_id: i64,
    pub amount: f64,
    pub time: DateTime<Utc>,
    pub note: String,
    pub category: Category,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = CoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            book_id: row.account_book_id,
            amount: row.amount,
            time: parse_timestamp(&row.time)?,
            note: row.note,
            category: Category::parse_tag(&row.category)?,
        })
    }
}

/// Confirm `book_id` belongs to `account_id`. Absent and foreign books are
/// indistinguishable to the caller.
pub(crate) async fn verify_book_ownership(
    conn: &mut SqliteConnection,
    account_id: i64,
    book_id: i64,
) -> Result<(), CoreError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM account_books WHERE account_book_id = ? AND account_id = ?",
    )
    .bind(book_id)
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(|_| ()).ok_or(CoreError::BookNotOwned)
}

pub struct LedgerStore {
    db: DbPool,
}

impl LedgerStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Create a book for the token's account. Book names are unique per
    /// account, not globally.
    pub async fn create_book(&self, token: &str, name: &str) -> Result<i64, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::MissingField("name"));
        }

        let mut tx = self.db.begin().await?;
        let account_id = TokenManager::resolve_with(&mut tx, token, Utc::now().timestamp()).await?;

        let dup: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM account_books WHERE name = ? AND account_id = ?",
        )
        .bind(name)
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?;
        if dup.is_some() {
            return Err(CoreError::DuplicateBookName);
        }

        let result = sqlx::query("INSERT INTO account_books (name, account_id) VALUES (?, ?)")
            .bind(name)
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CoreError::DuplicateBookName
                } else {
                    CoreError::Database(e)
                }
            })?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// All books of the token's account, each with a freshly summed
    /// balance. Ordering follows the store and is not part of the contract.
    pub async fn list_books(&self, token: &str) -> Result<Vec<BookSummary>, CoreError> {
        let mut conn = self.db.acquire().await?;
        let account_id =
            TokenManager::resolve_with(&mut conn, token, Utc::now().timestamp()).await?;

        let rows: Vec<(i64, String, f64)> = sqlx::query_as(
            "SELECT b.account_book_id, b.name, COALESCE(SUM(t.amount), 0.0) \
             FROM account_books b \
             LEFT JOIN transactions t ON t.account_book_id = b.account_book_id \
             WHERE b.account_id = ? \
             GROUP BY b.account_book_id, b.name",
        )
        .bind(account_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(book_id, name, balance)| BookSummary {
                book_id,
                name,
                balance,
            })
            .collect())
    }

    /// Delete a book owned by the token's account; its transactions go
    /// with it (ON DELETE CASCADE).
    pub async fn remove_book(&self, token: &str, book_id: i64) -> Result<(), CoreError> {
        let mut tx = self.db.begin().await?;
        let account_id = TokenManager::resolve_with(&mut tx, token, Utc::now().timestamp()).await?;
        verify_book_ownership(&mut tx, account_id, book_id).await?;

        sqlx::query("DELETE FROM account_books WHERE account_book_id = ?")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Insert a transaction after the ownership check and the
    /// category/amount-sign check, in that order.
    pub async fn add_transaction(
        &self,
        token: &str,
        book_id: i64,
        amount: f64,
        category: Category,
        time: DateTime<Utc>,
        note: &str,
    ) -> Result<i64, CoreError> {
        let mut tx = self.db.begin().await?;
        let account_id = TokenManager::resolve_with(&mut tx, token, Utc::now().timestamp()).await?;
        verify_book_ownership(&mut tx, account_id, book_id).await?;

        category.check_amount(amount)?;

        let result = sqlx::query(
            "INSERT INTO transactions (account_book_id, amount, time, note, category) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(book_id)
        .bind(amount)
        .bind(format_timestamp(time))
        .bind(note)
        .bind(category.tag())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// Delete every transaction in the book matching the filter, in one
    /// statement. Returns the number of rows deleted; zero is a success.
    pub async fn remove_transactions(
        &self,
        book_id: i64,
        filter: &TxFilter,
    ) -> Result<u64, CoreError> {
        let mut sql = String::from("DELETE FROM transactions WHERE account_book_id = ?");
        if filter.day.is_some() {
            sql.push_str(" AND DATE(time) = DATE(?)");
        }
        if filter.note.is_some() {
            sql.push_str(" AND instr(note, ?) > 0");
        }

        let mut query = sqlx::query(&sql).bind(book_id);
        if let Some(day) = filter.day {
            query = query.bind(format_timestamp(day));
        }
        if let Some(ref note) = filter.note {
            query = query.bind(note);
        }

        let result = query.execute(&self.db).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::engine::category::{IncomeCategory, OutcomeCategory};
    use crate::engine::credentials::CredentialStore;
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

    fn income(c: IncomeCategory) -> Category {
        Category::Income(c)
    }

    fn outcome(c: OutcomeCategory) -> Category {
        Category::Outcome(c)
    }

    #[tokio::test]
    async fn create_book_requires_a_name_and_a_live_token() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let token = setup(&pool, "alice").await;

        assert!(matches!(
            ledger.create_book(&token, "   ").await,
            Err(CoreError::MissingField("name"))
        ));
        assert!(matches!(
            ledger.create_book("bogus", "Main").await,
            Err(CoreError::TokenNotFound)
        ));

        let book_id = ledger.create_book(&token, "Main").await.unwrap();
        assert!(book_id > 0);
    }

    #[tokio::test]
    async fn duplicate_book_names_are_per_account() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let alice = setup(&pool, "alice").await;
        let bob = setup(&pool, "bob").await;

        ledger.create_book(&alice, "Main").await.unwrap();
        assert!(matches!(
            ledger.create_book(&alice, "Main").await,
            Err(CoreError::DuplicateBookName)
        ));
        // same name under a different account is fine
        ledger.create_book(&bob, "Main").await.unwrap();
    }

    #[tokio::test]
    async fn list_books_reports_fresh_balances() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let token = setup(&pool, "alice").await;

        let empty = ledger.create_book(&token, "Empty").await.unwrap();
        let busy = ledger.create_book(&token, "Busy").await.unwrap();
        ledger
            .add_transaction(&token, busy, 100.0, income(IncomeCategory::Salary), Utc::now(), "pay")
            .await
            .unwrap();
        ledger
            .add_transaction(&token, busy, -30.0, outcome(OutcomeCategory::Food), Utc::now(), "food")
            .await
            .unwrap();

        let books = ledger.list_books(&token).await.unwrap();
        assert_eq!(books.len(), 2);
        let by_id = |id: i64| books.iter().find(|b| b.book_id == id).unwrap();
        assert_eq!(by_id(empty).balance, 0.0);
        assert_eq!(by_id(busy).balance, 70.0);
    }

    #[tokio::test]
    async fn ownership_isolation_between_accounts() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let alice = setup(&pool, "alice").await;
        let bob = setup(&pool, "bob").await;

        let theirs = ledger.create_book(&bob, "Y").await.unwrap();

        assert!(matches!(
            ledger.remove_book(&alice, theirs).await,
            Err(CoreError::BookNotOwned)
        ));
        assert!(matches!(
            ledger
                .add_transaction(&alice, theirs, 1.0, income(IncomeCategory::Other), Utc::now(), "")
                .await,
            Err(CoreError::BookNotOwned)
        ));
        // a book id that does not exist reads the same way
        assert!(matches!(
            ledger.remove_book(&alice, 9999).await,
            Err(CoreError::BookNotOwned)
        ));
    }

    #[tokio::test]
    async fn sign_invariant_is_enforced_at_insert() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        assert!(matches!(
            ledger
                .add_transaction(&token, book, -5.0, income(IncomeCategory::Salary), Utc::now(), "")
                .await,
            Err(CoreError::NegativeIncome)
        ));
        assert!(matches!(
            ledger
                .add_transaction(&token, book, 5.0, outcome(OutcomeCategory::Rent), Utc::now(), "")
                .await,
            Err(CoreError::NonNegativeOutcome)
        ));

        // zero counts as income
        ledger
            .add_transaction(&token, book, 0.0, income(IncomeCategory::Other), Utc::now(), "")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_book_cascades_to_transactions() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();
        ledger
            .add_transaction(&token, book, 10.0, income(IncomeCategory::Bonus), Utc::now(), "")
            .await
            .unwrap();

        ledger.remove_book(&token, book).await.unwrap();

        let left: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE account_book_id = ?")
                .bind(book)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(left.0, 0);
    }

    #[tokio::test]
    async fn remove_transactions_by_filter() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        let now = Utc::now();
        for note in ["coffee", "coffee beans", "rent"] {
            let (amount, cat) = (-5.0, outcome(OutcomeCategory::Other));
            ledger
                .add_transaction(&token, book, amount, cat, now, note)
                .await
                .unwrap();
        }

        let removed = ledger
            .remove_transactions(
                book,
                &TxFilter {
                    note: Some("coffee".to_string()),
                    ..TxFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(removed, 2);

        // nothing left to match: zero is a success, not an error
        let removed = ledger
            .remove_transactions(
                book,
                &TxFilter {
                    note: Some("coffee".to_string()),
                    ..TxFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(removed, 0);

        let removed = ledger
            .remove_transactions(book, &TxFilter::default())
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn remove_transactions_by_calendar_day() {
        let pool = db::connect_memory().await.unwrap();
        let ledger = LedgerStore::new(pool.clone());
        let token = setup(&pool, "alice").await;
        let book = ledger.create_book(&token, "Main").await.unwrap();

        let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap();
        let cat = outcome(OutcomeCategory::Other);
        ledger.add_transaction(&token, book, -1.0, cat, at(1, 8), "a").await.unwrap();
        ledger.add_transaction(&token, book, -2.0, cat, at(1, 22), "b").await.unwrap();
        ledger.add_transaction(&token, book, -3.0, cat, at(2, 8), "c").await.unwrap();

        // the filter instant's time of day is irrelevant, only the date counts
        let removed = ledger
            .remove_transactions(
                book,
                &TxFilter {
                    day: Some(at(1, 15)),
                    ..TxFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let left = ledger
            .remove_transactions(book, &TxFilter::default())
            .await
            .unwrap();
        assert_eq!(left, 1);
    }
}
