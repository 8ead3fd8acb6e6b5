//! Book and transaction endpoints. Every route takes a bearer token; the
//! engine resolves it and re-verifies ownership, so handlers never pass a
//! caller-supplied account id anywhere.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::{
    AddEntryRequest, BookSummary, CreateBookRequest, CreateBookResponse, TransactionEntry,
    TransactionListQuery,
};
use crate::engine::{parse_timestamp, Category, IncomeCategory, OutcomeCategory, Transaction};
use crate::AppState;

use super::auth::extract_token;
use super::error::ApiError;
use super::validation::{validate_book_name, validate_note};

#[derive(Debug, serde::Serialize)]
pub struct EntryResponse {
    pub id: i64,
}

/// Create a book under the authenticated account
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<CreateBookResponse>), ApiError> {
    let token = extract_token(&headers)?;
    if let Err(e) = validate_book_name(&request.name) {
        return Err(ApiError::validation_field("name", e));
    }

    let book_id = state.engine.ledger.create_book(token, &request.name).await?;
    Ok((StatusCode::CREATED, Json(CreateBookResponse { book_id })))
}

/// List the account's books with their current balances
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookSummary>>, ApiError> {
    let token = extract_token(&headers)?;
    let books = state.engine.ledger.list_books(token).await?;
    Ok(Json(books))
}

/// Remove a book and everything in it
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(book_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers)?;
    state.engine.ledger.remove_book(token, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A missing time means "now"
fn entry_time(time: &Option<String>) -> Result<DateTime<Utc>, ApiError> {
    match time {
        Some(s) => Ok(parse_timestamp(s)?),
        None => Ok(Utc::now()),
    }
}

async fn add_entry(
    state: &AppState,
    headers: &HeaderMap,
    book_id: i64,
    request: &AddEntryRequest,
    category: Category,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let token = extract_token(headers)?;
    if let Err(e) = validate_note(&request.note) {
        return Err(ApiError::validation_field("note", e));
    }
    let time = entry_time(&request.time)?;

    let id = state
        .engine
        .ledger
        .add_transaction(token, book_id, request.amount, category, time, &request.note)
        .await?;
    Ok((StatusCode::CREATED, Json(EntryResponse { id })))
}

/// Record an income transaction (non-negative amount)
pub async fn add_income(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(book_id): Path<i64>,
    Json(request): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let category = Category::Income(IncomeCategory::from_index(request.category_index));
    add_entry(&state, &headers, book_id, &request, category).await
}

/// Record an outcome transaction (negative amount)
pub async fn add_outcome(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(book_id): Path<i64>,
    Json(request): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let category = Category::Outcome(OutcomeCategory::from_index(request.category_index));
    add_entry(&state, &headers, book_id, &request, category).await
}

fn to_entry(tx: Transaction) -> TransactionEntry {
    TransactionEntry {
        id: tx.id,
        amount: tx.amount,
        time: tx.time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        note: tx.note,
        category: tx.category.tag(),
    }
}

/// Transactions of a book within an optional time range, oldest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(book_id): Path<i64>,
    Query(params): Query<TransactionListQuery>,
) -> Result<Json<Vec<TransactionEntry>>, ApiError> {
    let token = extract_token(&headers)?;

    let start = params.start.as_deref().map(parse_timestamp).transpose()?;
    let end = params.end.as_deref().map(parse_timestamp).transpose()?;

    let entries = state
        .engine
        .query
        .transactions_in_range(token, book_id, start, end, params.note.as_deref())
        .await?;
    Ok(Json(entries.into_iter().map(to_entry).collect()))
}
