pub mod auth;
mod books;
mod error;
mod validation;

pub use error::{ApiError, ErrorCode, ErrorResponse};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (registration and login are public; refresh and logout
    // authenticate via the presented token itself)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout));

    // Token-bearing routes
    let api_routes = Router::new()
        // Account
        .route("/me", get(auth::me))
        .route("/me/password", put(auth::change_password))
        // Books
        .route("/books", get(books::list_books))
        .route("/books", post(books::create_book))
        .route("/books/:id", delete(books::delete_book))
        // Transactions
        .route("/books/:id/income", post(books::add_income))
        .route("/books/:id/outcome", post(books::add_outcome))
        .route("/books/:id/transactions", get(books::list_transactions));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
