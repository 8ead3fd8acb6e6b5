//! Authentication endpoints: registration, password login, token refresh,
//! logout, profile, and password change. All session logic lives in the
//! engine; handlers only move values across the wire.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{
    ChangePasswordRequest, LoginRequest, ProfileResponse, RegisterRequest, TokenResponse,
};
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_account_name;

/// Extract the bearer token from request headers
pub(super) fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account_id: i64,
}

/// Create a new account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if let Err(e) = validate_account_name(&request.name) {
        return Err(ApiError::validation_field("name", e));
    }

    let account_id = state
        .engine
        .credentials
        .register(&request.name, &request.email, &request.pwd_hash)
        .await?;

    tracing::info!("Registered account {}", request.name);
    Ok((StatusCode::CREATED, Json(RegisterResponse { account_id })))
}

/// Exchange name-or-email + password hash for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let account_id = state
        .engine
        .credentials
        .verify_password(&request.identity, &request.pwd_hash)
        .await?;
    let (token, expires_at) = state.engine.tokens.issue(account_id).await?;
    Ok(Json(TokenResponse { token, expires_at }))
}

/// Trade a still-valid token for a fresh one
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let old_token = extract_token(&headers)?;
    let (token, expires_at) = state.engine.tokens.refresh(old_token).await?;
    Ok(Json(TokenResponse { token, expires_at }))
}

/// Invalidate the presented token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers)?;
    state.engine.tokens.revoke(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Profile of the authenticated account
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let token = extract_token(&headers)?;
    let account_id = state.engine.tokens.resolve(token).await?;
    let (name, email) = state.engine.credentials.profile(account_id).await?;
    Ok(Json(ProfileResponse { name, email }))
}

/// Change the stored password hash after verifying the old one
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if request.old_pwd_hash == request.new_pwd_hash {
        return Err(ApiError::validation_field(
            "new_pwd_hash",
            "New password must differ from the old one",
        ));
    }

    state
        .engine
        .credentials
        .change_password(&request.identity, &request.old_pwd_hash, &request.new_pwd_hash)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
