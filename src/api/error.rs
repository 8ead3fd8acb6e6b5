//! Unified API error handling.
//!
//! Every handler returns `Result<_, ApiError>`; engine failures are
//! translated here, in one place, so clients can always tell an
//! input-validation failure (fix the request) from an authorization
//! failure (log in again).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::engine::CoreError;

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    TokenExpired,
    NotFound,
    Conflict,
    ValidationError,
    InternalError,
    DatabaseError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::TokenExpired => "token_expired",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::DatabaseError => "database_error",
        }
    }
}

/// The inner error object in the response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// The full error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Validation error (400) for a specific field
    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, format!("{}: {}", field, message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = ErrorResponse {
            error: ErrorBody {
                code: self.code.as_str().to_string(),
                message: self.message,
            },
        };
        (self.code.status_code(), Json(response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

/// The single translation point from engine failures to transport codes.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::DuplicateIdentity | CoreError::DuplicateBookName => ErrorCode::Conflict,
            CoreError::AccountNotFound | CoreError::BookNotOwned => ErrorCode::NotFound,
            CoreError::PasswordMismatch | CoreError::TokenNotFound => ErrorCode::Unauthorized,
            CoreError::TokenExpired => ErrorCode::TokenExpired,
            CoreError::NegativeIncome
            | CoreError::NonNegativeOutcome
            | CoreError::MissingField(_)
            | CoreError::MalformedTimestamp(_)
            | CoreError::InvalidEmail => ErrorCode::ValidationError,
            CoreError::MalformedCategory(_) | CoreError::Database(_) => {
                tracing::error!("Engine failure: {}", err);
                ErrorCode::DatabaseError
            }
        };

        let message = match code {
            // Internal detail stays out of responses
            ErrorCode::DatabaseError => "A database error occurred".to_string(),
            _ => err.to_string(),
        };

        Self::new(code, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_status_codes() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::ValidationError.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn validation_and_authorization_classes_stay_distinct() {
        let validation = ApiError::from(CoreError::NegativeIncome);
        assert_eq!(validation.code, ErrorCode::ValidationError);

        let expired = ApiError::from(CoreError::TokenExpired);
        assert_eq!(expired.code, ErrorCode::TokenExpired);

        let missing = ApiError::from(CoreError::TokenNotFound);
        assert_eq!(missing.code, ErrorCode::Unauthorized);

        let foreign = ApiError::from(CoreError::BookNotOwned);
        assert_eq!(foreign.code, ErrorCode::NotFound);
    }

    #[test]
    fn duplicate_kinds_map_to_conflict() {
        assert_eq!(
            ApiError::from(CoreError::DuplicateBookName).code,
            ErrorCode::Conflict
        );
        assert_eq!(
            ApiError::from(CoreError::DuplicateIdentity).code,
            ErrorCode::Conflict
        );
    }
}
