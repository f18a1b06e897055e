//! API Error Handling
//!
//! Structured error responses with proper HTTP status codes and request
//! tracking. Core errors keep their recoverability class in the mapping:
//! validation and balance failures are the caller's to fix, duplicates are
//! conflicts, chain trouble is a bad gateway, anything else is a 500.

use crate::errors::CasinoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (VALIDATION_ERROR, INSUFFICIENT_BALANCE, ...)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Whether retrying the same request may succeed
    pub retryable: bool,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    pub request_id: String,
}

impl ApiError {
    pub fn from_casino(request_id: String, err: CasinoError) -> Self {
        let retryable = err.is_retryable();
        let (status, code) = match &err {
            CasinoError::Validation(_) | CasinoError::WithdrawalBounds(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            CasinoError::InsufficientBalance => {
                (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_BALANCE")
            }
            CasinoError::DuplicateTransaction(_) => (StatusCode::CONFLICT, "DUPLICATE_TRANSACTION"),
            CasinoError::ExternalVerification(_) => {
                (StatusCode::BAD_GATEWAY, "CHAIN_VERIFICATION_FAILED")
            }
            CasinoError::ConcurrencyConflict => (StatusCode::CONFLICT, "CONCURRENCY_CONFLICT"),
            CasinoError::Storage(_) | CasinoError::Corrupt(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        // Internal failures are logged with detail but not leaked.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(request_id = %request_id, error = %err, "internal error");
            "internal error".to_string()
        } else {
            err.to_string()
        };

        Self {
            status,
            code,
            message,
            retryable,
            request_id,
        }
    }

    pub fn too_many_requests(request_id: String) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "RATE_LIMITED",
            message: "too many requests".to_string(),
            retryable: true,
            request_id,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.request_id, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id.clone(),
            error: ErrorBody {
                code: self.code.to_string(),
                message: self.message.clone(),
                retryable: self.retryable,
            },
        });
        (self.status, body).into_response()
    }
}
