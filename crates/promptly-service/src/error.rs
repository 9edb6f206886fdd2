//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
///
/// Business outcomes (quota exceeded, nothing to cancel, payment not
/// confirmed) are distinct variants so callers can tell "upgrade" apart
/// from "retry".
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Free-tier generation ceiling reached.
    #[error("quota exceeded: used={used}, ceiling={ceiling}")]
    QuotaExceeded {
        /// Authoritative count at decision time.
        used: u64,
        /// Configured ceiling.
        ceiling: u64,
    },

    /// Checkout session exists but payment is not complete.
    #[error("payment not confirmed")]
    PaymentNotConfirmed,

    /// No account identifier in checkout session or subscription metadata.
    #[error("account identifier missing from checkout metadata")]
    AccountIdentifierMissing,

    /// Cancellation requested with no active pro subscription.
    #[error("nothing to cancel")]
    NothingToCancel,

    /// Some processor subscriptions were cancelled, others were not.
    #[error("partial cancellation: {cancelled} cancelled, {failed} failed")]
    PartialCancellation {
        /// Subscriptions successfully cancelled.
        cancelled: usize,
        /// Subscriptions that failed to cancel.
        failed: usize,
    },

    /// The generation dependency failed or is exhausted.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::QuotaExceeded { used, ceiling } => (
                StatusCode::TOO_MANY_REQUESTS,
                "quota_exceeded",
                self.to_string(),
                Some(serde_json::json!({
                    "used": used,
                    "ceiling": ceiling
                })),
            ),
            Self::PaymentNotConfirmed => (
                StatusCode::PAYMENT_REQUIRED,
                "payment_not_confirmed",
                self.to_string(),
                None,
            ),
            Self::AccountIdentifierMissing => (
                StatusCode::BAD_REQUEST,
                "account_identifier_missing",
                self.to_string(),
                None,
            ),
            Self::NothingToCancel => (
                StatusCode::CONFLICT,
                "nothing_to_cancel",
                self.to_string(),
                None,
            ),
            Self::PartialCancellation { cancelled, failed } => (
                StatusCode::BAD_GATEWAY,
                "partial_cancellation",
                self.to_string(),
                Some(serde_json::json!({
                    "cancelled": cancelled,
                    "failed": failed
                })),
            ),
            Self::GenerationFailed(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "generation_failed",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<promptly_store::StoreError> for ApiError {
    fn from(err: promptly_store::StoreError) -> Self {
        match err {
            promptly_store::StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            promptly_store::StoreError::Database(msg)
            | promptly_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<crate::stripe::StripeError> for ApiError {
    fn from(err: crate::stripe::StripeError) -> Self {
        Self::ExternalService(err.to_string())
    }
}

impl From<crate::generator::GeneratorError> for ApiError {
    fn from(err: crate::generator::GeneratorError) -> Self {
        Self::GenerationFailed(err.to_string())
    }
}
