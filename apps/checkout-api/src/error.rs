//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Checkout API                       │
//! │                                                                         │
//! │  Front-end                   Rust Backend                               │
//! │  ─────────                   ────────────                               │
//! │                                                                         │
//! │  PUT /checkout/sessions/{id}/step                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler → Result<Json<T>, ApiError>                             │  │
//! │  │                                                                  │  │
//! │  │  CoreError::CheckoutIncomplete ───┐                              │  │
//! │  │  DbError::InsufficientBalance ────┼──► ApiError { code, message }│  │
//! │  │  GatewayError::Timeout ───────────┘          │                   │  │
//! │  │                                              ▼                   │  │
//! │  │                               (HTTP status, JSON body)           │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "CHECKOUT_ERROR",                                            │
//! │    "message": "Checkout incomplete: select a shipping option" }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal details (SQL errors, provider bodies) are logged and replaced by
//! a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use prolipsi_core::{CoreError, ValidationError};
use prolipsi_db::DbError;
use prolipsi_gateway::GatewayError;

/// API error returned from every handler.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Invoice not found: 8b1f..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Checkout navigation or locked session (409)
    CheckoutError,

    /// Wallet holds less than the order wants to use (409)
    InsufficientBalance,

    /// Payment provider refused or failed (502)
    PaymentError,

    /// Address or shipping provider failed (502)
    UpstreamError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::CheckoutError | ErrorCode::InsufficientBalance => StatusCode::CONFLICT,
            ErrorCode::PaymentError | ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Payment failures keep the provider's reason out of the response.
    pub fn payment(err: &GatewayError) -> Self {
        match err {
            GatewayError::InvalidRequest(reason) => ApiError::new(ErrorCode::PaymentError, reason.clone()),
            other if other.is_transient() => {
                tracing::warn!(error = %other, "Payment provider unavailable");
                ApiError::new(
                    ErrorCode::PaymentError,
                    "Não foi possível processar o pagamento. Tente novamente.",
                )
            }
            other => {
                tracing::error!(error = %other, "Payment provider call failed");
                ApiError::new(
                    ErrorCode::PaymentError,
                    "Pagamento não aceito. Revise os dados ou escolha outra forma de pagamento.",
                )
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InsufficientBalance {
                requested_cents,
                available_cents,
                ..
            } => ApiError::new(
                ErrorCode::InsufficientBalance,
                format!(
                    "Insufficient wallet balance: {} requested, {} available",
                    prolipsi_core::Money::from_cents(requested_cents),
                    prolipsi_core::Money::from_cents(available_cents)
                ),
            ),
            DbError::InvalidAmount { amount_cents } => ApiError::validation(format!(
                "Amount must be positive, got {} centavos",
                amount_cents
            )),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) | DbError::MigrationFailed(e) => {
                tracing::error!("Database unavailable: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            DbError::QueryFailed(e) | DbError::Internal(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database busy, try again")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CouponNotFound(code) => ApiError::not_found("Coupon", &code),
            CoreError::UnknownShippingQuote(id) => ApiError::not_found("Shipping quote", &id),
            e @ (CoreError::InvalidStepTransition { .. }
            | CoreError::CheckoutIncomplete { .. }
            | CoreError::CheckoutLocked { .. }) => ApiError::new(ErrorCode::CheckoutError, e.to_string()),
            e @ CoreError::TooManyInstallments { .. } => ApiError::validation(e.to_string()),
            e @ CoreError::InvalidPaymentAmount { .. } => {
                ApiError::new(ErrorCode::PaymentError, e.to_string())
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts non-payment gateway errors (address and shipping lookups).
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::PostalCodeNotFound(cep) => ApiError::not_found("Postal code", &cep),
            GatewayError::InvalidRequest(reason) => ApiError::validation(reason),
            GatewayError::MissingCredentials(service) => {
                tracing::error!(service, "Gateway credentials not configured");
                ApiError::internal("Service not configured")
            }
            other => {
                tracing::warn!(error = %other, "Upstream service failed");
                ApiError::new(ErrorCode::UpstreamError, "Serviço externo indisponível")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
