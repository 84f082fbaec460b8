//! # Error Types
//!
//! Domain-specific error types for prolipsi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  prolipsi-core errors (this file)                                      │
//! │  ├── CoreError        - Checkout / billing rule violations             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  prolipsi-db errors       └── DbError                                  │
//! │  prolipsi-gateway errors  └── GatewayError                             │
//! │  checkout-api errors      └── ApiError (what the front-end sees)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Front-end toast        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The calculators themselves never fail: numeric input is coerced and
//! clamped. Errors here come from the checkout session (navigation, unknown
//! quotes, unknown coupons) and from validating user-entered data.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Checkout and billing rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Coupon code is not in the active coupon book.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// A shipping quote id that is not among the quotes offered.
    #[error("Shipping quote not found: {0}")]
    UnknownShippingQuote(String),

    /// Navigation the checkout flow does not allow.
    ///
    /// ## When This Occurs
    /// - Skipping ahead more than one step
    /// - Leaving Processing/Success through plain navigation
    #[error("Cannot move checkout from {from} to {to}")]
    InvalidStepTransition { from: String, to: String },

    /// The current step's requirements are not met yet.
    ///
    /// ## User Workflow
    /// ```text
    /// Identification (no shipping quote picked)
    ///      │
    ///      ▼
    /// go_to(Review)
    ///      │
    ///      ▼
    /// CheckoutIncomplete { reason: "select a shipping option" }
    /// ```
    #[error("Checkout incomplete: {reason}")]
    CheckoutIncomplete { reason: String },

    /// The session is processing or finished; selections are frozen.
    #[error("Checkout is in step {step} and can no longer be changed")]
    CheckoutLocked { step: String },

    /// Installments outside the offered range.
    #[error("Installments {requested} exceed maximum allowed ({max})")]
    TooManyInstallments { requested: u32, max: u32 },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid CPF, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidStepTransition {
            from: "identification".to_string(),
            to: "payment".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot move checkout from identification to payment"
        );

        let err = CoreError::CouponNotFound("BLACKFRIDAY".to_string());
        assert_eq!(err.to_string(), "Coupon not found: BLACKFRIDAY");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("cpf").to_string(), "cpf is required");

        let err = ValidationError::TooShort {
            field: "name".to_string(),
            min: 4,
        };
        assert_eq!(err.to_string(), "name must be at least 4 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("email").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
