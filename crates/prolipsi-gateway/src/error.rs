//! # Gateway Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reqwest::Error ─────────────► Http                                     │
//! │  tokio::time::Elapsed ───────► Timeout                                  │
//! │  4xx / 5xx ──────────────────► UnexpectedStatus (body kept for logs)    │
//! │  JSON shape mismatch ────────► Decode                                   │
//! │  ViaCEP {"erro": true} ──────► PostalCodeNotFound                       │
//! │  no access token ────────────► MissingCredentials                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure (DNS, TLS, connection reset).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} did not answer within {timeout_ms} ms")]
    Timeout {
        service: &'static str,
        timeout_ms: u64,
    },

    /// The provider answered with a non-success status.
    #[error("{service} returned HTTP {status}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Could not decode {service} response: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },

    #[error("Postal code not found: {0}")]
    PostalCodeNotFound(String),

    #[error("Missing credentials for {0}")]
    MissingCredentials(&'static str),

    /// The request cannot be sent as built (e.g. card payment without token).
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Whether a caller could reasonably try again later.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Http(_) | GatewayError::Timeout { .. } => true,
            GatewayError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let timeout = GatewayError::Timeout {
            service: "shipping",
            timeout_ms: 3_000,
        };
        assert!(timeout.is_transient());

        let bad_gateway = GatewayError::UnexpectedStatus {
            service: "mercado_pago",
            status: 502,
            body: String::new(),
        };
        assert!(bad_gateway.is_transient());

        let rejected = GatewayError::UnexpectedStatus {
            service: "mercado_pago",
            status: 400,
            body: "{\"message\":\"invalid token\"}".to_string(),
        };
        assert!(!rejected.is_transient());
        assert!(!GatewayError::PostalCodeNotFound("00000000".into()).is_transient());
    }
}
