//! # Payment Error Types
//!
//! Typed error handling for the storefront payment layer.
//! Construction and settlement return `Result<T, PaymentError>`; callback
//! verification never does, it reports through `VerificationResult`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or missing request field. Never signed or sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-2xx, network failure or timeout talking to a provider
    #[error("Gateway error [{provider}]: {}", format_gateway(.status, .message))]
    Gateway {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// No gateway registered for the requested payment method
    #[error("Unsupported payment provider: {method}")]
    UnsupportedProvider { method: String },

    /// Signature over an internally built payload did not verify.
    /// Inbound callbacks report mismatches as data instead.
    #[error("Signature mismatch for {provider} payload")]
    SignatureMismatch { provider: String },

    /// The order status updater rejected a settlement
    #[error("Settlement failed: {0}")]
    Settlement(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_gateway(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

impl PaymentError {
    /// Build a gateway error for a failed HTTP exchange
    pub fn gateway(provider: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        PaymentError::Gateway {
            provider: provider.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Returns true if the caller may retry the operation.
    ///
    /// Nothing in this crate retries on its own. A create call may only be
    /// retried with the same transaction ref, otherwise the gateway can end
    /// up holding two payment intents for one order.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Gateway { .. })
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::Validation(_) => 400,
            PaymentError::Gateway { .. } => 502,
            PaymentError::UnsupportedProvider { .. } => 400,
            PaymentError::SignatureMismatch { .. } => 500,
            PaymentError::Settlement(_) => 500,
            PaymentError::Serialization(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
