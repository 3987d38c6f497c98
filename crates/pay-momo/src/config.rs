//! # MoMo Configuration
//!
//! Partner credentials for the MoMo gateway.
//! All secrets are loaded from environment variables and never logged.

use pay_core::PaymentError;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;

/// Sandbox create-payment endpoint
pub const SANDBOX_ENDPOINT: &str = "https://test-payment.momo.vn/v2/gateway/api/create";

/// Default bound on the create-payment HTTP call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// MoMo partner configuration
#[derive(Debug, Clone)]
pub struct MomoConfig {
    /// Partner code issued by MoMo (e.g., "MOMOBKUN20180529")
    pub partner_code: String,

    /// Access key, sent with every request and part of every signature
    pub access_key: String,

    /// HMAC secret; redacted in `Debug` output
    pub secret_key: SecretString,

    /// Create-payment endpoint (sandbox or production)
    pub endpoint: String,

    /// Timeout for the create-payment call
    pub request_timeout: Duration,
}

impl MomoConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `MOMO_PARTNER_CODE`
    /// - `MOMO_ACCESS_KEY`
    /// - `MOMO_SECRET_KEY`
    ///
    /// Optional: `MOMO_ENDPOINT`, `MOMO_REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let partner_code = required_var("MOMO_PARTNER_CODE")?;
        let access_key = required_var("MOMO_ACCESS_KEY")?;
        let secret_key = required_var("MOMO_SECRET_KEY")?;

        let endpoint = env::var("MOMO_ENDPOINT").unwrap_or_else(|_| SANDBOX_ENDPOINT.to_string());

        let request_timeout = match env::var("MOMO_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    PaymentError::Configuration(format!(
                        "MOMO_REQUEST_TIMEOUT_SECS is not a number: {}",
                        raw
                    ))
                })?;
                if secs == 0 {
                    return Err(PaymentError::Configuration(
                        "MOMO_REQUEST_TIMEOUT_SECS must be positive".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            partner_code,
            access_key,
            secret_key: SecretString::from(secret_key),
            endpoint,
            request_timeout,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        partner_code: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            partner_code: partner_code.into(),
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
            endpoint: SANDBOX_ENDPOINT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Builder: set a custom endpoint (for testing)
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Builder: set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub(crate) fn secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

fn required_var(name: &str) -> Result<String, PaymentError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PaymentError::Configuration(format!("{} not set", name))),
    }
}
