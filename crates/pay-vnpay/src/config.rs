//! # VNPay Configuration
//!
//! Merchant terminal credentials for the VNPay gateway.

use chrono::Duration;
use pay_core::PaymentError;
use secrecy::{ExposeSecret, SecretString};
use std::env;

/// Sandbox payment page
pub const SANDBOX_PAYMENT_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

/// Protocol version this adapter speaks
pub const API_VERSION: &str = "2.1.0";

/// Default lifetime of a payment URL, in minutes
pub const DEFAULT_EXPIRE_MINUTES: i64 = 15;

/// VNPay terminal configuration
#[derive(Debug, Clone)]
pub struct VnpayConfig {
    /// Terminal code issued by VNPay (`vnp_TmnCode`)
    pub tmn_code: String,

    /// Secure hash secret; redacted in `Debug` output
    pub hash_secret: SecretString,

    /// Payment page the customer is redirected to
    pub payment_url: String,

    /// How long a payment URL stays valid (`vnp_ExpireDate - vnp_CreateDate`)
    pub expire_after: Duration,

    /// `vnp_Version`
    pub version: String,
}

impl VnpayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `VNPAY_TMN_CODE`
    /// - `VNPAY_HASH_SECRET`
    ///
    /// Optional: `VNPAY_PAYMENT_URL`, `VNPAY_EXPIRE_MINUTES`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok();

        let tmn_code = required_var("VNPAY_TMN_CODE")?;
        let hash_secret = required_var("VNPAY_HASH_SECRET")?;

        let payment_url =
            env::var("VNPAY_PAYMENT_URL").unwrap_or_else(|_| SANDBOX_PAYMENT_URL.to_string());

        let expire_minutes = match env::var("VNPAY_EXPIRE_MINUTES") {
            Ok(raw) => match raw.parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    return Err(PaymentError::Configuration(format!(
                        "VNPAY_EXPIRE_MINUTES must be a positive number: {}",
                        raw
                    )))
                }
            },
            Err(_) => DEFAULT_EXPIRE_MINUTES,
        };

        Ok(Self {
            tmn_code,
            hash_secret: SecretString::from(hash_secret),
            payment_url,
            expire_after: Duration::minutes(expire_minutes),
            version: API_VERSION.to_string(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(tmn_code: impl Into<String>, hash_secret: impl Into<String>) -> Self {
        Self {
            tmn_code: tmn_code.into(),
            hash_secret: SecretString::from(hash_secret.into()),
            payment_url: SANDBOX_PAYMENT_URL.to_string(),
            expire_after: Duration::minutes(DEFAULT_EXPIRE_MINUTES),
            version: API_VERSION.to_string(),
        }
    }

    /// Builder: set the payment page URL
    pub fn with_payment_url(mut self, url: impl Into<String>) -> Self {
        self.payment_url = url.into();
        self
    }

    /// Builder: set the payment URL lifetime
    pub fn with_expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = expire_after;
        self
    }

    pub(crate) fn secret(&self) -> &str {
        self.hash_secret.expose_secret()
    }
}

fn required_var(name: &str) -> Result<String, PaymentError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PaymentError::Configuration(format!("{} not set", name))),
    }
}
