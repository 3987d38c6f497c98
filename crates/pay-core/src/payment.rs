//! # Payment Types
//!
//! Request, redirect and verification types shared by every gateway.

use crate::error::{PaymentError, PaymentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Flat, case-sensitive field mapping received on a callback or return URL
pub type CallbackFields = BTreeMap<String, String>;

/// Supported payment gateways
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Wallet gateway with a JSON create API and IPN callbacks
    Momo,
    /// Redirect gateway with signed query strings
    Vnpay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Momo => "momo",
            PaymentMethod::Vnpay => "vnpay",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "momo" => Ok(PaymentMethod::Momo),
            "vnpay" => Ok(PaymentMethod::Vnpay),
            other => Err(PaymentError::UnsupportedProvider {
                method: other.to_string(),
            }),
        }
    }
}

/// Display language of the gateway's hosted page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Vi,
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Vi => "vi",
            Locale::En => "en",
        }
    }
}

/// A single payment attempt for an order.
///
/// Built once per checkout attempt through [`PaymentRequestBuilder`] and not
/// changed afterwards. The order entity, not this type, is the durable record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    transaction_ref: Option<String>,
    amount: u64,
    description: String,
    return_url: String,
    notify_url: Option<String>,
    locale: Locale,
    client_ip: Option<String>,
    bank_code: Option<String>,
    extra_data: Option<serde_json::Value>,
}

impl PaymentRequest {
    /// Start a request for `amount` minor currency units
    pub fn builder(
        amount: u64,
        description: impl Into<String>,
        return_url: impl Into<String>,
    ) -> PaymentRequestBuilder {
        PaymentRequestBuilder {
            request: PaymentRequest {
                transaction_ref: None,
                amount,
                description: description.into(),
                return_url: return_url.into(),
                notify_url: None,
                locale: Locale::Vi,
                client_ip: None,
                bank_code: None,
                extra_data: None,
            },
        }
    }

    /// Caller-supplied reference, if any. Adapters may generate one.
    pub fn transaction_ref(&self) -> Option<&str> {
        self.transaction_ref.as_deref()
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn return_url(&self) -> &str {
        &self.return_url
    }

    pub fn notify_url(&self) -> Option<&str> {
        self.notify_url.as_deref()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    pub fn bank_code(&self) -> Option<&str> {
        self.bank_code.as_deref()
    }

    pub fn extra_data(&self) -> Option<&serde_json::Value> {
        self.extra_data.as_ref()
    }
}

/// Builder for [`PaymentRequest`]
#[derive(Debug, Clone)]
pub struct PaymentRequestBuilder {
    request: PaymentRequest,
}

impl PaymentRequestBuilder {
    pub fn transaction_ref(mut self, transaction_ref: impl Into<String>) -> Self {
        self.request.transaction_ref = Some(transaction_ref.into());
        self
    }

    pub fn notify_url(mut self, url: impl Into<String>) -> Self {
        self.request.notify_url = Some(url.into());
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.request.locale = locale;
        self
    }

    pub fn client_ip(mut self, ip: impl Into<String>) -> Self {
        self.request.client_ip = Some(ip.into());
        self
    }

    pub fn bank_code(mut self, code: impl Into<String>) -> Self {
        self.request.bank_code = Some(code.into());
        self
    }

    pub fn extra_data(mut self, data: serde_json::Value) -> Self {
        self.request.extra_data = Some(data);
        self
    }

    /// Validate and freeze the request
    pub fn build(self) -> PaymentResult<PaymentRequest> {
        let request = self.request;

        if request.amount == 0 {
            return Err(PaymentError::Validation(
                "amount must be a positive number of minor units".to_string(),
            ));
        }
        if request.description.trim().is_empty() {
            return Err(PaymentError::Validation("description is empty".to_string()));
        }
        if request.return_url.trim().is_empty() {
            return Err(PaymentError::Validation("return url is empty".to_string()));
        }
        if matches!(request.transaction_ref.as_deref(), Some(r) if r.trim().is_empty()) {
            return Err(PaymentError::Validation(
                "transaction ref is empty".to_string(),
            ));
        }
        if matches!(request.notify_url.as_deref(), Some(u) if u.trim().is_empty()) {
            return Err(PaymentError::Validation("notify url is empty".to_string()));
        }

        Ok(request)
    }
}

/// Where to send the customer after a payment was created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRedirect {
    /// Reference correlating this attempt with its callback
    pub transaction_ref: String,

    /// Gateway that created the payment
    pub provider: PaymentMethod,

    /// URL to redirect the customer to
    pub pay_url: String,

    /// When the gateway stops accepting this payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Raw provider response (for debugging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

/// Business outcome of a payment, as reported by a verified callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Success,
    Failed,
    Pending,
}

/// Result of checking an inbound callback.
///
/// Only the gateways construct this. A forged or malformed callback produces
/// `is_authentic == false` and `outcome == Failed`, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    is_authentic: bool,
    outcome: PaymentOutcome,
    transaction_ref: Option<String>,
    provider_transaction_id: Option<String>,
    amount: Option<u64>,
    response_code: Option<String>,
    raw_fields: CallbackFields,
}

impl VerificationResult {
    /// The signature did not check out. Nothing inside the callback is trusted.
    pub fn rejected(raw_fields: CallbackFields) -> Self {
        Self {
            is_authentic: false,
            outcome: PaymentOutcome::Failed,
            transaction_ref: None,
            provider_transaction_id: None,
            amount: None,
            response_code: None,
            raw_fields,
        }
    }

    /// The signature is valid; `outcome` is the gateway's business result
    pub fn authentic(
        outcome: PaymentOutcome,
        transaction_ref: impl Into<String>,
        provider_transaction_id: Option<String>,
        amount: Option<u64>,
        response_code: impl Into<String>,
        raw_fields: CallbackFields,
    ) -> Self {
        Self {
            is_authentic: true,
            outcome,
            transaction_ref: Some(transaction_ref.into()),
            provider_transaction_id,
            amount,
            response_code: Some(response_code.into()),
            raw_fields,
        }
    }

    pub fn is_authentic(&self) -> bool {
        self.is_authentic
    }

    pub fn outcome(&self) -> PaymentOutcome {
        self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.is_authentic && self.outcome == PaymentOutcome::Success
    }

    /// Order reference carried by an authentic callback
    pub fn transaction_ref(&self) -> Option<&str> {
        self.transaction_ref.as_deref()
    }

    pub fn provider_transaction_id(&self) -> Option<&str> {
        self.provider_transaction_id.as_deref()
    }

    /// Paid amount in minor units
    pub fn amount(&self) -> Option<u64> {
        self.amount
    }

    /// Gateway result code, kept for diagnostics only
    pub fn response_code(&self) -> Option<&str> {
        self.response_code.as_deref()
    }

    pub fn raw_fields(&self) -> &CallbackFields {
        &self.raw_fields
    }
}
