//! # VNPay Gateway
//!
//! VNPay needs no server-side create call: the payment is the signed URL.
//! The customer comes back to the return URL with a signed query, and VNPay
//! separately calls the IPN URL configured on the merchant portal with the
//! same parameters.

use crate::config::VnpayConfig;
use crate::params::{
    self, PaymentUrlParams, AMOUNT_MULTIPLIER, CODE_SUCCESS, SECURE_HASH,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pay_core::signer::{require, signatures_match};
use pay_core::{
    CallbackFields, Locale, PaymentError, PaymentGateway, PaymentMethod, PaymentOutcome,
    PaymentRedirect, PaymentRequest, PaymentResult, VerificationResult,
};
use tracing::{debug, info, instrument, warn};

/// VNPay redirect gateway
pub struct VnpayGateway {
    config: VnpayConfig,
}

impl VnpayGateway {
    /// Create a new VNPay gateway
    pub fn new(config: VnpayConfig) -> Self {
        Self { config }
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Ok(Self::new(VnpayConfig::from_env()?))
    }

    pub fn config(&self) -> &VnpayConfig {
        &self.config
    }

    /// Build the parameters of a payment URL created at `now`
    pub fn build_params(
        &self,
        request: &PaymentRequest,
        now: DateTime<Utc>,
    ) -> PaymentResult<PaymentUrlParams> {
        let txn_ref = require("vnp_TxnRef", request.transaction_ref())?;
        let ip_addr = require("vnp_IpAddr", request.client_ip())?;

        let amount = request
            .amount()
            .checked_mul(AMOUNT_MULTIPLIER)
            .ok_or_else(|| {
                PaymentError::Validation(format!("amount {} is too large", request.amount()))
            })?;

        let locale = match request.locale() {
            Locale::Vi => "vn",
            Locale::En => "en",
        };

        Ok(PaymentUrlParams {
            version: self.config.version.clone(),
            tmn_code: self.config.tmn_code.clone(),
            amount,
            txn_ref: txn_ref.to_string(),
            order_info: request.description().to_string(),
            locale: locale.to_string(),
            return_url: request.return_url().to_string(),
            ip_addr: ip_addr.to_string(),
            create_date: params::format_timestamp(&now),
            expire_date: params::format_timestamp(&(now + self.config.expire_after)),
            bank_code: request
                .bank_code()
                .filter(|code| !code.is_empty())
                .map(String::from),
        })
    }

    /// Signed payment URL, stamped with the current time
    pub fn create_payment_url(&self, request: &PaymentRequest) -> PaymentResult<String> {
        self.create_payment_url_at(request, Utc::now())
    }

    /// Signed payment URL, stamped with `now`
    pub fn create_payment_url_at(
        &self,
        request: &PaymentRequest,
        now: DateTime<Utc>,
    ) -> PaymentResult<String> {
        let params = self.build_params(request, now)?;
        let payload = params.sign(self.config.secret());

        Ok(format!(
            "{}?{}",
            self.config.payment_url,
            payload.to_query_string()
        ))
    }

    /// Check the hash of a return or IPN query and classify the result.
    ///
    /// SUCCESS needs both `vnp_ResponseCode` and `vnp_TransactionStatus` to
    /// be `00`. Otherwise the first non-`00` code is surfaced.
    pub fn verify_return(&self, fields: &CallbackFields) -> VerificationResult {
        let received = match fields.get(SECURE_HASH) {
            Some(hash) if !hash.is_empty() => hash,
            _ => {
                debug!("VNPay callback has no {}", SECURE_HASH);
                return VerificationResult::rejected(fields.clone());
            }
        };

        let expected = params::expected_secure_hash(fields, self.config.secret());
        if !signatures_match(&expected, received) {
            warn!(
                "VNPay callback hash mismatch: txn_ref={:?}",
                fields.get("vnp_TxnRef")
            );
            return VerificationResult::rejected(fields.clone());
        }

        let field = |key: &str| fields.get(key).map(String::as_str).unwrap_or_default();
        let response_code = field("vnp_ResponseCode");
        let transaction_status = field("vnp_TransactionStatus");

        let (outcome, code) = if response_code == CODE_SUCCESS && transaction_status == CODE_SUCCESS
        {
            (PaymentOutcome::Success, response_code)
        } else if response_code != CODE_SUCCESS {
            (PaymentOutcome::Failed, response_code)
        } else {
            (PaymentOutcome::Failed, transaction_status)
        };

        // A wire amount that is not a whole number of VND has no order amount
        let amount = field("vnp_Amount")
            .parse::<u64>()
            .ok()
            .filter(|amount| amount % AMOUNT_MULTIPLIER == 0)
            .map(|amount| amount / AMOUNT_MULTIPLIER);

        let transaction_no = Some(field("vnp_TransactionNo"))
            .filter(|no| !no.is_empty())
            .map(String::from);

        VerificationResult::authentic(
            outcome,
            field("vnp_TxnRef"),
            transaction_no,
            amount,
            code,
            fields.clone(),
        )
    }
}

#[async_trait]
impl PaymentGateway for VnpayGateway {
    #[instrument(skip(self, request), fields(amount = request.amount()))]
    async fn create_payment(&self, request: &PaymentRequest) -> PaymentResult<PaymentRedirect> {
        let now = Utc::now();
        let pay_url = self.create_payment_url_at(request, now)?;
        let transaction_ref = require("vnp_TxnRef", request.transaction_ref())?.to_string();

        info!("Created VNPay payment URL: txn_ref={}", transaction_ref);

        Ok(PaymentRedirect {
            transaction_ref,
            provider: PaymentMethod::Vnpay,
            pay_url,
            expires_at: Some(now + self.config.expire_after),
            raw_response: None,
        })
    }

    fn verify_callback(&self, fields: &CallbackFields) -> VerificationResult {
        self.verify_return(fields)
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Vnpay
    }
}
