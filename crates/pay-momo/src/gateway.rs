//! # MoMo Gateway
//!
//! Creates wallet payments through MoMo's create API and verifies the result
//! callbacks MoMo sends back (browser redirect and IPN carry the same fields).

use crate::config::MomoConfig;
use crate::signature::{
    CreatePaymentBody, MomoCallback, REQUEST_TYPE, RESULT_IN_PROGRESS, RESULT_SUCCESS,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use pay_core::{
    CallbackFields, PaymentError, PaymentGateway, PaymentMethod, PaymentOutcome, PaymentRedirect,
    PaymentRequest, PaymentResult, VerificationResult,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "momo";

/// MoMo wallet gateway
pub struct MomoGateway {
    config: MomoConfig,
    client: Client,
}

impl MomoGateway {
    /// Create a new MoMo gateway
    pub fn new(config: MomoConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(MomoConfig::from_env()?)
    }

    pub fn config(&self) -> &MomoConfig {
        &self.config
    }

    /// Partner code followed by the current unix time in milliseconds.
    ///
    /// MoMo rejects a reused order id, so every attempt without a caller
    /// supplied ref gets a new one.
    fn generate_transaction_ref(&self) -> String {
        format!("{}{}", self.config.partner_code, Utc::now().timestamp_millis())
    }

    /// Build the signed create-payment body
    pub fn build_create_body(&self, request: &PaymentRequest) -> PaymentResult<CreatePaymentBody> {
        let ipn_url = pay_core::signer::require("ipnUrl", request.notify_url())?;

        let transaction_ref = request
            .transaction_ref()
            .map(String::from)
            .unwrap_or_else(|| self.generate_transaction_ref());

        let extra_data = match request.extra_data() {
            Some(data) => STANDARD.encode(
                serde_json::to_string(data)
                    .map_err(|e| PaymentError::Serialization(e.to_string()))?,
            ),
            None => String::new(),
        };

        let mut body = CreatePaymentBody {
            partner_code: self.config.partner_code.clone(),
            access_key: self.config.access_key.clone(),
            request_id: transaction_ref.clone(),
            amount: request.amount(),
            order_id: transaction_ref,
            order_info: request.description().to_string(),
            redirect_url: request.return_url().to_string(),
            ipn_url: ipn_url.to_string(),
            extra_data,
            request_type: REQUEST_TYPE.to_string(),
            lang: request.locale().as_str().to_string(),
            signature: String::new(),
        };

        body.sign(self.config.secret());
        body.verify_serialized(self.config.secret())?;

        Ok(body)
    }

    /// Map a verified result code to a payment outcome
    fn classify(result_code: Option<i64>) -> PaymentOutcome {
        match result_code {
            Some(RESULT_SUCCESS) => PaymentOutcome::Success,
            Some(code) if RESULT_IN_PROGRESS.contains(&code) => PaymentOutcome::Pending,
            _ => PaymentOutcome::Failed,
        }
    }
}

#[async_trait]
impl PaymentGateway for MomoGateway {
    #[instrument(skip(self, request), fields(amount = request.amount()))]
    async fn create_payment(&self, request: &PaymentRequest) -> PaymentResult<PaymentRedirect> {
        let body = self.build_create_body(request)?;

        debug!(
            "Creating MoMo payment: order_id={}, request_type={}",
            body.order_id, body.request_type
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::gateway(
                        PROVIDER,
                        None,
                        format!(
                            "request timed out after {}s",
                            self.config.request_timeout.as_secs_f32()
                        ),
                    )
                } else {
                    PaymentError::gateway(PROVIDER, None, e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::gateway(PROVIDER, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            error!("MoMo API error: status={}, body={}", status, text);
            return Err(PaymentError::gateway(PROVIDER, Some(status.as_u16()), text));
        }

        let raw: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse MoMo response: {}", e))
        })?;
        let created: MomoCreateResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse MoMo response: {}", e))
        })?;

        if created.result_code != RESULT_SUCCESS {
            error!(
                "MoMo rejected payment: order_id={}, resultCode={}, message={}",
                body.order_id, created.result_code, created.message
            );
            return Err(PaymentError::gateway(
                PROVIDER,
                Some(status.as_u16()),
                format!("resultCode {}: {}", created.result_code, created.message),
            ));
        }

        let pay_url = created.pay_url.filter(|u| !u.is_empty()).ok_or_else(|| {
            PaymentError::gateway(PROVIDER, Some(status.as_u16()), "response has no payUrl")
        })?;

        info!("Created MoMo payment: order_id={}", body.order_id);

        Ok(PaymentRedirect {
            transaction_ref: body.order_id,
            provider: PaymentMethod::Momo,
            pay_url,
            expires_at: None,
            raw_response: Some(raw),
        })
    }

    fn verify_callback(&self, fields: &CallbackFields) -> VerificationResult {
        let Some(callback) = MomoCallback::from_fields(fields) else {
            debug!("MoMo callback is missing signed fields");
            return VerificationResult::rejected(fields.clone());
        };

        if !callback.has_valid_signature(&self.config.access_key, self.config.secret()) {
            warn!("MoMo callback signature mismatch: order_id={}", callback.order_id);
            return VerificationResult::rejected(fields.clone());
        }

        let outcome = Self::classify(callback.result_code());

        VerificationResult::authentic(
            outcome,
            callback.order_id,
            Some(callback.trans_id),
            callback.amount.trim().parse().ok(),
            callback.result_code,
            fields.clone(),
        )
    }

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Momo
    }

    fn requires_notify_url(&self) -> bool {
        true
    }
}

// =============================================================================
// MoMo API Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MomoCreateResponse {
    result_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    pay_url: Option<String>,
}
