//! # MoMo Signatures
//!
//! Typed field sets for the create-payment request and the payment result
//! callback. MoMo signs raw values in a fixed key order (alphabetical in the
//! protocol documents, but the order is the protocol, not a sort), so each
//! set exposes its signing list explicitly.

use crate::ipn::fields_from_json;
use pay_core::signer::{self, DigestAlgorithm, Encoding, SignedPayload};
use pay_core::{CallbackFields, PaymentError, PaymentResult};
use serde::Serialize;

/// Only request type this adapter creates
pub const REQUEST_TYPE: &str = "captureWallet";

/// Name of the signature field in requests and callbacks
pub const SIGNATURE_FIELD: &str = "signature";

/// Result code for a captured payment
pub const RESULT_SUCCESS: i64 = 0;

/// Result codes for payments that are still being processed
pub const RESULT_IN_PROGRESS: &[i64] = &[1000, 7000, 7002];

/// Body of the create-payment request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub partner_code: String,
    pub access_key: String,
    pub request_id: String,
    pub amount: u64,
    pub order_id: String,
    pub order_info: String,
    pub redirect_url: String,
    pub ipn_url: String,
    pub extra_data: String,
    pub request_type: String,
    pub lang: String,
    pub signature: String,
}

impl CreatePaymentBody {
    /// Fields in the order MoMo hashes them
    pub fn signing_fields(&self) -> [(&'static str, String); 10] {
        [
            ("accessKey", self.access_key.clone()),
            ("amount", self.amount.to_string()),
            ("extraData", self.extra_data.clone()),
            ("ipnUrl", self.ipn_url.clone()),
            ("orderId", self.order_id.clone()),
            ("orderInfo", self.order_info.clone()),
            ("partnerCode", self.partner_code.clone()),
            ("redirectUrl", self.redirect_url.clone()),
            ("requestId", self.request_id.clone()),
            ("requestType", self.request_type.clone()),
        ]
    }

    /// Compute and store the signature
    pub fn sign(&mut self, secret: &str) -> SignedPayload {
        let payload = SignedPayload::sign(
            &self.signing_fields(),
            Encoding::Verbatim,
            secret,
            DigestAlgorithm::Sha256,
            SIGNATURE_FIELD,
        );
        self.signature = payload.signature().to_string();
        payload
    }

    /// Check the signature against the JSON this body serializes to.
    ///
    /// Fails when a wire name or value no longer matches the signing list.
    pub fn verify_serialized(&self, secret: &str) -> PaymentResult<()> {
        let wire =
            serde_json::to_value(self).map_err(|e| PaymentError::Serialization(e.to_string()))?;
        let fields = fields_from_json(&wire);

        let signed: Vec<(&str, &str)> = self
            .signing_fields()
            .iter()
            .map(|(key, _)| (*key, fields.get(*key).map(String::as_str).unwrap_or_default()))
            .collect();
        let canonical = signer::canonicalize(&signed, Encoding::Verbatim);
        let expected = signer::hmac_hex(secret, &canonical, DigestAlgorithm::Sha256);

        match fields.get(SIGNATURE_FIELD) {
            Some(received) if signer::signatures_match(&expected, received) => Ok(()),
            _ => Err(PaymentError::SignatureMismatch {
                provider: "momo".to_string(),
            }),
        }
    }
}

/// A payment result callback (redirect query or IPN body)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MomoCallback {
    pub partner_code: String,
    pub order_id: String,
    pub request_id: String,
    pub amount: String,
    pub order_info: String,
    pub order_type: String,
    pub trans_id: String,
    pub result_code: String,
    pub message: String,
    pub pay_type: String,
    pub response_time: String,
    pub extra_data: String,
    pub signature: String,
}

impl MomoCallback {
    /// Pull the signed fields out of a flat mapping.
    ///
    /// Returns `None` when any field is absent. `extraData` and `payType` may
    /// be empty strings but must be present.
    pub fn from_fields(fields: &CallbackFields) -> Option<Self> {
        let get = |key: &str| fields.get(key).cloned();

        Some(Self {
            partner_code: get("partnerCode")?,
            order_id: get("orderId")?,
            request_id: get("requestId")?,
            amount: get("amount")?,
            order_info: get("orderInfo")?,
            order_type: get("orderType")?,
            trans_id: get("transId")?,
            result_code: get("resultCode")?,
            message: get("message")?,
            pay_type: get("payType")?,
            response_time: get("responseTime")?,
            extra_data: get("extraData")?,
            signature: get(SIGNATURE_FIELD)?,
        })
    }

    /// Fields in the order MoMo hashes them. The access key comes from config.
    pub fn signing_fields<'a>(&'a self, access_key: &'a str) -> [(&'static str, &'a str); 13] {
        [
            ("accessKey", access_key),
            ("amount", self.amount.as_str()),
            ("extraData", self.extra_data.as_str()),
            ("message", self.message.as_str()),
            ("orderId", self.order_id.as_str()),
            ("orderInfo", self.order_info.as_str()),
            ("orderType", self.order_type.as_str()),
            ("partnerCode", self.partner_code.as_str()),
            ("payType", self.pay_type.as_str()),
            ("requestId", self.request_id.as_str()),
            ("responseTime", self.response_time.as_str()),
            ("resultCode", self.result_code.as_str()),
            ("transId", self.trans_id.as_str()),
        ]
    }

    /// Signature the callback should carry
    pub fn expected_signature(&self, access_key: &str, secret: &str) -> String {
        let canonical = signer::canonicalize(&self.signing_fields(access_key), Encoding::Verbatim);
        signer::hmac_hex(secret, &canonical, DigestAlgorithm::Sha256)
    }

    /// Constant-time check of the carried signature
    pub fn has_valid_signature(&self, access_key: &str, secret: &str) -> bool {
        signer::signatures_match(&self.expected_signature(access_key, secret), &self.signature)
    }

    pub fn result_code(&self) -> Option<i64> {
        self.result_code.trim().parse().ok()
    }
}
