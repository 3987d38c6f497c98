//! # VNPay Parameters
//!
//! VNPay signs the query string itself: every `vnp_*` parameter, sorted by
//! key, form-encoded, joined with `&`, then HMAC-SHA512. The hash travels as
//! one more parameter, `vnp_SecureHash`.

use chrono::{DateTime, TimeZone};
use chrono_tz::Asia::Ho_Chi_Minh;
use chrono_tz::Tz;
use pay_core::signer::{self, DigestAlgorithm, Encoding, SignedPayload};
use pay_core::CallbackFields;

/// Prefix of every parameter VNPay signs
pub const FIELD_PREFIX: &str = "vnp_";

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

pub const COMMAND_PAY: &str = "pay";
pub const CURRENCY_VND: &str = "VND";
pub const ORDER_TYPE_OTHER: &str = "other";

/// `vnp_ResponseCode` / `vnp_TransactionStatus` of a completed payment
pub const CODE_SUCCESS: &str = "00";

/// `vnp_CreateDate` / `vnp_ExpireDate` layout
pub const DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// VNPay multiplies amounts by 100 on the wire
pub const AMOUNT_MULTIPLIER: u64 = 100;

/// Render an instant in Vietnam local time, whatever the server's zone
pub fn format_timestamp<Z: TimeZone>(at: &DateTime<Z>) -> String {
    at.with_timezone(&Ho_Chi_Minh)
        .format(DATE_FORMAT)
        .to_string()
}

/// Parse a `vnp_*Date` value back into an instant
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Tz>> {
    let naive = chrono::NaiveDateTime::parse_from_str(raw, DATE_FORMAT).ok()?;
    Ho_Chi_Minh.from_local_datetime(&naive).single()
}

/// Parameters of a payment URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUrlParams {
    pub version: String,
    pub tmn_code: String,
    /// Already multiplied by [`AMOUNT_MULTIPLIER`]
    pub amount: u64,
    pub txn_ref: String,
    pub order_info: String,
    pub locale: String,
    pub return_url: String,
    pub ip_addr: String,
    pub create_date: String,
    pub expire_date: String,
    pub bank_code: Option<String>,
}

impl PaymentUrlParams {
    /// All non-empty parameters in key order
    pub fn signing_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("vnp_Version", self.version.clone()),
            ("vnp_Command", COMMAND_PAY.to_string()),
            ("vnp_TmnCode", self.tmn_code.clone()),
            ("vnp_Amount", self.amount.to_string()),
            ("vnp_CurrCode", CURRENCY_VND.to_string()),
            ("vnp_TxnRef", self.txn_ref.clone()),
            ("vnp_OrderInfo", self.order_info.clone()),
            ("vnp_OrderType", ORDER_TYPE_OTHER.to_string()),
            ("vnp_Locale", self.locale.clone()),
            ("vnp_ReturnUrl", self.return_url.clone()),
            ("vnp_IpAddr", self.ip_addr.clone()),
            ("vnp_CreateDate", self.create_date.clone()),
            ("vnp_ExpireDate", self.expire_date.clone()),
        ];
        if let Some(bank_code) = &self.bank_code {
            fields.push(("vnp_BankCode", bank_code.clone()));
        }
        // Callbacks are hashed without empty values; the URL must match
        fields.retain(|(_, value)| !value.is_empty());
        sort_by_name(&mut fields);
        fields
    }

    /// Sign the sorted parameters
    pub fn sign(&self, secret: &str) -> SignedPayload {
        SignedPayload::sign(
            &self.signing_fields(),
            Encoding::FormPlus,
            secret,
            DigestAlgorithm::Sha512,
            SECURE_HASH,
        )
    }
}

/// The `vnp_*` fields of a return or IPN query that the hash covers.
///
/// Skips the hash fields themselves and, as VNPay does, empty values.
pub fn signed_callback_fields(fields: &CallbackFields) -> Vec<(&str, &str)> {
    let mut signed: Vec<(&str, &str)> = fields
        .iter()
        .filter(|(key, value)| {
            key.starts_with(FIELD_PREFIX)
                && key.as_str() != SECURE_HASH
                && key.as_str() != SECURE_HASH_TYPE
                && !value.is_empty()
        })
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    sort_by_name(&mut signed);
    signed
}

/// Hash a callback should carry
pub fn expected_secure_hash(fields: &CallbackFields, secret: &str) -> String {
    let canonical = signer::canonicalize(&signed_callback_fields(fields), Encoding::FormPlus);
    signer::hmac_hex(secret, &canonical, DigestAlgorithm::Sha512)
}

fn sort_by_name<K: AsRef<str>, V>(fields: &mut [(K, V)]) {
    fields.sort_by(|(a, _), (b, _)| a.as_ref().as_bytes().cmp(b.as_ref().as_bytes()));
}
