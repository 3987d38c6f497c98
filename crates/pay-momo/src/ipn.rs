//! # MoMo IPN
//!
//! MoMo posts the payment result to the partner's `ipnUrl` as a JSON body and
//! expects `204 No Content` once the partner has taken note of it.

use pay_core::{CallbackFields, Disposition, Settlement};
use serde_json::Value;

/// Flatten an IPN JSON body into the same mapping a redirect query produces.
///
/// Numbers become their decimal text, so `"amount": 50000` signs as
/// `amount=50000` exactly like the query string form. Nested values are
/// ignored; MoMo does not send any in signed positions.
pub fn fields_from_json(body: &Value) -> CallbackFields {
    let Some(obj) = body.as_object() else {
        return CallbackFields::new();
    };

    obj.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key.clone(), text))
        })
        .collect()
}

/// HTTP status to answer an IPN with
pub fn acknowledgement_status(settlement: &Settlement) -> u16 {
    match settlement.disposition {
        Disposition::Unverified => 400,
        Disposition::Applied | Disposition::UnknownOrder | Disposition::AmountMismatch { .. } => {
            204
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fields_from_json() {
        let body = json!({
            "partnerCode": "MOMO",
            "amount": 50000,
            "resultCode": 0,
            "transId": 4088878653u64,
            "extraData": "",
            "payType": null,
            "nested": {"ignored": true}
        });

        let fields = fields_from_json(&body);

        assert_eq!(fields.get("amount").unwrap(), "50000");
        assert_eq!(fields.get("resultCode").unwrap(), "0");
        assert_eq!(fields.get("transId").unwrap(), "4088878653");
        assert_eq!(fields.get("extraData").unwrap(), "");
        assert_eq!(fields.get("payType").unwrap(), "");
        assert!(!fields.contains_key("nested"));
    }

    #[test]
    fn test_fields_from_non_object() {
        assert!(fields_from_json(&json!([1, 2, 3])).is_empty());
        assert!(fields_from_json(&json!("text")).is_empty());
    }
}
