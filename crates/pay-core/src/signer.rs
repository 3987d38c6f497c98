//! # Canonical Signer
//!
//! Deterministic field canonicalization and keyed hashing shared by the
//! provider adapters.
//!
//! The adapter decides the field order (fixed protocol list or sorted keys);
//! this module only joins, encodes and hashes. Two encodings exist:
//!
//! - [`Encoding::Verbatim`]: raw values, `key=value&key=value`
//! - [`Encoding::FormPlus`]: percent-encoding of everything outside
//!   `A-Z a-z 0-9 - _ . ~`, with space written as `+`. Unlike a generic
//!   URL encoder this also escapes `!`, `'`, `(`, `)` and `*`.

use crate::error::{PaymentError, PaymentResult};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

/// Characters left untouched by the form-plus encoding
const FORM_PLUS: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// How keys and values are written into the canonical string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Values inserted as-is
    Verbatim,
    /// Bespoke percent-encoding with `+` for spaces
    FormPlus,
}

/// Digest used for the keyed hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Length of the lowercase hex digest
    pub fn hex_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 64,
            DigestAlgorithm::Sha512 => 128,
        }
    }
}

/// Encode a single component with the form-plus rules
pub fn encode_form_component(input: &str) -> String {
    utf8_percent_encode(input, FORM_PLUS)
        .to_string()
        .replace("%20", "+")
}

/// Join `key=value` pairs with `&` in the order given.
pub fn canonicalize<K, V>(fields: &[(K, V)], encoding: Encoding) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fields
        .iter()
        .map(|(key, value)| match encoding {
            Encoding::Verbatim => format!("{}={}", key.as_ref(), value.as_ref()),
            Encoding::FormPlus => format!(
                "{}={}",
                encode_form_component(key.as_ref()),
                encode_form_component(value.as_ref())
            ),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC over the UTF-8 bytes of `message`, lowercase hex encoded
pub fn hmac_hex(secret: &str, message: &str, algorithm: DigestAlgorithm) -> String {
    match algorithm {
        DigestAlgorithm::Sha256 => {
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(message.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        DigestAlgorithm::Sha512 => {
            let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(secret.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(message.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
    }
}

/// Constant-time comparison of two hex signatures
pub fn signatures_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

/// Unwrap a required field or reject the payload before anything is hashed
pub fn require<'a>(name: &str, value: Option<&'a str>) -> PaymentResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PaymentError::Validation(format!(
            "missing required field: {}",
            name
        ))),
    }
}

/// An ordered field list with its signature appended last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    fields: Vec<(String, String)>,
    canonical: String,
    signature_field: &'static str,
    signature: String,
}

impl SignedPayload {
    /// Canonicalize `fields` in the given order and sign the result
    pub fn sign<K, V>(
        fields: &[(K, V)],
        encoding: Encoding,
        secret: &str,
        algorithm: DigestAlgorithm,
        signature_field: &'static str,
    ) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let canonical = canonicalize(fields, encoding);
        let signature = hmac_hex(secret, &canonical, algorithm);
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
                .collect(),
            canonical,
            signature_field,
            signature,
        }
    }

    /// The string that was hashed
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Lowercase hex signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// All fields followed by the signature field
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once((
                self.signature_field,
                self.signature.as_str(),
            )))
    }

    /// Canonical string with the signature appended as a query parameter.
    ///
    /// Only meaningful for [`Encoding::FormPlus`] payloads, whose canonical
    /// form is already a valid query string.
    pub fn to_query_string(&self) -> String {
        format!(
            "{}&{}={}",
            self.canonical, self.signature_field, self.signature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_plus_golden_value() {
        let encoded = encode_form_component("Don't (test)! a*b c");
        assert_eq!(encoded, "Don%27t+%28test%29%21+a%2Ab+c");
    }

    /// What a generic URL component encoder leaves alone
    const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'!')
        .remove(b'~')
        .remove(b'*')
        .remove(b'\'')
        .remove(b'(')
        .remove(b')');

    #[test]
    fn test_form_plus_differs_from_generic_encoding() {
        // The generic encoder leaves !'()* alone and writes %20.
        let generic = utf8_percent_encode("Don't (test)! a*b c", URI_COMPONENT).to_string();

        assert_eq!(generic, "Don't%20(test)!%20a*b%20c");
        assert_ne!(generic, encode_form_component("Don't (test)! a*b c"));
    }

    #[test]
    fn test_form_plus_unreserved_and_utf8() {
        assert_eq!(encode_form_component("A-z_0.9~"), "A-z_0.9~");
        assert_eq!(
            encode_form_component("https://shop.vn/return?x=1"),
            "https%3A%2F%2Fshop.vn%2Freturn%3Fx%3D1"
        );
        assert_eq!(encode_form_component("Thanh toán"), "Thanh+to%C3%A1n");
        assert_eq!(encode_form_component("100%"), "100%25");
    }

    #[test]
    fn test_canonicalize_keeps_caller_order() {
        let fields = [("b", "2"), ("a", "1 1")];
        assert_eq!(canonicalize(&fields, Encoding::Verbatim), "b=2&a=1 1");
        assert_eq!(canonicalize(&fields, Encoding::FormPlus), "b=2&a=1+1");
    }

    #[test]
    fn test_hmac_known_vectors() {
        // RFC 4231 test case 2
        let sha256 = hmac_hex("Jefe", "what do ya want for nothing?", DigestAlgorithm::Sha256);
        assert_eq!(
            sha256,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );

        let sha512 = hmac_hex("Jefe", "what do ya want for nothing?", DigestAlgorithm::Sha512);
        assert_eq!(
            sha512,
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
        assert_eq!(sha512.len(), DigestAlgorithm::Sha512.hex_len());
    }

    #[test]
    fn test_signatures_match() {
        assert!(signatures_match("abc123", "abc123"));
        assert!(!signatures_match("abc123", "abc124"));
        assert!(!signatures_match("abc", "abcd"));
        assert!(!signatures_match("abc", ""));
    }

    #[test]
    fn test_require_rejects_absent_and_empty() {
        assert_eq!(require("amount", Some("10")).unwrap(), "10");
        assert!(matches!(
            require("amount", None),
            Err(PaymentError::Validation(_))
        ));
        assert!(require("amount", Some("")).is_err());
    }

    #[test]
    fn test_signed_payload_signature_last() {
        let payload = SignedPayload::sign(
            &[("a", "1"), ("b", "x y")],
            Encoding::FormPlus,
            "secret",
            DigestAlgorithm::Sha512,
            "sig",
        );

        let pairs: Vec<_> = payload.pairs().collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].0, "sig");
        assert_eq!(pairs[2].1, payload.signature());
        assert_eq!(payload.canonical(), "a=1&b=x+y");
        assert_eq!(
            payload.to_query_string(),
            format!("a=1&b=x+y&sig={}", payload.signature())
        );

    }
}
