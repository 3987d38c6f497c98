//! # Payment Gateway Trait
//!
//! Strategy trait implemented by each provider adapter.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PaymentGateway (trait)                    │
//! │  ├── create_payment()                                       │
//! │  ├── verify_callback()                                      │
//! │  └── method()                                               │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!                  │                   │
//!          ┌───────┴───────┐   ┌───────┴───────┐
//!          │  MomoGateway  │   │ VnpayGateway  │
//!          └───────────────┘   └───────────────┘
//! ```

use crate::error::PaymentResult;
use crate::payment::{CallbackFields, PaymentMethod, PaymentRedirect, PaymentRequest, VerificationResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core trait for payment gateway adapters.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Build and sign the outbound payment and return where to send the customer.
    async fn create_payment(&self, request: &PaymentRequest) -> PaymentResult<PaymentRedirect>;

    /// Recompute the signature of an inbound callback and classify its outcome.
    ///
    /// Callbacks are attacker-reachable input, so a bad or incomplete callback
    /// is a normal `VerificationResult`, not an error.
    fn verify_callback(&self, fields: &CallbackFields) -> VerificationResult;

    /// The payment method this gateway serves
    fn method(&self) -> PaymentMethod;

    /// Provider name (for logging and routing)
    fn provider_name(&self) -> &'static str {
        self.method().as_str()
    }

    /// Whether the gateway needs a server-to-server notify URL
    fn requires_notify_url(&self) -> bool {
        false
    }
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Gateway registry keyed by payment method
#[derive(Clone, Default)]
pub struct GatewaySelector {
    gateways: HashMap<PaymentMethod, BoxedPaymentGateway>,
}

impl GatewaySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway, replacing any previous one for the same method
    pub fn register(&mut self, gateway: BoxedPaymentGateway) {
        self.gateways.insert(gateway.method(), gateway);
    }

    /// Register with builder pattern
    pub fn with_gateway(mut self, gateway: BoxedPaymentGateway) -> Self {
        self.register(gateway);
        self
    }

    /// Get the gateway for a method
    pub fn get(&self, method: PaymentMethod) -> Option<&BoxedPaymentGateway> {
        self.gateways.get(&method)
    }

    /// List registered methods
    pub fn methods(&self) -> Vec<PaymentMethod> {
        let mut methods: Vec<_> = self.gateways.keys().copied().collect();
        methods.sort_by_key(|m| m.as_str());
        methods
    }

    pub fn has_method(&self, method: PaymentMethod) -> bool {
        self.gateways.contains_key(&method)
    }
}

/// Return and notify endpoints handed to the gateways
#[derive(Debug, Clone)]
pub struct CallbackUrls {
    /// Public base URL of the storefront (e.g., "https://shop.vn")
    pub base_url: String,
}

impl CallbackUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Where the gateway sends the customer's browser back to
    pub fn return_url(&self, method: PaymentMethod) -> String {
        format!("{}/payments/{}/return", self.base_url, method)
    }

    /// Where the gateway posts its server-to-server notification
    pub fn notify_url(&self, method: PaymentMethod) -> String {
        format!("{}/webhook/{}", self.base_url, method)
    }

    pub fn success_url(&self) -> String {
        format!("{}/checkout/success", self.base_url)
    }

    pub fn failure_url(&self) -> String {
        format!("{}/checkout/failure", self.base_url)
    }
}

impl Default for CallbackUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_urls() {
        let urls = CallbackUrls::new("https://shop.vn/");

        assert_eq!(
            urls.return_url(PaymentMethod::Vnpay),
            "https://shop.vn/payments/vnpay/return"
        );
        assert_eq!(
            urls.notify_url(PaymentMethod::Momo),
            "https://shop.vn/webhook/momo"
        );
        assert_eq!(urls.failure_url(), "https://shop.vn/checkout/failure");
    }

    #[test]
    fn test_empty_selector() {
        let selector = GatewaySelector::new();

        assert!(selector.methods().is_empty());
        assert!(selector.get(PaymentMethod::Momo).is_none());
        assert!(!selector.has_method(PaymentMethod::Vnpay));
    }
}
