//! # pay-core
//!
//! Core types and traits for the storefront payment gateways.
//!
//! This crate provides:
//! - `signer`: canonicalization and HMAC signing shared by the adapters
//! - `PaymentGateway` trait for implementing payment providers
//! - `PaymentRequest`, `PaymentRedirect` and `VerificationResult`
//! - `PaymentOrchestrator` for dispatch and settlement
//! - `OrderStatusUpdater` / `OrderLookup` ports to the order store
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{CreatePayment, PaymentMethod, PaymentOrchestrator};
//!
//! // Start a payment
//! let redirect = orchestrator
//!     .create_payment(CreatePayment::new(150_000, "Order #42", PaymentMethod::Vnpay)
//!         .with_transaction_ref("42")
//!         .with_client_ip("203.0.113.7"))
//!     .await?;
//!
//! // Redirect user to redirect.pay_url, then on the way back:
//! let settlement = orchestrator.verify_and_settle(&query, PaymentMethod::Vnpay).await?;
//! ```

pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod order_status;
pub mod payment;
pub mod signer;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use gateway::{BoxedPaymentGateway, CallbackUrls, GatewaySelector, PaymentGateway};
pub use orchestrator::{CreatePayment, Disposition, PaymentOrchestrator, Settlement};
pub use order_status::{
    InMemoryOrderStore, OrderLookup, OrderSnapshot, OrderStatus, OrderStatusUpdater,
};
pub use payment::{
    CallbackFields, Locale, PaymentMethod, PaymentOutcome, PaymentRedirect, PaymentRequest,
    PaymentRequestBuilder, VerificationResult,
};
pub use signer::{DigestAlgorithm, Encoding, SignedPayload};
