//! # pay-vnpay
//!
//! VNPay redirect gateway for the storefront payment layer.
//!
//! A VNPay payment is a signed URL on VNPay's payment page. The query string
//! is signed with HMAC-SHA512 over the sorted, form-encoded `vnp_*`
//! parameters; the return redirect and the IPN call carry a query signed the
//! same way.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_vnpay::VnpayGateway;
//! use pay_core::PaymentRequest;
//!
//! let gateway = VnpayGateway::from_env()?;
//!
//! let request = PaymentRequest::builder(100_000, "Order #1", "https://shop.vn/payments/vnpay/return")
//!     .transaction_ref("1")
//!     .client_ip("203.0.113.7")
//!     .build()?;
//!
//! let url = gateway.create_payment_url(&request)?;
//! // Redirect user to url
//! ```
//!
//! ## IPN Handling
//!
//! ```rust,ignore
//! use pay_vnpay::IpnResponse;
//!
//! let response = match orchestrator.verify_and_settle(&query, PaymentMethod::Vnpay).await {
//!     Ok(settlement) => IpnResponse::from_settlement(&settlement),
//!     Err(_) => IpnResponse::unknown_error(),
//! };
//! ```

pub mod config;
pub mod gateway;
pub mod ipn;
pub mod params;

// Re-exports
pub use config::VnpayConfig;
pub use gateway::VnpayGateway;
pub use ipn::IpnResponse;
pub use params::PaymentUrlParams;
