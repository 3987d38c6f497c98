//! # pay-momo
//!
//! MoMo wallet gateway for the storefront payment layer.
//!
//! - **create**: POSTs a signed JSON body to MoMo's create API and returns the
//!   `payUrl` the customer is redirected to
//! - **verify**: recomputes the HMAC-SHA256 of a result callback (redirect
//!   query or IPN body) and classifies the result code
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_momo::MomoGateway;
//! use pay_core::{PaymentGateway, PaymentRequest};
//!
//! let gateway = MomoGateway::from_env()?;
//!
//! let request = PaymentRequest::builder(50_000, "Order #1001", "https://shop.vn/payments/momo/return")
//!     .transaction_ref("1001")
//!     .notify_url("https://shop.vn/webhook/momo")
//!     .build()?;
//!
//! let redirect = gateway.create_payment(&request).await?;
//! // Redirect user to redirect.pay_url
//! ```
//!
//! ## IPN Handling
//!
//! ```rust,ignore
//! use pay_momo::ipn::{acknowledgement_status, fields_from_json};
//!
//! let fields = fields_from_json(&body);
//! let settlement = orchestrator.verify_and_settle(&fields, PaymentMethod::Momo).await?;
//! // Answer MoMo with acknowledgement_status(&settlement)
//! ```

pub mod config;
pub mod gateway;
pub mod ipn;
pub mod signature;

// Re-exports
pub use config::MomoConfig;
pub use gateway::MomoGateway;
pub use ipn::{acknowledgement_status, fields_from_json};
pub use signature::{CreatePaymentBody, MomoCallback};
