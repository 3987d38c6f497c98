//! # pay-api
//!
//! HTTP API layer for the storefront payment gateways.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoint for starting payments
//! - Return and IPN handlers for MoMo and VNPay
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/payments` | Start a payment |
//! | GET | `/payments/momo/return` | MoMo browser return |
//! | POST | `/webhook/momo` | MoMo IPN |
//! | GET | `/payments/vnpay/return` | VNPay browser return |
//! | GET | `/webhook/vnpay` | VNPay IPN |
//! | GET | `/checkout/success` | Success page |
//! | GET | `/checkout/failure` | Failure page |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
