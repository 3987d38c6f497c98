//! # VNPay IPN
//!
//! VNPay calls the merchant's IPN URL with the same signed query as the
//! return redirect and keeps retrying until it gets `RspCode` `00` or `02`.

use pay_core::{Disposition, Settlement};
use serde::{Deserialize, Serialize};

/// JSON body VNPay expects back from the IPN URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,

    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnResponse {
    fn new(rsp_code: &str, message: &str) -> Self {
        Self {
            rsp_code: rsp_code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn confirmed() -> Self {
        Self::new("00", "Confirm Success")
    }

    pub fn order_not_found() -> Self {
        Self::new("01", "Order not found")
    }

    pub fn already_confirmed() -> Self {
        Self::new("02", "Order already confirmed")
    }

    pub fn invalid_amount() -> Self {
        Self::new("04", "Invalid amount")
    }

    pub fn invalid_signature() -> Self {
        Self::new("97", "Invalid signature")
    }

    pub fn unknown_error() -> Self {
        Self::new("99", "Unknown error")
    }

    /// Answer for a settled IPN.
    ///
    /// An order that was already SUCCESS or FAILED before this delivery is
    /// reported as already confirmed so VNPay stops retrying. The delivery
    /// still reached the [`OrderStatusUpdater`](pay_core::OrderStatusUpdater),
    /// which must keep that final status.
    pub fn from_settlement(settlement: &Settlement) -> Self {
        match &settlement.disposition {
            Disposition::Unverified => Self::invalid_signature(),
            Disposition::UnknownOrder => Self::order_not_found(),
            Disposition::AmountMismatch { .. } => Self::invalid_amount(),
            Disposition::Applied => match settlement.previous_status {
                Some(previous) if previous.is_final() => Self::already_confirmed(),
                _ => Self::confirmed(),
            },
        }
    }

    /// Whether VNPay will stop retrying after this answer
    pub fn is_acknowledged(&self) -> bool {
        self.rsp_code == "00" || self.rsp_code == "02"
    }
}
