//! # Payment Orchestrator
//!
//! Provider-agnostic entry point used by the checkout flow. It picks the
//! gateway for a payment method, fills in the storefront's return and notify
//! URLs, and turns verified callbacks into order status updates.
//!
//! Settlement does not deduplicate. Gateways deliver callbacks at least once
//! and each delivery is verified and handed to the [`OrderStatusUpdater`],
//! which upserts by order id.

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{BoxedPaymentGateway, CallbackUrls, GatewaySelector};
use crate::order_status::{OrderLookup, OrderStatus, OrderStatusUpdater};
use crate::payment::{
    CallbackFields, Locale, PaymentMethod, PaymentOutcome, PaymentRedirect, PaymentRequest,
    VerificationResult,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Checkout's request to start a payment
#[derive(Debug, Clone)]
pub struct CreatePayment {
    /// Order reference; generated by the gateway when absent
    pub transaction_ref: Option<String>,
    /// Amount in minor units
    pub amount: u64,
    pub description: String,
    pub method: PaymentMethod,
    pub locale: Locale,
    pub client_ip: Option<String>,
    pub bank_code: Option<String>,
    pub extra_data: Option<serde_json::Value>,
}

impl CreatePayment {
    pub fn new(amount: u64, description: impl Into<String>, method: PaymentMethod) -> Self {
        Self {
            transaction_ref: None,
            amount,
            description: description.into(),
            method,
            locale: Locale::Vi,
            client_ip: None,
            bank_code: None,
            extra_data: None,
        }
    }

    pub fn with_transaction_ref(mut self, transaction_ref: impl Into<String>) -> Self {
        self.transaction_ref = Some(transaction_ref.into());
        self
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

/// Why a settlement ended the way it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Disposition {
    /// Status written to the order
    Applied,
    /// Signature check failed; no order was touched
    Unverified,
    /// Authentic callback for an order the lookup does not know
    UnknownOrder,
    /// Authentic callback whose amount differs from the stored order
    AmountMismatch { expected: u64, received: Option<u64> },
}

/// Result of [`PaymentOrchestrator::verify_and_settle`]
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    /// Order the callback refers to (only set for authentic callbacks)
    pub transaction_ref: Option<String>,
    pub status: OrderStatus,
    pub disposition: Disposition,
    /// Order status before this delivery, when an order lookup is configured
    pub previous_status: Option<OrderStatus>,
    pub verification: VerificationResult,
}

impl Settlement {
    pub fn is_success(&self) -> bool {
        self.status == OrderStatus::Success
    }
}

/// Dispatches payment creation and callback settlement to the gateways
#[derive(Clone)]
pub struct PaymentOrchestrator {
    gateways: GatewaySelector,
    urls: CallbackUrls,
    updater: Arc<dyn OrderStatusUpdater>,
    lookup: Option<Arc<dyn OrderLookup>>,
}

impl PaymentOrchestrator {
    pub fn new(
        gateways: GatewaySelector,
        urls: CallbackUrls,
        updater: Arc<dyn OrderStatusUpdater>,
    ) -> Self {
        Self {
            gateways,
            urls,
            updater,
            lookup: None,
        }
    }

    /// Cross-check authentic callbacks against stored orders before settling
    pub fn with_order_lookup(mut self, lookup: Arc<dyn OrderLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        self.gateways.methods()
    }

    pub fn urls(&self) -> &CallbackUrls {
        &self.urls
    }

    fn gateway(&self, method: PaymentMethod) -> PaymentResult<&BoxedPaymentGateway> {
        self.gateways
            .get(method)
            .ok_or_else(|| PaymentError::UnsupportedProvider {
                method: method.to_string(),
            })
    }

    /// Start a payment with the gateway for `command.method`
    #[instrument(skip(self, command), fields(method = %command.method, amount = command.amount))]
    pub async fn create_payment(&self, command: CreatePayment) -> PaymentResult<PaymentRedirect> {
        let gateway = self.gateway(command.method)?;

        let mut builder = PaymentRequest::builder(
            command.amount,
            command.description,
            self.urls.return_url(command.method),
        )
        .locale(command.locale);

        if gateway.requires_notify_url() {
            builder = builder.notify_url(self.urls.notify_url(command.method));
        }
        if let Some(transaction_ref) = command.transaction_ref {
            builder = builder.transaction_ref(transaction_ref);
        }
        if let Some(ip) = command.client_ip {
            builder = builder.client_ip(ip);
        }
        if let Some(bank_code) = command.bank_code {
            builder = builder.bank_code(bank_code);
        }
        if let Some(extra) = command.extra_data {
            builder = builder.extra_data(extra);
        }

        let request = builder.build()?;
        let redirect = gateway.create_payment(&request).await?;

        info!(
            "Created {} payment: ref={}",
            redirect.provider, redirect.transaction_ref
        );

        Ok(redirect)
    }

    /// Verify a callback and persist its outcome on the order.
    ///
    /// Verification failures come back as a `Settlement`; only an unknown
    /// method, a failing order lookup or a failing updater produce errors.
    #[instrument(skip(self, callback), fields(method = %method))]
    pub async fn verify_and_settle(
        &self,
        callback: &CallbackFields,
        method: PaymentMethod,
    ) -> PaymentResult<Settlement> {
        let gateway = self.gateway(method)?;
        let verification = gateway.verify_callback(callback);

        if !verification.is_authentic() {
            warn!("Rejected {} callback: signature did not verify", method);
            return Ok(Settlement {
                transaction_ref: None,
                status: OrderStatus::Failed,
                disposition: Disposition::Unverified,
                previous_status: None,
                verification,
            });
        }

        let order_id = verification
            .transaction_ref()
            .ok_or_else(|| {
                PaymentError::Internal("authentic callback without transaction ref".to_string())
            })?
            .to_string();

        let mut status = match verification.outcome() {
            PaymentOutcome::Success => OrderStatus::Success,
            PaymentOutcome::Failed => OrderStatus::Failed,
            PaymentOutcome::Pending => OrderStatus::Pending,
        };
        let mut disposition = Disposition::Applied;
        let mut previous_status = None;

        if let Some(lookup) = &self.lookup {
            let snapshot = lookup
                .find_order(&order_id)
                .await
                .map_err(into_settlement_error)?;

            match snapshot {
                None => {
                    warn!("Authentic {} callback for unknown order {}", method, order_id);
                    return Ok(Settlement {
                        transaction_ref: Some(order_id),
                        status: OrderStatus::Failed,
                        disposition: Disposition::UnknownOrder,
                        previous_status: None,
                        verification,
                    });
                }
                Some(snapshot) => {
                    previous_status = Some(snapshot.status);
                    if verification.amount() != Some(snapshot.amount) {
                        warn!(
                            "Amount mismatch on order {}: expected={}, received={:?}",
                            order_id,
                            snapshot.amount,
                            verification.amount()
                        );
                        status = OrderStatus::Failed;
                        disposition = Disposition::AmountMismatch {
                            expected: snapshot.amount,
                            received: verification.amount(),
                        };
                    }
                }
            }
        }

        self.updater
            .update_status(&order_id, status)
            .await
            .map_err(into_settlement_error)?;

        info!(
            "Settled order {} as {} (code={:?})",
            order_id,
            status,
            verification.response_code()
        );

        Ok(Settlement {
            transaction_ref: Some(order_id),
            status,
            disposition,
            previous_status,
            verification,
        })
    }
}

fn into_settlement_error(err: PaymentError) -> PaymentError {
    match err {
        PaymentError::Settlement(_) => err,
        other => PaymentError::Settlement(other.to_string()),
    }
}
