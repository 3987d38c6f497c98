//! # Request Handlers
//!
//! Axum request handlers for the payment API.
//! Return handlers redirect the browser to a generic result page; IPN
//! handlers answer each gateway in the format it expects.

use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect},
    Json,
};
use pay_core::{
    CallbackFields, CreatePayment, Locale, PaymentError, PaymentMethod, PaymentOrchestrator,
    Settlement,
};
use pay_momo::ipn::{acknowledgement_status, fields_from_json};
use pay_vnpay::IpnResponse;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create payment request
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Payment method ("momo" or "vnpay")
    pub method: String,
    /// Amount in VND
    pub amount: u64,
    /// Shown to the customer on the gateway page
    pub description: String,
    /// Order reference (optional for MoMo, required for VNPay)
    #[serde(default)]
    pub transaction_ref: Option<String>,
    #[serde(default)]
    pub locale: Option<Locale>,
    /// VNPay bank to preselect
    #[serde(default)]
    pub bank_code: Option<String>,
    /// Passed through to MoMo as `extraData`
    #[serde(default)]
    pub extra_data: Option<serde_json::Value>,
}

/// Create payment response
#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub transaction_ref: String,
    pub provider: PaymentMethod,
    /// Redirect user here
    pub pay_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Customer IP: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    fn from_headers(headers: &HeaderMap) -> Option<String> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(',').next().unwrap_or_default().trim().to_string())
                .filter(|v| !v.is_empty())
        };

        header("x-forwarded-for").or_else(|| header("x-real-ip"))
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = Self::from_headers(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Ok(Self(ip))
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront-pay",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.orchestrator.methods(),
    }))
}

/// Start a payment and return the gateway URL
#[instrument(skip(state, request), fields(method = %request.method, amount = request.amount))]
pub async fn create_payment(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>, (StatusCode, Json<ErrorResponse>)> {
    let method: PaymentMethod = request.method.parse().map_err(payment_error_to_response)?;

    if let Some(transaction_ref) = &request.transaction_ref {
        if let Some(status) = state.orders.status(transaction_ref).await {
            if status.is_final() {
                warn!("Refusing to restart settled order {} ({})", transaction_ref, status);
                return Err((
                    StatusCode::CONFLICT,
                    Json(ErrorResponse::new(
                        format!("Order {} is already {}", transaction_ref, status),
                        StatusCode::CONFLICT.as_u16(),
                    )),
                ));
            }
        }
    }

    let mut command = CreatePayment::new(request.amount, request.description, method)
        .with_locale(request.locale.unwrap_or_default());
    command.transaction_ref = request.transaction_ref;
    command.client_ip = client_ip;
    command.bank_code = request.bank_code;
    command.extra_data = request.extra_data;

    let redirect = state
        .orchestrator
        .create_payment(command)
        .await
        .map_err(|e| {
            error!("Failed to create payment: {}", e);
            payment_error_to_response(e)
        })?;

    if !state
        .orders
        .register(redirect.transaction_ref.clone(), request.amount)
        .await
    {
        warn!(
            "Order {} already registered; keeping stored amount",
            redirect.transaction_ref
        );
    }

    info!(
        "Created payment: provider={}, ref={}",
        redirect.provider, redirect.transaction_ref
    );

    Ok(Json(CreatePaymentResponse {
        transaction_ref: redirect.transaction_ref,
        provider: redirect.provider,
        pay_url: redirect.pay_url,
        expires_at: redirect.expires_at.map(|t| t.to_rfc3339()),
    }))
}

/// Verify a browser return and send the customer to the result page
async fn settle_return(
    orchestrator: &PaymentOrchestrator,
    fields: &CallbackFields,
    method: PaymentMethod,
) -> Redirect {
    let urls = orchestrator.urls();

    match orchestrator.verify_and_settle(fields, method).await {
        Ok(settlement) if settlement.is_success() => Redirect::to(&urls.success_url()),
        Ok(settlement) => {
            info!(
                "{} return not successful: ref={:?}, status={}, code={:?}",
                method,
                settlement.transaction_ref,
                settlement.status,
                settlement.verification.response_code()
            );
            Redirect::to(&urls.failure_url())
        }
        Err(e) => {
            error!("Failed to settle {} return: {}", method, e);
            Redirect::to(&urls.failure_url())
        }
    }
}

/// MoMo browser redirect
#[instrument(skip(state, fields))]
pub async fn momo_return(
    State(state): State<AppState>,
    Query(fields): Query<CallbackFields>,
) -> Redirect {
    settle_return(&state.orchestrator, &fields, PaymentMethod::Momo).await
}

/// MoMo IPN: JSON body, answered with 204 once recorded
#[instrument(skip(state, body))]
pub async fn momo_ipn(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let fields = fields_from_json(&body);

    let settlement = state
        .orchestrator
        .verify_and_settle(&fields, PaymentMethod::Momo)
        .await
        .map_err(|e| {
            error!("MoMo IPN settlement failed: {}", e);
            payment_error_to_response(e)
        })?;

    log_ipn(PaymentMethod::Momo, &settlement);

    Ok(StatusCode::from_u16(acknowledgement_status(&settlement))
        .unwrap_or(StatusCode::NO_CONTENT))
}

/// VNPay browser redirect
#[instrument(skip(state, fields))]
pub async fn vnpay_return(
    State(state): State<AppState>,
    Query(fields): Query<CallbackFields>,
) -> Redirect {
    settle_return(&state.orchestrator, &fields, PaymentMethod::Vnpay).await
}

/// VNPay IPN: signed query, answered with `{RspCode, Message}`
#[instrument(skip(state, fields))]
pub async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(fields): Query<CallbackFields>,
) -> Json<IpnResponse> {
    let response = match state
        .orchestrator
        .verify_and_settle(&fields, PaymentMethod::Vnpay)
        .await
    {
        Ok(settlement) => {
            log_ipn(PaymentMethod::Vnpay, &settlement);
            IpnResponse::from_settlement(&settlement)
        }
        Err(e) => {
            error!("VNPay IPN settlement failed: {}", e);
            IpnResponse::unknown_error()
        }
    };

    Json(response)
}

fn log_ipn(method: PaymentMethod, settlement: &Settlement) {
    if settlement.verification.is_authentic() {
        info!(
            "{} IPN: ref={:?}, status={}, disposition={:?}",
            method, settlement.transaction_ref, settlement.status, settlement.disposition
        );
    } else {
        warn!("{} IPN rejected: signature did not verify", method);
    }
}

/// Checkout success page
pub async fn checkout_success() -> impl IntoResponse {
    Html(result_page("✅", "Payment Successful!", "Your payment was processed successfully."))
}

/// Checkout failure page
pub async fn checkout_failure() -> impl IntoResponse {
    Html(result_page("❌", "Payment Failed", "The payment was not completed. No charges were made."))
}

fn result_page(icon: &str, title: &str, message: &str) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<head><title>{title}</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <div style="font-size: 60px;">{icon}</div>
        <h1>{title}</h1>
        <p style="color: #666;">{message}</p>
    </div>
</body>
</html>
"#
    )
}
