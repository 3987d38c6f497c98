//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - API:
///   - POST /api/v1/payments - Start a payment, returns the gateway URL
///
/// - Browser returns:
///   - GET /payments/momo/return
///   - GET /payments/vnpay/return
///
/// - Gateway notifications:
///   - POST /webhook/momo - MoMo IPN (JSON body)
///   - GET  /webhook/vnpay - VNPay IPN (signed query)
///
/// - Static pages:
///   - GET /checkout/success - Success page
///   - GET /checkout/failure - Failure page
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let checkout_routes = Router::new()
        .route("/success", get(handlers::checkout_success))
        .route("/failure", get(handlers::checkout_failure));

    let api_routes = Router::new().route("/payments", post(handlers::create_payment));

    let return_routes = Router::new()
        .route("/momo/return", get(handlers::momo_return))
        .route("/vnpay/return", get(handlers::vnpay_return));

    let webhook_routes = Router::new()
        .route("/momo", post(handlers::momo_ipn))
        .route("/vnpay", get(handlers::vnpay_ipn));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/checkout", checkout_routes)
        .nest("/api/v1", api_routes)
        .nest("/payments", return_routes)
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use pay_core::signer::encode_form_component;
    use pay_core::{CallbackFields, GatewaySelector, OrderLookup, OrderStatus};
    use pay_momo::{MomoCallback, MomoConfig, MomoGateway};
    use pay_vnpay::{params, VnpayConfig, VnpayGateway};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const MOMO_ACCESS_KEY: &str = "F8BBA842ECF85";
    const MOMO_SECRET: &str = "K951B6PE1waDMi640xX08PD3vg6EkVlz";
    const VNPAY_SECRET: &str = "abc123";

    fn test_state() -> AppState {
        let gateways = GatewaySelector::new()
            .with_gateway(Arc::new(
                MomoGateway::new(MomoConfig::new("MOMO", MOMO_ACCESS_KEY, MOMO_SECRET)).unwrap(),
            ))
            .with_gateway(Arc::new(VnpayGateway::new(VnpayConfig::new(
                "TEST01",
                VNPAY_SECRET,
            ))));

        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "https://shop.vn".to_string(),
            environment: "test".to_string(),
        };

        AppState::with_gateways(config, gateways)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap()
    }

    /// Return/IPN query for VNPay transaction `txn_ref`, hashed with the test secret
    fn vnpay_query(txn_ref: &str, amount: u64, response_code: &str) -> String {
        let mut fields: CallbackFields = [
            ("vnp_Amount", (amount * 100).to_string()),
            ("vnp_BankCode", "NCB".to_string()),
            ("vnp_OrderInfo", "Thanh toan don hang".to_string()),
            ("vnp_PayDate", "20240101121000".to_string()),
            ("vnp_ResponseCode", response_code.to_string()),
            ("vnp_TmnCode", "TEST01".to_string()),
            ("vnp_TransactionNo", "14226112".to_string()),
            ("vnp_TransactionStatus", response_code.to_string()),
            ("vnp_TxnRef", txn_ref.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let hash = params::expected_secure_hash(&fields, VNPAY_SECRET);
        fields.insert(params::SECURE_HASH.to_string(), hash);

        fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_form_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// MoMo result callback for `order_id`, signed with the test secret
    fn momo_callback(order_id: &str, amount: u64, result_code: i64) -> MomoCallback {
        let mut callback = MomoCallback {
            partner_code: "MOMO".into(),
            order_id: order_id.into(),
            request_id: order_id.into(),
            amount: amount.to_string(),
            order_info: "Order".into(),
            order_type: "momo_wallet".into(),
            trans_id: "4088878653".into(),
            result_code: result_code.to_string(),
            message: "Successful.".into(),
            pay_type: "qr".into(),
            response_time: "1721720663942".into(),
            extra_data: "".into(),
            signature: String::new(),
        };
        callback.signature = callback.expected_signature(MOMO_ACCESS_KEY, MOMO_SECRET);
        callback
    }

    fn momo_ipn_body(callback: &MomoCallback) -> Value {
        json!({
            "partnerCode": callback.partner_code,
            "orderId": callback.order_id,
            "requestId": callback.request_id,
            "amount": callback.amount.parse::<u64>().unwrap(),
            "orderInfo": callback.order_info,
            "orderType": callback.order_type,
            "transId": callback.trans_id.parse::<u64>().unwrap(),
            "resultCode": callback.result_code.parse::<i64>().unwrap(),
            "message": callback.message,
            "payType": callback.pay_type,
            "responseTime": callback.response_time.parse::<u64>().unwrap(),
            "extraData": callback.extra_data,
            "signature": callback.signature,
        })
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state());

        let response = send(&app, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["providers"], json!(["momo", "vnpay"]));
    }

    #[tokio::test]
    async fn test_create_vnpay_payment_registers_order() {
        let state = test_state();
        let app = create_router(state.clone());

        let response = send(
            &app,
            post_json(
                "/api/v1/payments",
                &json!({
                    "method": "vnpay",
                    "amount": 100000,
                    "description": "Thanh toan don hang 1",
                    "transaction_ref": "1"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["transaction_ref"], "1");
        assert_eq!(body["provider"], "vnpay");
        assert!(body["expires_at"].is_string());

        let pay_url = body["pay_url"].as_str().unwrap();
        assert!(pay_url.starts_with(pay_vnpay::config::SANDBOX_PAYMENT_URL));
        assert!(pay_url.contains("vnp_IpAddr=203.0.113.7"));
        assert!(pay_url.contains("vnp_Amount=10000000"));

        assert_eq!(state.orders.status("1").await, Some(OrderStatus::Pending));
    }

    #[tokio::test]
    async fn test_create_payment_cannot_reopen_settled_order() {
        let state = test_state();
        state.orders.register("1", 100_000).await;
        let app = create_router(state.clone());

        let uri = format!("/payments/vnpay/return?{}", vnpay_query("1", 100_000, "00"));
        send(&app, get(&uri)).await;
        assert_eq!(state.orders.status("1").await, Some(OrderStatus::Success));

        let response = send(
            &app,
            post_json(
                "/api/v1/payments",
                &json!({
                    "method": "vnpay",
                    "amount": 1,
                    "description": "x",
                    "transaction_ref": "1"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let snapshot = state.orders.find_order("1").await.unwrap().unwrap();
        assert_eq!(snapshot.amount, 100_000);
        assert_eq!(snapshot.status, OrderStatus::Success);
    }

    #[tokio::test]
    async fn test_create_payment_keeps_pending_order_amount() {
        let state = test_state();
        state.orders.register("5", 100_000).await;
        let app = create_router(state.clone());

        let response = send(
            &app,
            post_json(
                "/api/v1/payments",
                &json!({
                    "method": "vnpay",
                    "amount": 1,
                    "description": "x",
                    "transaction_ref": "5"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let snapshot = state.orders.find_order("5").await.unwrap().unwrap();
        assert_eq!(snapshot.amount, 100_000);
    }

    #[tokio::test]
    async fn test_create_payment_rejects_unknown_method() {
        let app = create_router(test_state());

        let response = send(
            &app,
            post_json(
                "/api/v1/payments",
                &json!({"method": "paypal", "amount": 1000, "description": "x"}),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_create_vnpay_payment_without_client_ip() {
        let app = create_router(test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/payments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "method": "vnpay",
                    "amount": 1000,
                    "description": "x",
                    "transaction_ref": "7"
                })
                .to_string(),
            ))
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_vnpay_return_redirects_to_result_page() {
        let state = test_state();
        state.orders.register("1", 100_000).await;
        let app = create_router(state.clone());

        let uri = format!("/payments/vnpay/return?{}", vnpay_query("1", 100_000, "00"));
        let response = send(&app, get(&uri)).await;

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "https://shop.vn/checkout/success");
        assert_eq!(state.orders.status("1").await, Some(OrderStatus::Success));
    }

    #[tokio::test]
    async fn test_vnpay_return_forged_goes_to_failure_page() {
        let state = test_state();
        state.orders.register("1", 100_000).await;
        let app = create_router(state.clone());

        let query = vnpay_query("1", 100_000, "24").replace("vnp_ResponseCode=24", "vnp_ResponseCode=00");
        let response = send(&app, get(&format!("/payments/vnpay/return?{}", query))).await;

        assert_eq!(location(&response), "https://shop.vn/checkout/failure");
        assert_eq!(state.orders.status("1").await, Some(OrderStatus::Pending));
        assert_eq!(state.orders.update_count("1").await, 0);
    }

    #[tokio::test]
    async fn test_vnpay_ipn_response_codes() {
        let state = test_state();
        state.orders.register("1", 100_000).await;
        state.orders.register("2", 100_000).await;
        let app = create_router(state.clone());

        let ipn = |query: String| get(&format!("/webhook/vnpay?{}", query));

        let first = json_body(send(&app, ipn(vnpay_query("1", 100_000, "00"))).await).await;
        assert_eq!(first["RspCode"], "00");

        let repeat = json_body(send(&app, ipn(vnpay_query("1", 100_000, "00"))).await).await;
        assert_eq!(repeat["RspCode"], "02");
        assert_eq!(state.orders.update_count("1").await, 2);

        let unknown = json_body(send(&app, ipn(vnpay_query("404", 100_000, "00"))).await).await;
        assert_eq!(unknown["RspCode"], "01");

        let wrong_amount = json_body(send(&app, ipn(vnpay_query("2", 1_000, "00"))).await).await;
        assert_eq!(wrong_amount["RspCode"], "04");
        assert_eq!(state.orders.status("2").await, Some(OrderStatus::Failed));

        let late_failure = json_body(send(&app, ipn(vnpay_query("1", 100_000, "24"))).await).await;
        assert_eq!(late_failure["RspCode"], "02");
        assert_eq!(state.orders.status("1").await, Some(OrderStatus::Success));

        let forged = vnpay_query("1", 100_000, "00").replace("vnp_TxnRef=1", "vnp_TxnRef=2");
        let forged = json_body(send(&app, ipn(forged)).await).await;
        assert_eq!(forged["RspCode"], "97");
    }

    #[tokio::test]
    async fn test_momo_ipn_double_delivery() {
        let state = test_state();
        state.orders.register("1001", 50_000).await;
        let app = create_router(state.clone());

        let body = momo_ipn_body(&momo_callback("1001", 50_000, 0));

        for delivery in 1..=2 {
            let response = send(&app, post_json("/webhook/momo", &body)).await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            assert_eq!(state.orders.update_count("1001").await, delivery);
        }
        assert_eq!(state.orders.status("1001").await, Some(OrderStatus::Success));
    }

    #[tokio::test]
    async fn test_momo_ipn_forged() {
        let state = test_state();
        state.orders.register("1001", 50_000).await;
        let app = create_router(state.clone());

        let mut body = momo_ipn_body(&momo_callback("1001", 50_000, 1006));
        body["resultCode"] = json!(0);

        let response = send(&app, post_json("/webhook/momo", &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.orders.status("1001").await, Some(OrderStatus::Pending));
    }

    #[tokio::test]
    async fn test_momo_return_declined() {
        let state = test_state();
        state.orders.register("1001", 50_000).await;
        let app = create_router(state.clone());

        let callback = momo_callback("1001", 50_000, 1006);
        let query = callback
            .signing_fields(MOMO_ACCESS_KEY)
            .iter()
            .skip(1)
            .map(|(k, v)| format!("{}={}", k, encode_form_component(v)))
            .chain(std::iter::once(format!("signature={}", callback.signature)))
            .collect::<Vec<_>>()
            .join("&");

        let response = send(&app, get(&format!("/payments/momo/return?{}", query))).await;

        assert_eq!(location(&response), "https://shop.vn/checkout/failure");
        assert_eq!(state.orders.status("1001").await, Some(OrderStatus::Failed));
    }

    #[tokio::test]
    async fn test_result_pages_do_not_echo_query() {
        let app = create_router(test_state());

        let response = send(&app, get("/checkout/success?vnp_TxnRef=%3Cscript%3E")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Payment Successful!"));
        assert!(!html.contains("script"));
    }
}
