//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the payment orchestrator, the order store, and configuration.

use anyhow::Context;
use pay_core::{
    BoxedPaymentGateway, CallbackUrls, GatewaySelector, InMemoryOrderStore, PaymentOrchestrator,
};
use pay_momo::MomoGateway;
use pay_vnpay::VnpayGateway;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; return and IPN URLs are built from it
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Gateway dispatch and settlement
    pub orchestrator: Arc<PaymentOrchestrator>,
    /// Orders created through this service
    pub orders: InMemoryOrderStore,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create an AppState with every provider configured in the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let gateways = gateways_from_env();

        if gateways.methods().is_empty() {
            anyhow::bail!("No payment provider configured (set MOMO_* or VNPAY_* variables)");
        }

        Ok(Self::with_gateways(config, gateways))
    }

    /// Create an AppState around an explicit set of gateways
    pub fn with_gateways(config: AppConfig, gateways: GatewaySelector) -> Self {
        let orders = InMemoryOrderStore::new();
        let orchestrator = PaymentOrchestrator::new(
            gateways,
            CallbackUrls::new(&config.base_url),
            Arc::new(orders.clone()),
        )
        .with_order_lookup(Arc::new(orders.clone()));

        Self {
            orchestrator: Arc::new(orchestrator),
            orders,
            config,
        }
    }

    pub fn urls(&self) -> &CallbackUrls {
        self.orchestrator.urls()
    }
}

/// Register each provider whose credentials are present
fn gateways_from_env() -> GatewaySelector {
    let mut gateways = GatewaySelector::new();

    match MomoGateway::from_env() {
        Ok(gateway) => {
            info!("MoMo gateway enabled (endpoint={})", gateway.config().endpoint);
            gateways.register(Arc::new(gateway) as BoxedPaymentGateway);
        }
        Err(e) => warn!("MoMo gateway disabled: {}", e),
    }

    match VnpayGateway::from_env() {
        Ok(gateway) => {
            info!(
                "VNPay gateway enabled (payment_url={})",
                gateway.config().payment_url
            );
            gateways.register(Arc::new(gateway) as BoxedPaymentGateway);
        }
        Err(e) => warn!("VNPay gateway disabled: {}", e),
    }

    gateways
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::PaymentMethod;
    use pay_vnpay::VnpayConfig;

    #[test]
    fn test_app_config_defaults() {
        // Clear env vars for test
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("BASE_URL");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_socket_addr() {
        let config = AppConfig {
            host: "not a host".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
        };

        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_with_gateways() {
        let gateways = GatewaySelector::new()
            .with_gateway(Arc::new(VnpayGateway::new(VnpayConfig::new("TEST01", "abc123"))));
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "https://shop.vn/".to_string(),
            environment: "test".to_string(),
        };

        let state = AppState::with_gateways(config, gateways);
        assert_eq!(state.orchestrator.methods(), vec![PaymentMethod::Vnpay]);
        assert_eq!(
            state.urls().return_url(PaymentMethod::Vnpay),
            "https://shop.vn/payments/vnpay/return"
        );
    }
}
