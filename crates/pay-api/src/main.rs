//! # storefront-pay
//!
//! Payment endpoints for the storefront: starts MoMo and VNPay payments and
//! settles their return redirects and IPN calls.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (either provider may be left out)
//! export MOMO_PARTNER_CODE=MOMO...
//! export MOMO_ACCESS_KEY=...
//! export MOMO_SECRET_KEY=...
//! export VNPAY_TMN_CODE=...
//! export VNPAY_HASH_SECRET=...
//! export BASE_URL=https://shop.example.vn
//!
//! # Run the server
//! storefront-pay
//! ```

use pay_api::{routes, state::AppState};
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment providers: {:?}", state.orchestrator.methods());

    let app = routes::create_router(state);

    info!("storefront-pay v{} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    if !is_prod {
        info!("Create payment: POST http://{}/api/v1/payments", addr);
        info!("MoMo IPN: POST http://{}/webhook/momo", addr);
        info!("VNPay IPN: GET http://{}/webhook/vnpay", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
