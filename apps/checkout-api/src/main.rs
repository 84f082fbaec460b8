//! # RS Prólipsi Checkout API
//!
//! HTTP server for the checkout and van-billing front-ends.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout API Server                              │
//! │                                                                         │
//! │  Browser ───► HTTP (8080) ───► routes ───► SQLite                       │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                     ViaCEP · shipping quotes · Mercado Pago             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use prolipsi_checkout_api::{create_router, ApiConfig, AppState, SessionStore};
use prolipsi_db::{Database, DbConfig};
use prolipsi_gateway::{MercadoPagoClient, ShippingQuoteClient, ShippingQuoter, ViaCepClient};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("Starting RS Prólipsi checkout API...");

    // Load configuration
    let config = ApiConfig::load().context("invalid configuration")?;
    let offer = config.load_offer().context("invalid offer file")?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        product = %offer.offer.product.name,
        coupons = offer.coupons.len(),
        "Configuration loaded"
    );

    // Open database (runs migrations)
    let db = Database::new(DbConfig::new(config.database_path.clone()))
        .await
        .context("failed to open database")?;
    info!("Database ready");

    // Outbound clients
    let address_lookup = ViaCepClient::new(&config.gateway).context("ViaCEP client")?;
    let shipping = ShippingQuoteClient::new(&config.gateway)
        .context("shipping quote client")?
        .map(|client| Arc::new(client) as Arc<dyn ShippingQuoter>);
    if shipping.is_none() {
        info!("SHIPPING_QUOTE_URL not set, using the fallback shipping table");
    }
    if config.gateway.access_token.is_none() {
        warn!("MERCADO_PAGO_ACCESS_TOKEN not set, payments will be refused");
    }
    let payments = MercadoPagoClient::new(&config.gateway).context("Mercado Pago client")?;

    let state = AppState {
        db: db.clone(),
        address_lookup: Arc::new(address_lookup),
        shipping,
        shipping_timeout: config.gateway.shipping_timeout,
        payments: Arc::new(payments),
        offer: Arc::new(offer.offer),
        coupons: Arc::new(offer.coupons),
        sessions: SessionStore::new(),
        clock: Arc::new(Utc::now),
    };

    // Idle checkout sessions
    let sessions = state.sessions.clone();
    let idle_timeout = config.session_idle_timeout;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sessions.purge_idle(idle_timeout);
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
