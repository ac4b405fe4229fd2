mod api;
mod config;
mod external_services;
mod invoice_handler;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{router, AppState};
use crate::config::MainConfig;
use crate::external_services::wayforpay::handler::WayForPayHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(MainConfig::from_env().context("Failed to read configuration")?);
    config.warn_on_missing_credentials();

    let gateway = WayForPayHandler::new(config.clone()).context("Failed to build WayForPay client")?;

    let state = Arc::new(AppState {
        config: config.clone(),
        gateway: Arc::new(gateway),
    });

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, public_dir = %config.public_dir.display(), "WayForPay Test Server running on port {}", config.port);
    info!("http://localhost:{}", config.port);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
