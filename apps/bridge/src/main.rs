//! tvlink bridge entry point.

mod config;
mod http;
mod registry;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting tvlink");

    let config_path = config::config_path();
    let config = config::BridgeConfig::load(&config_path)?;
    info!(
        path = %config_path.display(),
        tvs = config.tvs.len(),
        "configuration loaded"
    );

    let registry = Arc::new(registry::Registry::build(&config));
    registry.connect_all().await;

    let app = http::router(registry);
    let addr = format!("0.0.0.0:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "gateway listening");

    axum::serve(listener, app).await?;
    Ok(())
}
