use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_gateway::config::Config;
use voice_gateway::interface::api::{build_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting voice gateway");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config);

    if !config.twilio.is_configured() {
        warn!("Provider credentials are incomplete; token issuance and call control will fail until they are set");
    }
    if config.gateway.api_auth_token.is_none() {
        warn!("API_AUTH_TOKEN is not set; /api/token and /api/call-history are open to any caller");
    }
    if config.gateway.webhook_base_url.is_none() {
        warn!("WEBHOOK_BASE_URL is not set; webhook signatures are not verified");
    }

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    // Initialize metrics exporter
    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics();

    let state = AppState::from_config(config)?;
    let app = build_router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("HTTP server listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
