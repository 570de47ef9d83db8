//! tracklog server binary.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracklog_server::{create_router, AppState, Args, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tracklog_server=info,tracklog_core=info,tower_http=info".into()
            }),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig::from(&args);

    info!(
        listen = %config.listen_addr,
        token_lifetime_ms = config.token_lifetime.as_millis(),
        directory_timeout_ms = config.directory_timeout.as_millis(),
        "Starting tracklog server"
    );

    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Server listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
