use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradeboard::api::{router, AppState};
use tradeboard::config::{self, AppConfig};
use tradeboard::infrastructure::binance_client::BinanceClient;
use tradeboard::persistence::{init_database, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real environment variables take precedence
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config::default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!("Starting {} v{}", config.app_name, env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);
    config.warn_insecure_defaults();

    let pool = init_database(&DatabaseConfig::from_app_config(&config)).await?;

    let market_source = BinanceClient::new(
        &config.market_data_base_url,
        Duration::from_secs(config.market_data_timeout_seconds),
    )?;
    info!("Market data upstream: {}", config.market_data_base_url);

    let state = AppState::new(pool.clone(), &config, Arc::new(market_source))?;
    let app = router(state, &config);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let shutdown_signal = async {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    info!("Server started successfully. Press Ctrl+C to stop.");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutting down gracefully...");
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}
