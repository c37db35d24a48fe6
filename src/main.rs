use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsroom::config::Config;
use newsroom::db::Database;
use newsroom::poller::http_client;
use newsroom::routes::{self, AppState};
use newsroom::supervisor::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsroom=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWSROOM_CONFIG").unwrap_or_else(|_| "newsroom.toml".to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded {} feeds from {}", config.feeds.len(), config_path);

    // Initialize database
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database_url.clone());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let db = Arc::new(db);

    // Start one poller per feed
    let client = http_client(config.request_timeout())?;
    let mut supervisor = Supervisor::new(client, db.clone(), config.poll_period());
    let started = supervisor.start(config.feeds.as_slice())?;
    info!("Polling {} feeds every {} minutes", started, config.refresh_interval);

    // Build router
    let app = routes::router(Arc::new(AppState { db: db.clone() }));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server.address).await?;
    info!("Server starting on http://{}", config.server.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
