//! Farm dashboard backend server

use anyhow::Context;
use farm_dashboard_backend::{
    config::Config, create_app, logging, AppState, MemoryStore, PgStore, RecordStore,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_logging();

    let config = Config::load().context("loading configuration")?;

    tracing::info!("Starting farm dashboard server");
    tracing::info!("Environment: {}", config.environment);

    let store: Arc<dyn RecordStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory store; data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.database.url)
            .await
            .context("connecting to database")?;
        tracing::info!("Database connection established");
        Arc::new(PgStore::new(db_pool))
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let app = create_app(AppState::new(store, config));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
