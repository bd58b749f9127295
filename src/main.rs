use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schedule_helper::portal::{HttpPortalClient, PortalConfig};
use schedule_helper::services::{RefreshScheduler, UpdateService};
use schedule_helper::store::SqliteCacheStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "schedule_helper=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://schedule-helper.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let config = PortalConfig::new_from_env()?;
    let portal = Arc::new(HttpPortalClient::new(config)?);
    let store = Arc::new(SqliteCacheStore::new(pool));
    let service = UpdateService::new(store, portal);

    let interval_secs = std::env::var("REFRESH_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(900);

    info!("seeding local cache from portal");
    service.refresh_user_data(&[]).await?;

    RefreshScheduler::new(service, interval_secs).start().await;

    Ok(())
}
