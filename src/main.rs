use std::sync::Arc;

use fx_deals::{
    build_router,
    config::AppConfig,
    services::{
        deal_service::DealService,
        deal_store::{DealStore, InMemoryDealStore, SeaOrmDealStore},
    },
    AppState,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fx_deals=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("Invalid configuration");

    if config.timestamp_window.is_some() {
        tracing::info!("Deal timestamp window rule enabled: {:?}", config.timestamp_window);
    }

    let store: Arc<dyn DealStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory deal store; deals are lost on restart");
        Arc::new(InMemoryDealStore::new())
    } else {
        // Connect to database
        tracing::info!("Connecting to database...");
        let db = Database::connect(&config.database_url)
            .await
            .expect("Failed to connect to database");

        // Run migrations
        tracing::info!("Running migrations...");
        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        Arc::new(SeaOrmDealStore::new(db))
    };

    let state = AppState {
        deals: DealService::new(store, config.validator()),
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(
        "Server listening on {}",
        listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.server_addr.clone())
    );

    axum::serve(listener, app).await.expect("Server error");
}
