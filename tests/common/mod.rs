use std::env;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fx_deals::{
    build_router,
    services::{
        deal_service::DealService,
        deal_store::{DealStore, InMemoryDealStore},
        validation::DealValidator,
    },
    AppState,
};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

/// Set up a migrated test database
/// Uses TEST_DATABASE_URL (Postgres) when set, otherwise a private SQLite
/// in-memory database kept alive by a single connection
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let opt = match env::var("TEST_DATABASE_URL") {
        Ok(url) => {
            let mut opt = ConnectOptions::new(url);
            opt.max_connections(5).sqlx_logging(false);
            opt
        }
        Err(_) => {
            let mut opt = ConnectOptions::new("sqlite::memory:");
            opt.max_connections(1).min_connections(1).sqlx_logging(false);
            opt
        }
    };

    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Deal id that cannot collide with rows left by earlier runs on a shared database
#[allow(dead_code)]
pub fn unique_deal_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Router over a fresh in-memory store, returned alongside the store
#[allow(dead_code)]
pub fn build_test_router() -> (Router, Arc<InMemoryDealStore>) {
    let store = Arc::new(InMemoryDealStore::new());
    let router = build_router_with(store.clone(), DealValidator::default());
    (router, store)
}

#[allow(dead_code)]
pub fn build_router_with(store: Arc<dyn DealStore>, validator: DealValidator) -> Router {
    build_router(AppState {
        deals: DealService::new(store, validator),
    })
}

/// Send one request and decode the JSON body (Null when empty)
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_test_db() {
        let db = setup_test_db().await;
        assert!(db.is_ok(), "Test database setup should succeed");
    }
}
