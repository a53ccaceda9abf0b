// src/lib.rs

use axum::{routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use services::deal_service::DealService;

#[derive(Clone)]
pub struct AppState {
    pub deals: DealService,
}

pub mod entities {
    pub mod prelude;
    pub mod deals;
}

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

/// Build the HTTP router with correlation ids, panic recovery, tracing and CORS layered on
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/deals",
            get(handlers::deal::list_deals).post(handlers::deal::create_deal),
        )
        .route("/api/deals/{deal_unique_id}", get(handlers::deal::get_deal))
        .layer(axum::middleware::from_fn(
            middleware::correlation::correlation_id,
        ))
        .layer(CatchPanicLayer::custom(handlers::error::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
