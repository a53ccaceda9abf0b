use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{
    handlers::error::ApiError,
    middleware::correlation::CorrelationId,
    models::deal::{DealRequest, DealResponse},
    AppState,
};

/// Handler for POST /api/deals
pub async fn create_deal(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    payload: Result<Json<DealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DealResponse>), ApiError> {
    let Json(request) = payload?;

    let deal = state.deals.create_deal(&correlation_id, request).await?;

    Ok((StatusCode::CREATED, Json(DealResponse::from(deal))))
}

/// Handler for GET /api/deals
pub async fn list_deals(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
) -> Result<Json<Vec<DealResponse>>, ApiError> {
    let deals = state.deals.list_deals(&correlation_id).await?;

    Ok(Json(deals.into_iter().map(DealResponse::from).collect()))
}

/// Handler for GET /api/deals/{deal_unique_id}
pub async fn get_deal(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    Path(deal_unique_id): Path<String>,
) -> Result<Json<DealResponse>, ApiError> {
    match state.deals.find_deal(&correlation_id, &deal_unique_id).await? {
        Some(deal) => Ok(Json(DealResponse::from(deal))),
        None => Err(ApiError::NotFound(format!(
            "Deal not found with ID: {}",
            deal_unique_id
        ))),
    }
}
