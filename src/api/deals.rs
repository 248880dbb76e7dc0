use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DealsResponse};

pub async fn get_amazon_deals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DealsResponse>>, ApiError> {
    let view = state.deals().get_deals().await?;
    Ok(Json(ApiResponse::success(DealsResponse::from(view))))
}
