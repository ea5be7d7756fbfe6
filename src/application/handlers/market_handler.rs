use axum::{extract::State, Json};

use super::extract::ApiPath;
use crate::api::AppState;
use crate::application::services::market_service::{CoinDetail, CoinPrice};
use crate::domain::errors::AppError;

/// Prices for the fixed coin basket; never fails
pub async fn list_prices(State(state): State<AppState>) -> Json<Vec<CoinPrice>> {
    Json(state.market.list_prices().await)
}

pub async fn get_price(
    State(state): State<AppState>,
    ApiPath(symbol): ApiPath<String>,
) -> Result<Json<CoinDetail>, AppError> {
    Ok(Json(state.market.get_detail(&symbol).await?))
}
