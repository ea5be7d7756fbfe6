use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::AppState;
use crate::application::services::trading_service::{ApiKeyView, NewApiKey, SubmitTrade};
use crate::auth::CurrentUser;
use crate::domain::errors::AppError;
use crate::persistence::models::TradeRecord;

/// Query parameters for the trade history endpoint
#[derive(Debug, Deserialize)]
pub struct TradeQuery {
    /// Maximum number of trades (default 50)
    pub limit: Option<i64>,
}

pub async fn create_trade(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<SubmitTrade>,
) -> Result<(StatusCode, Json<TradeRecord>), AppError> {
    let trade = state.trading.submit_trade(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

pub async fn list_trades(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(params): ApiQuery<TradeQuery>,
) -> Result<Json<Vec<TradeRecord>>, AppError> {
    Ok(Json(state.trading.list_trades(user.id, params.limit).await?))
}

pub async fn get_trade(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(trade_id): ApiPath<i64>,
) -> Result<Json<TradeRecord>, AppError> {
    Ok(Json(state.trading.get_trade(user.id, trade_id).await?))
}

pub async fn create_api_key(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NewApiKey>,
) -> Result<(StatusCode, Json<ApiKeyView>), AppError> {
    let key = state.trading.add_api_key(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(key)))
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ApiKeyView>>, AppError> {
    Ok(Json(state.trading.list_api_keys(user.id).await?))
}

pub async fn delete_api_key(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(key_id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    state.trading.delete_api_key(user.id, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
