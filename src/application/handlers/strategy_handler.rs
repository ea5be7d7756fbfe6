use axum::{extract::State, http::StatusCode, Json};

use super::extract::{ApiJson, ApiPath};
use crate::api::AppState;
use crate::application::services::strategy_service::NewStrategy;
use crate::auth::CurrentUser;
use crate::domain::errors::AppError;
use crate::persistence::models::StrategyRecord;

pub async fn create_strategy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NewStrategy>,
) -> Result<(StatusCode, Json<StrategyRecord>), AppError> {
    let strategy = state.strategies.create(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(strategy)))
}

pub async fn list_strategies(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<StrategyRecord>>, AppError> {
    Ok(Json(state.strategies.list(user.id).await?))
}

pub async fn get_strategy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(strategy_id): ApiPath<i64>,
) -> Result<Json<StrategyRecord>, AppError> {
    Ok(Json(state.strategies.get(user.id, strategy_id).await?))
}

pub async fn delete_strategy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(strategy_id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    state.strategies.delete(user.id, strategy_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
