use axum::{extract::State, http::StatusCode, Json};

use super::extract::{ApiJson, ApiPath};
use crate::api::AppState;
use crate::application::services::portfolio_service::{PortfolioView, SetHolding};
use crate::auth::CurrentUser;
use crate::domain::errors::AppError;
use crate::persistence::models::HoldingRecord;

pub async fn get_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PortfolioView>, AppError> {
    Ok(Json(state.portfolio.get_portfolio(user.id).await?))
}

pub async fn put_holding(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<SetHolding>,
) -> Result<Json<HoldingRecord>, AppError> {
    Ok(Json(state.portfolio.set_holding(user.id, request).await?))
}

pub async fn delete_holding(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(symbol): ApiPath<String>,
) -> Result<StatusCode, AppError> {
    state.portfolio.remove_holding(user.id, &symbol).await?;
    Ok(StatusCode::NO_CONTENT)
}
