use axum::{extract::State, http::StatusCode, Json};

use super::extract::{ApiJson, ApiPath};
use crate::api::AppState;
use crate::application::services::alert_service::NewAlert;
use crate::auth::CurrentUser;
use crate::domain::errors::AppError;
use crate::persistence::models::AlertRecord;

pub async fn create_alert(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NewAlert>,
) -> Result<(StatusCode, Json<AlertRecord>), AppError> {
    let alert = state.alerts.create(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<AlertRecord>>, AppError> {
    Ok(Json(state.alerts.list(user.id).await?))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(alert_id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    state.alerts.delete(user.id, alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
