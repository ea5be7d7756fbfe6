use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::extract::{ApiForm, ApiJson};
use crate::api::AppState;
use crate::application::services::auth_service::{AccessToken, RegisterUser};
use crate::auth::CurrentUser;
use crate::domain::errors::AppError;
use crate::persistence::models::UserRecord;

/// OAuth2 password-grant form; `username` carries the email
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginJson {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterUser>,
) -> Result<(StatusCode, Json<UserRecord>), AppError> {
    let user = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<AccessToken>, AppError> {
    let token = state.auth.authenticate(&form.username, &form.password).await?;
    Ok(Json(token))
}

pub async fn login_json(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<LoginJson>,
) -> Result<Json<AccessToken>, AppError> {
    let token = state
        .auth
        .authenticate(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(token))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserRecord> {
    Json(user)
}

pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.auth.delete_account(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
