//! Token endpoints

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{AccessToken, LoginRequest, RefreshRequest, TokenPair},
    AppState,
};

/// Obtain an access and refresh token pair
#[utoipa::path(
    post,
    path = "/token",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    request.validate()?;

    let tokens = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/token/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Invalid or expired refresh token", body = crate::error::ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> AppResult<Json<AccessToken>> {
    let token = state.services.users.refresh(&request.refresh).await?;
    Ok(Json(token))
}
