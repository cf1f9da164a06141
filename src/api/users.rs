//! User, group and permission endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{CreateGroup, Group, RegisterUser, SetGroups, SetPermissions, User, UserDetail},
    AppState,
};

use super::AuthenticatedUser;

/// Register a new account
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(data): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    data.validate()?;

    let user = state.services.users.register(data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get current user with effective permissions
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserDetail),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserDetail>> {
    let user = state.services.users.me(claims.user_id).await?;
    Ok(Json(user))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    claims.require_superuser()?;

    let users = state.services.users.list().await?;
    Ok(Json(users))
}

/// Replace the direct permissions of a user
#[utoipa::path(
    put,
    path = "/users/{id}/permissions",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetPermissions,
    responses(
        (status = 200, description = "Updated user", body = UserDetail),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_user_permissions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<SetPermissions>,
) -> AppResult<Json<UserDetail>> {
    claims.require_superuser()?;

    let user = state
        .services
        .users
        .set_user_permissions(id, &data.permissions)
        .await?;
    Ok(Json(user))
}

/// Replace the group memberships of a user
#[utoipa::path(
    put,
    path = "/users/{id}/groups",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetGroups,
    responses(
        (status = 200, description = "Updated user", body = UserDetail),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 404, description = "User or group not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_user_groups(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<SetGroups>,
) -> AppResult<Json<UserDetail>> {
    claims.require_superuser()?;

    let user = state.services.users.set_user_groups(id, &data.group_ids).await?;
    Ok(Json(user))
}

/// List permission groups
#[utoipa::path(
    get,
    path = "/groups",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All groups", body = Vec<Group>),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_groups(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Group>>> {
    claims.require_superuser()?;

    let groups = state.services.users.list_groups().await?;
    Ok(Json(groups))
}

/// Create a permission group
#[utoipa::path(
    post,
    path = "/groups",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateGroup,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 409, description = "Group name already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_group(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateGroup>,
) -> AppResult<(StatusCode, Json<Group>)> {
    claims.require_superuser()?;
    data.validate()?;

    let group = state.services.users.create_group(data).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// Replace the permissions of a group
#[utoipa::path(
    put,
    path = "/groups/{id}/permissions",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Group ID")),
    request_body = SetPermissions,
    responses(
        (status = 200, description = "Updated group", body = Group),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_group_permissions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<SetPermissions>,
) -> AppResult<Json<Group>> {
    claims.require_superuser()?;

    let group = state
        .services
        .users
        .set_group_permissions(id, &data.permissions)
        .await?;
    Ok(Json(group))
}
