//! Tool inventory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    context::RequestContext,
    error::AppResult,
    models::{
        tool::{ConditionChange, CreateTool, Tool, UpdateTool},
        user::Permission,
    },
    AppState,
};

use super::AuthenticatedUser;

/// List all tools with their availability
#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All tools", body = Vec<Tool>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_tools(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Tool>>> {
    let tools = state.services.tools.list().await?;
    Ok(Json(tools))
}

/// Get tool by ID
#[utoipa::path(
    get,
    path = "/tools/{id}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Tool ID")),
    responses(
        (status = 200, description = "Tool details", body = Tool),
        (status = 404, description = "Tool not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_tool(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Tool>> {
    let tool = state.services.tools.get_by_id(id).await?;
    Ok(Json(tool))
}

/// Create a tool
#[utoipa::path(
    post,
    path = "/tools",
    tag = "tools",
    security(("bearer_auth" = [])),
    request_body = CreateTool,
    responses(
        (status = 201, description = "Tool created", body = Tool),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_tool(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateTool>,
) -> AppResult<(StatusCode, Json<Tool>)> {
    claims.require(Permission::ManageTools)?;
    data.validate()?;

    let ctx = RequestContext::from(&claims);
    let tool = state.services.tools.create(&ctx, data).await?;
    Ok((StatusCode::CREATED, Json(tool)))
}

/// Replace a tool; omitted fields are reset to their defaults
#[utoipa::path(
    put,
    path = "/tools/{id}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Tool ID")),
    request_body = CreateTool,
    responses(
        (status = 200, description = "Tool replaced", body = Tool),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Tool not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Quantity below units on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn replace_tool(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CreateTool>,
) -> AppResult<Json<Tool>> {
    claims.require(Permission::ManageTools)?;
    data.validate()?;

    let ctx = RequestContext::from(&claims);
    let tool = state.services.tools.replace(&ctx, id, data).await?;
    Ok(Json(tool))
}

/// Partially update a tool; `null` clears a nullable field
#[utoipa::path(
    patch,
    path = "/tools/{id}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Tool ID")),
    request_body = UpdateTool,
    responses(
        (status = 200, description = "Tool updated", body = Tool),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Tool not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Quantity below units on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_tool(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateTool>,
) -> AppResult<Json<Tool>> {
    claims.require(Permission::ManageTools)?;
    data.validate()?;

    let ctx = RequestContext::from(&claims);
    let tool = state.services.tools.update(&ctx, id, data).await?;
    Ok(Json(tool))
}

/// Change the condition of a tool
#[utoipa::path(
    put,
    path = "/tools/{id}/condition",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Tool ID")),
    request_body = ConditionChange,
    responses(
        (status = 200, description = "Condition changed", body = Tool),
        (status = 400, description = "Maintenance without a positive cost", body = crate::error::ErrorResponse),
        (status = 404, description = "Tool not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Units still on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_tool_condition(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ConditionChange>,
) -> AppResult<Json<Tool>> {
    claims.require(Permission::ManageTools)?;

    let ctx = RequestContext::from(&claims);
    let tool = state.services.tools.set_condition(&ctx, id, data).await?;
    Ok(Json(tool))
}

/// Delete a tool and its loans
#[utoipa::path(
    delete,
    path = "/tools/{id}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Tool ID")),
    responses(
        (status = 204, description = "Tool deleted"),
        (status = 404, description = "Tool not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_tool(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require(Permission::ManageTools)?;

    let ctx = RequestContext::from(&claims);
    state.services.tools.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
