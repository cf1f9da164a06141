//! Dashboard and analytics endpoints

use axum::{extract::State, Json};

use crate::{
    context::RequestContext,
    error::AppResult,
    models::{
        report::{AnalyticsReport, DashboardSummary},
        user::Permission,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Summary counters
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardSummary>> {
    claims.require(Permission::Dashboard)?;

    let ctx = RequestContext::from(&claims);
    let summary = state.services.reports.dashboard(&ctx).await?;
    Ok(Json(summary))
}

/// Chart data grouped by condition, value and month
#[utoipa::path(
    get,
    path = "/analytics",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Analytics report", body = AnalyticsReport),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_analytics(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<AnalyticsReport>> {
    claims.require(Permission::Analytics)?;

    let ctx = RequestContext::from(&claims);
    let report = state.services.reports.analytics(&ctx).await?;
    Ok(Json(report))
}
