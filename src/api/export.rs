//! CSV export endpoints

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    context::RequestContext,
    error::AppResult,
    models::user::Permission,
    services::export::CsvFile,
    AppState,
};

use super::AuthenticatedUser;

impl IntoResponse for CsvFile {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename),
                ),
            ],
            self.content,
        )
            .into_response()
    }
}

/// Export the tool inventory
#[utoipa::path(
    get,
    path = "/export/tools",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "tools.csv", content_type = "text/csv", body = String),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn export_tools(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<CsvFile> {
    claims.require(Permission::Analytics)?;

    let ctx = RequestContext::from(&claims);
    state.services.export.tools(&ctx).await
}

/// Export loans not yet returned
#[utoipa::path(
    get,
    path = "/export/active-loans",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "active_loans.csv", content_type = "text/csv", body = String),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn export_active_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<CsvFile> {
    claims.require(Permission::Analytics)?;

    let ctx = RequestContext::from(&claims);
    state.services.export.active_loans(&ctx).await
}

/// Export returned loans
#[utoipa::path(
    get,
    path = "/export/loan-history",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "loan_history.csv", content_type = "text/csv", body = String),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn export_loan_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<CsvFile> {
    claims.require(Permission::Analytics)?;

    let ctx = RequestContext::from(&claims);
    state.services.export.loan_history(&ctx).await
}
