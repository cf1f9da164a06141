//! Loan management endpoints

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
        loan::{CreateLoan, Loan, LoanFilter, UpdateLoan},
        user::Permission,
    },
    AppState,
};

use super::AuthenticatedUser;

/// List all loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All loans", body = Vec<Loan>),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Loan>>> {
    claims.require(Permission::History)?;

    let ctx = RequestContext::from(&claims);
    let loans = state.services.loans.list(&ctx, LoanFilter::All).await?;
    Ok(Json(loans))
}

/// Loans not yet returned
#[utoipa::path(
    get,
    path = "/loans/active_loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active loans", body = Vec<Loan>),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn active_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Loan>>> {
    claims.require(Permission::ActiveLoans)?;

    let ctx = RequestContext::from(&claims);
    let loans = state.services.loans.list(&ctx, LoanFilter::Active).await?;
    Ok(Json(loans))
}

/// Active loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue_loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans", body = Vec<Loan>),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn overdue_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Loan>>> {
    claims.require(Permission::ActiveLoans)?;

    let ctx = RequestContext::from(&claims);
    let filter = LoanFilter::Overdue(ctx.today);
    let loans = state.services.loans.list(&ctx, filter).await?;
    Ok(Json(loans))
}

/// Returned loans
#[utoipa::path(
    get,
    path = "/loans/loan_history",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Returned loans", body = Vec<Loan>),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn loan_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Loan>>> {
    claims.require(Permission::History)?;

    let ctx = RequestContext::from(&claims);
    let loans = state.services.loans.list(&ctx, LoanFilter::History).await?;
    Ok(Json(loans))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    claims.require_any(&[Permission::ActiveLoans, Permission::History])?;

    let ctx = RequestContext::from(&claims);
    let loan = state.services.loans.get_by_id(&ctx, id).await?;
    Ok(Json(loan))
}

/// Borrow units of a tool
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Insufficient stock or invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Tool or borrower not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    claims.require(Permission::RegisterLoan)?;
    data.validate()?;

    let ctx = RequestContext::from(&claims);
    let loan = state.services.loans.create(&ctx, data).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Update a loan (PUT and PATCH)
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = UpdateLoan,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 400, description = "Insufficient stock or invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan, tool or borrower not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateLoan>,
) -> AppResult<Json<Loan>> {
    claims.require(Permission::RegisterLoan)?;
    data.validate()?;

    let ctx = RequestContext::from(&claims);
    let loan = state.services.loans.update(&ctx, id, data).await?;
    Ok(Json(loan))
}

/// Return a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan returned", body = Loan),
        (status = 400, description = "Loan already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    claims.require(Permission::ActiveLoans)?;

    let ctx = RequestContext::from(&claims);
    let loan = state.services.loans.return_loan(&ctx, id).await?;
    Ok(Json(loan))
}

/// Delete a loan
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require(Permission::RegisterLoan)?;

    let ctx = RequestContext::from(&claims);
    state.services.loans.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
