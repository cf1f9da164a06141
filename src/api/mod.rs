//! API handlers for Toolcrib REST endpoints

pub mod auth;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod tools;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::user::{TokenType, UserClaims},
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        // refresh tokens are only good for /token/refresh
        if claims.token_type != TokenType::Access {
            return Err(AppError::Authentication("Access token required".to_string()));
        }

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Tokens
        .route("/token", post(auth::obtain_token))
        .route("/token/refresh", post(auth::refresh_token))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/register", post(users::register))
        .route("/users/me", get(users::me))
        .route("/users/:id/permissions", put(users::set_user_permissions))
        .route("/users/:id/groups", put(users::set_user_groups))
        .route("/groups", get(users::list_groups).post(users::create_group))
        .route("/groups/:id/permissions", put(users::set_group_permissions))
        // Tools
        .route("/tools", get(tools::list_tools).post(tools::create_tool))
        .route(
            "/tools/:id",
            get(tools::get_tool)
                .put(tools::replace_tool)
                .patch(tools::update_tool)
                .delete(tools::delete_tool),
        )
        .route("/tools/:id/condition", put(tools::set_tool_condition))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/active_loans", get(loans::active_loans))
        .route("/loans/overdue_loans", get(loans::overdue_loans))
        .route("/loans/loan_history", get(loans::loan_history))
        .route(
            "/loans/:id",
            get(loans::get_loan)
                .put(loans::update_loan)
                .patch(loans::update_loan)
                .delete(loans::delete_loan),
        )
        .route("/loans/:id/return", post(loans::return_loan))
        // Reports
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/analytics", get(dashboard::get_analytics))
        // Export
        .route("/export/tools", get(export::export_tools))
        .route("/export/active-loans", get(export::export_active_loans))
        .route("/export/loan-history", get(export::export_loan_history))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
