//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, dashboard, export, health, loans, tools, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Toolcrib API",
        version = "1.0.0",
        description = "Tool inventory and loan tracking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::obtain_token,
        auth::refresh_token,
        // Users
        users::register,
        users::me,
        users::list_users,
        users::set_user_permissions,
        users::set_user_groups,
        users::list_groups,
        users::create_group,
        users::set_group_permissions,
        // Tools
        tools::list_tools,
        tools::get_tool,
        tools::create_tool,
        tools::replace_tool,
        tools::update_tool,
        tools::set_tool_condition,
        tools::delete_tool,
        // Loans
        loans::list_loans,
        loans::active_loans,
        loans::overdue_loans,
        loans::loan_history,
        loans::get_loan,
        loans::create_loan,
        loans::update_loan,
        loans::return_loan,
        loans::delete_loan,
        // Reports
        dashboard::get_dashboard,
        dashboard::get_analytics,
        // Export
        export::export_tools,
        export::export_active_loans,
        export::export_loan_history,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::LoginRequest,
            crate::models::user::RefreshRequest,
            crate::models::user::TokenPair,
            crate::models::user::AccessToken,
            // Users
            crate::models::user::Permission,
            crate::models::user::User,
            crate::models::user::UserDetail,
            crate::models::user::RegisterUser,
            crate::models::user::Group,
            crate::models::user::CreateGroup,
            crate::models::user::SetPermissions,
            crate::models::user::SetGroups,
            // Tools
            crate::models::tool::ToolCondition,
            crate::models::tool::Tool,
            crate::models::tool::CreateTool,
            crate::models::tool::UpdateTool,
            crate::models::tool::ConditionChange,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::CreateLoan,
            crate::models::loan::UpdateLoan,
            // Reports
            crate::models::report::DashboardSummary,
            crate::models::report::AnalyticsReport,
            crate::models::report::ConditionCount,
            crate::models::report::ToolValue,
            crate::models::report::MonthlyCost,
            crate::models::report::MonthlyCount,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Token endpoints"),
        (name = "users", description = "Users, groups and permissions"),
        (name = "tools", description = "Tool inventory"),
        (name = "loans", description = "Loan management"),
        (name = "reports", description = "Dashboard and analytics"),
        (name = "export", description = "CSV export")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::openapi::path::PathItemType;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/tools/{id}"));
        assert!(doc.paths.paths.contains_key("/loans/{id}/return"));
        assert!(doc.paths.paths.contains_key("/export/loan-history"));

        let tool = &doc.paths.paths["/tools/{id}"];
        assert!(tool.operations.contains_key(&PathItemType::Put));
        assert!(tool.operations.contains_key(&PathItemType::Patch));
    }
}
