//! Dashboard and analytics report types

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::tool::ToolCondition;

/// Inventory summary
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardSummary {
    /// Number of distinct tools
    pub total_tool_types: i64,
    pub active_loans_count: i64,
    pub overdue_loans_count: i64,
    /// Units across all tools not currently on loan
    pub available_in_warehouse: i64,
    /// Number of tools in maintenance condition
    pub tools_in_maintenance: i64,
    #[schema(value_type = String, example = "120.00")]
    pub total_maintenance_cost: Decimal,
    /// Σ total_quantity × unit_value
    #[schema(value_type = String, example = "150.00")]
    pub total_inventory_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ConditionCount {
    pub condition: ToolCondition,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ToolValue {
    pub name: String,
    #[schema(value_type = String)]
    pub total_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyCost {
    /// YYYY-MM
    pub month: String,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyCount {
    /// YYYY-MM
    pub month: String,
    pub count: i64,
}

/// Chart data for the analytics page
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalyticsReport {
    pub tools_by_condition: Vec<ConditionCount>,
    /// Ten most valuable tools by total stock value
    pub inventory_value_by_tool: Vec<ToolValue>,
    pub maintenance_cost_over_time: Vec<MonthlyCost>,
    pub loan_activity: Vec<MonthlyCount>,
}
