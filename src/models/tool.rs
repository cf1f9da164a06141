//! Tool (equipment) model and related types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

/// Physical condition of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ToolCondition {
    Good,
    New,
    Recovered,
    Maintenance,
}

impl ToolCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCondition::Good => "good",
            ToolCondition::New => "new",
            ToolCondition::Recovered => "recovered",
            ToolCondition::Maintenance => "maintenance",
        }
    }

    /// Human readable label used in exports
    pub fn label(&self) -> &'static str {
        match self {
            ToolCondition::Good => "Good Condition",
            ToolCondition::New => "New",
            ToolCondition::Recovered => "Recovered",
            ToolCondition::Maintenance => "Under Maintenance",
        }
    }
}

impl Default for ToolCondition {
    fn default() -> Self {
        ToolCondition::Good
    }
}

impl std::fmt::Display for ToolCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "good" => Ok(ToolCondition::Good),
            "new" => Ok(ToolCondition::New),
            "recovered" => Ok(ToolCondition::Recovered),
            "maintenance" => Ok(ToolCondition::Maintenance),
            _ => Err(format!("Invalid tool condition: {}", s)),
        }
    }
}

// Stored as VARCHAR
impl sqlx::Type<Postgres> for ToolCondition {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for ToolCondition {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ToolCondition {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Tool row as stored, plus the quantity currently on loan.
///
/// `borrowed_quantity` is computed by the query from active loans; it is
/// never a column of its own.
#[derive(Debug, Clone, FromRow)]
pub struct ToolRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub total_quantity: i32,
    pub condition: ToolCondition,
    pub unit_value: Decimal,
    pub acquisition_date: Option<NaiveDate>,
    pub maintenance_cost: Option<Decimal>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    #[sqlx(default)]
    pub borrowed_quantity: i64,
}

impl From<ToolRow> for Tool {
    fn from(row: ToolRow) -> Self {
        Tool {
            available_quantity: crate::ledger::available_quantity(
                row.total_quantity,
                row.borrowed_quantity,
            ),
            id: row.id,
            name: row.name,
            description: row.description,
            total_quantity: row.total_quantity,
            borrowed_quantity: row.borrowed_quantity,
            condition: row.condition,
            unit_value: row.unit_value,
            acquisition_date: row.acquisition_date,
            maintenance_cost: row.maintenance_cost,
            last_maintenance_date: row.last_maintenance_date,
            next_maintenance_date: row.next_maintenance_date,
            supplier: row.supplier,
        }
    }
}

/// Tool with derived availability
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tool {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub total_quantity: i32,
    /// Units not currently on loan
    pub available_quantity: i64,
    /// Units held by active loans
    pub borrowed_quantity: i64,
    pub condition: ToolCondition,
    #[schema(value_type = String, example = "49.90")]
    pub unit_value: Decimal,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub maintenance_cost: Option<Decimal>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub supplier: Option<String>,
}

/// Create tool request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTool {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: Option<i32>,
    pub condition: Option<ToolCondition>,
    #[schema(value_type = Option<String>)]
    pub unit_value: Option<Decimal>,
    pub acquisition_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub maintenance_cost: Option<Decimal>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub supplier: Option<String>,
}

/// Partial update request (PATCH).
///
/// Absent fields keep their value. For the nullable columns an explicit
/// `null` clears the stored value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTool {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: Option<i32>,
    pub condition: Option<ToolCondition>,
    #[schema(value_type = Option<String>)]
    pub unit_value: Option<Decimal>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub acquisition_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub maintenance_cost: Option<Option<Decimal>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub last_maintenance_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub next_maintenance_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[validate(length(max = 255))]
    #[schema(value_type = Option<String>)]
    pub supplier: Option<Option<String>>,
}

/// Condition change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConditionChange {
    pub condition: ToolCondition,
    #[schema(value_type = Option<String>)]
    pub maintenance_cost: Option<Decimal>,
    pub last_maintenance_date: Option<NaiveDate>,
}

/// Full set of writable tool columns, checked by the ledger before it is stored
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDraft {
    pub name: String,
    pub description: Option<String>,
    pub total_quantity: i32,
    pub condition: ToolCondition,
    pub unit_value: Decimal,
    pub acquisition_date: Option<NaiveDate>,
    pub maintenance_cost: Option<Decimal>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub supplier: Option<String>,
}

impl From<CreateTool> for ToolDraft {
    fn from(data: CreateTool) -> Self {
        Self {
            name: data.name,
            description: data.description,
            total_quantity: data.total_quantity.unwrap_or(0),
            condition: data.condition.unwrap_or_default(),
            unit_value: data.unit_value.unwrap_or(Decimal::ZERO),
            acquisition_date: data.acquisition_date,
            maintenance_cost: data.maintenance_cost,
            last_maintenance_date: data.last_maintenance_date,
            next_maintenance_date: data.next_maintenance_date,
            supplier: data.supplier,
        }
    }
}

impl From<&Tool> for ToolDraft {
    fn from(tool: &Tool) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            total_quantity: tool.total_quantity,
            condition: tool.condition,
            unit_value: tool.unit_value,
            acquisition_date: tool.acquisition_date,
            maintenance_cost: tool.maintenance_cost,
            last_maintenance_date: tool.last_maintenance_date,
            next_maintenance_date: tool.next_maintenance_date,
            supplier: tool.supplier.clone(),
        }
    }
}

impl ToolDraft {
    /// Overlay the fields present in a partial update; `Some(None)` clears
    pub fn merge(mut self, data: UpdateTool) -> Self {
        macro_rules! merge_field {
            ($($field:ident),*) => {
                $(
                    if let Some(value) = data.$field {
                        self.$field = value;
                    }
                )*
            };
        }

        merge_field!(name, total_quantity, condition, unit_value);
        merge_field!(
            description,
            acquisition_date,
            maintenance_cost,
            last_maintenance_date,
            next_maintenance_date,
            supplier
        );

        self
    }

    /// Overlay a condition change
    pub fn with_condition(mut self, change: ConditionChange) -> Self {
        self.condition = change.condition;
        if change.maintenance_cost.is_some() {
            self.maintenance_cost = change.maintenance_cost;
        }
        if change.last_maintenance_date.is_some() {
            self.last_maintenance_date = change.last_maintenance_date;
        }
        self
    }
}
