//! Inventory ledger rules
//!
//! Pure accounting over tools and loans. Availability is always derived from
//! the active loans of a tool and never stored. The repository calls these
//! checks while it holds the row locks of the affected tool, so a check and
//! the write that depends on it happen in the same transaction.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::Loan,
        report::{
            AnalyticsReport, ConditionCount, DashboardSummary, MonthlyCost, MonthlyCount,
            ToolValue,
        },
        tool::{Tool, ToolCondition, ToolDraft},
    },
};

/// Number of tools listed in the inventory value chart
pub const TOP_VALUE_LIMIT: usize = 10;

/// Largest amount a `NUMERIC(10,2)` money column holds (99 999 999.99)
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Sum of quantities held by active loans of a tool
pub fn borrowed_quantity<'a, I>(tool_id: i32, loans: I) -> i64
where
    I: IntoIterator<Item = &'a Loan>,
{
    loans
        .into_iter()
        .filter(|l| l.tool_id == tool_id && l.is_active())
        .map(|l| i64::from(l.quantity))
        .sum()
}

pub fn available_quantity(total_quantity: i32, borrowed: i64) -> i64 {
    i64::from(total_quantity) - borrowed
}

/// Quantity the loan already holds on `tool_id`, returned to the pool while
/// the loan itself is being edited.
pub fn own_reservation(loan: &Loan, tool_id: i32) -> i64 {
    if loan.is_active() && loan.tool_id == tool_id {
        i64::from(loan.quantity)
    } else {
        0
    }
}

pub fn effective_availability(available: i64, own_reservation: i64) -> i64 {
    available + own_reservation
}

/// Reject a request for more units than are available
pub fn ensure_available(requested: i32, available: i64) -> AppResult<()> {
    if i64::from(requested) > available {
        return Err(AppError::InsufficientStock {
            requested: i64::from(requested),
            available,
        });
    }
    Ok(())
}

/// A tool's total quantity may not drop below what is out on loan
pub fn ensure_capacity(total_quantity: i32, borrowed: i64) -> AppResult<()> {
    if available_quantity(total_quantity, borrowed) < 0 {
        return Err(AppError::StockInUse {
            total: i64::from(total_quantity),
            borrowed,
        });
    }
    Ok(())
}

pub fn ensure_returnable(loan: &Loan) -> AppResult<()> {
    if loan.is_active() {
        Ok(())
    } else {
        Err(AppError::AlreadyReturned(loan.id))
    }
}

pub fn is_overdue(due_date: NaiveDate, returned_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    returned_date.is_none() && due_date < today
}

/// Round a money input to cents the way the database column stores it
fn to_cents(value: Decimal, field: &str) -> AppResult<Decimal> {
    let value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if value > MAX_MONEY {
        return Err(AppError::Validation(format!(
            "{} cannot exceed {}",
            field, MAX_MONEY
        )));
    }
    Ok(value)
}

/// Normalize a tool before it is written.
///
/// Money is rounded to cents first. A tool in maintenance has no usable
/// stock: its total quantity is forced to zero, it must carry a positive
/// maintenance cost, and its last maintenance date defaults to `today`.
pub fn apply_condition_rules(draft: &mut ToolDraft, today: NaiveDate) -> AppResult<()> {
    if draft.unit_value < Decimal::ZERO {
        return Err(AppError::Validation("Unit value cannot be negative".to_string()));
    }
    if draft.total_quantity < 0 {
        return Err(AppError::Validation("Total quantity cannot be negative".to_string()));
    }
    if let Some(cost) = draft.maintenance_cost {
        if cost < Decimal::ZERO {
            return Err(AppError::InvalidMaintenanceCost);
        }
    }

    draft.unit_value = to_cents(draft.unit_value, "Unit value")?;
    draft.maintenance_cost = draft
        .maintenance_cost
        .map(|cost| to_cents(cost, "Maintenance cost"))
        .transpose()?;

    if draft.condition == ToolCondition::Maintenance {
        match draft.maintenance_cost {
            Some(cost) if cost > Decimal::ZERO => {}
            _ => return Err(AppError::InvalidMaintenanceCost),
        }
        draft.total_quantity = 0;
        if draft.last_maintenance_date.is_none() {
            draft.last_maintenance_date = Some(today);
        }
    }

    Ok(())
}

fn money(mut value: Decimal) -> Decimal {
    value.rescale(2);
    value
}

fn stock_value(tool: &Tool) -> Decimal {
    Decimal::from(tool.total_quantity) * tool.unit_value
}

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Summary counters for the dashboard
pub fn dashboard(tools: &[Tool], loans: &[Loan], today: NaiveDate) -> DashboardSummary {
    let active: Vec<&Loan> = loans.iter().filter(|l| l.is_active()).collect();

    let total_units: i64 = tools.iter().map(|t| i64::from(t.total_quantity)).sum();
    let borrowed_units: i64 = active.iter().map(|l| i64::from(l.quantity)).sum();

    DashboardSummary {
        total_tool_types: tools.len() as i64,
        active_loans_count: active.len() as i64,
        overdue_loans_count: active
            .iter()
            .filter(|l| is_overdue(l.due_date, l.returned_date, today))
            .count() as i64,
        available_in_warehouse: total_units - borrowed_units,
        tools_in_maintenance: tools
            .iter()
            .filter(|t| t.condition == ToolCondition::Maintenance)
            .count() as i64,
        total_maintenance_cost: money(tools.iter().filter_map(|t| t.maintenance_cost).sum()),
        total_inventory_value: money(tools.iter().map(stock_value).sum()),
    }
}

/// Grouped chart data for the analytics page
pub fn analytics(tools: &[Tool], loans: &[Loan]) -> AnalyticsReport {
    let mut by_condition: BTreeMap<&'static str, (ToolCondition, i64)> = BTreeMap::new();
    for tool in tools {
        by_condition
            .entry(tool.condition.as_str())
            .or_insert((tool.condition, 0))
            .1 += 1;
    }

    let mut values: Vec<ToolValue> = tools
        .iter()
        .map(|t| ToolValue {
            name: t.name.clone(),
            total_value: money(stock_value(t)),
        })
        .collect();
    values.sort_by(|a, b| {
        b.total_value
            .cmp(&a.total_value)
            .then_with(|| a.name.cmp(&b.name))
    });
    values.truncate(TOP_VALUE_LIMIT);

    let mut maintenance: BTreeMap<String, Decimal> = BTreeMap::new();
    for tool in tools {
        if let Some(date) = tool.last_maintenance_date {
            *maintenance.entry(month_key(date)).or_insert(Decimal::ZERO) +=
                tool.maintenance_cost.unwrap_or(Decimal::ZERO);
        }
    }

    let mut activity: BTreeMap<String, i64> = BTreeMap::new();
    for loan in loans {
        *activity.entry(month_key(loan.borrowed_date)).or_insert(0) += 1;
    }

    AnalyticsReport {
        tools_by_condition: by_condition
            .into_values()
            .map(|(condition, count)| ConditionCount { condition, count })
            .collect(),
        inventory_value_by_tool: values,
        maintenance_cost_over_time: maintenance
            .into_iter()
            .map(|(month, total_cost)| MonthlyCost {
                month,
                total_cost: money(total_cost),
            })
            .collect(),
        loan_activity: activity
            .into_iter()
            .map(|(month, count)| MonthlyCount { month, count })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tool(id: i32, name: &str, total_quantity: i32, unit_value: i64) -> Tool {
        Tool {
            id,
            name: name.to_string(),
            description: None,
            total_quantity,
            available_quantity: i64::from(total_quantity),
            borrowed_quantity: 0,
            condition: ToolCondition::Good,
            unit_value: Decimal::from(unit_value),
            acquisition_date: None,
            maintenance_cost: None,
            last_maintenance_date: None,
            next_maintenance_date: None,
            supplier: None,
        }
    }

    fn loan(id: i32, tool_id: i32, quantity: i32, due_date: NaiveDate) -> Loan {
        Loan {
            id,
            tool_id,
            borrower_id: 1,
            quantity,
            borrowed_date: date(2024, 1, 10),
            due_date,
            returned_date: None,
            tool_name: String::new(),
            borrower_username: String::new(),
            is_overdue: false,
        }
    }

    fn draft(condition: ToolCondition, maintenance_cost: Option<Decimal>) -> ToolDraft {
        ToolDraft {
            name: "Grinder".to_string(),
            description: None,
            total_quantity: 4,
            condition,
            unit_value: Decimal::new(2500, 2),
            acquisition_date: None,
            maintenance_cost,
            last_maintenance_date: None,
            next_maintenance_date: None,
            supplier: None,
        }
    }

    /// In-memory stand-in for one tool row and its loans, applying the same
    /// checks the repository runs inside its transactions.
    struct Stock {
        total: i32,
        loans: Vec<Loan>,
    }

    impl Stock {
        fn available(&self) -> i64 {
            available_quantity(self.total, borrowed_quantity(1, &self.loans))
        }

        fn create(&mut self, quantity: i32) -> AppResult<i32> {
            ensure_available(quantity, self.available())?;
            let id = self.loans.len() as i32 + 1;
            self.loans.push(loan(id, 1, quantity, date(2024, 2, 1)));
            Ok(id)
        }

        fn update(&mut self, id: i32, quantity: i32) -> AppResult<()> {
            let available = self.available();
            let current = self.loans.iter_mut().find(|l| l.id == id).unwrap();
            ensure_available(
                quantity,
                effective_availability(available, own_reservation(current, 1)),
            )?;
            current.quantity = quantity;
            Ok(())
        }

        fn return_loan(&mut self, id: i32, today: NaiveDate) -> AppResult<()> {
            let current = self.loans.iter_mut().find(|l| l.id == id).unwrap();
            ensure_returnable(current)?;
            current.returned_date = Some(today);
            Ok(())
        }
    }

    #[test]
    fn test_borrow_update_sequence() {
        let mut stock = Stock { total: 10, loans: Vec::new() };
        assert_eq!(stock.available(), 10);

        let first = stock.create(4).unwrap();
        assert_eq!(stock.available(), 6);

        let err = stock.create(7).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { requested: 7, available: 6 }
        ));
        assert_eq!(stock.loans.len(), 1);

        stock.update(first, 6).unwrap();
        assert_eq!(stock.available(), 4);
    }

    #[test]
    fn test_update_beyond_effective_availability_fails() {
        let mut stock = Stock { total: 10, loans: Vec::new() };
        let first = stock.create(4).unwrap();
        stock.create(5).unwrap();

        // 1 free + 4 held by the loan itself
        assert!(stock.update(first, 5).is_ok());
        assert!(matches!(
            stock.update(first, 6),
            Err(AppError::InsufficientStock { requested: 6, available: 5 })
        ));
        assert_eq!(stock.available(), 0);
    }

    #[test]
    fn test_return_restores_availability_once() {
        let today = date(2024, 3, 1);
        let mut stock = Stock { total: 3, loans: Vec::new() };
        let id = stock.create(2).unwrap();
        assert_eq!(stock.available(), 1);

        stock.return_loan(id, today).unwrap();
        assert_eq!(stock.available(), 3);
        assert_eq!(stock.loans[0].returned_date, Some(today));

        let err = stock.return_loan(id, date(2024, 3, 5)).unwrap_err();
        assert!(matches!(err, AppError::AlreadyReturned(1)));
        assert_eq!(stock.loans[0].returned_date, Some(today));
    }

    #[test]
    fn test_own_reservation_only_on_same_active_tool() {
        let mut current = loan(1, 1, 3, date(2024, 2, 1));
        assert_eq!(own_reservation(&current, 1), 3);
        assert_eq!(own_reservation(&current, 2), 0);

        current.returned_date = Some(date(2024, 1, 20));
        assert_eq!(own_reservation(&current, 1), 0);
    }

    #[test]
    fn test_capacity_check() {
        assert!(ensure_capacity(5, 5).is_ok());
        assert!(matches!(
            ensure_capacity(0, 2),
            Err(AppError::StockInUse { total: 0, borrowed: 2 })
        ));
    }

    #[test]
    fn test_maintenance_forces_zero_quantity() {
        let today = date(2024, 4, 2);
        let mut tool = draft(ToolCondition::Maintenance, Some(Decimal::new(1500, 2)));
        apply_condition_rules(&mut tool, today).unwrap();
        assert_eq!(tool.total_quantity, 0);
        assert_eq!(tool.last_maintenance_date, Some(today));

        let mut tool = draft(ToolCondition::Maintenance, Some(Decimal::ONE));
        tool.last_maintenance_date = Some(date(2024, 3, 30));
        apply_condition_rules(&mut tool, today).unwrap();
        assert_eq!(tool.last_maintenance_date, Some(date(2024, 3, 30)));
    }

    #[test]
    fn test_maintenance_requires_positive_cost() {
        let today = date(2024, 4, 2);
        for cost in [None, Some(Decimal::ZERO), Some(Decimal::new(-100, 2))] {
            let mut tool = draft(ToolCondition::Maintenance, cost);
            assert!(matches!(
                apply_condition_rules(&mut tool, today),
                Err(AppError::InvalidMaintenanceCost)
            ));
        }
    }

    #[test]
    fn test_sub_cent_maintenance_cost_is_rejected() {
        let today = date(2024, 4, 2);
        let mut tool = draft(ToolCondition::Maintenance, Some(Decimal::new(1, 3)));
        assert!(matches!(
            apply_condition_rules(&mut tool, today),
            Err(AppError::InvalidMaintenanceCost)
        ));

        // 0.005 rounds up to one cent
        let mut tool = draft(ToolCondition::Maintenance, Some(Decimal::new(5, 3)));
        apply_condition_rules(&mut tool, today).unwrap();
        assert_eq!(tool.maintenance_cost, Some(Decimal::new(1, 2)));
    }

    #[test]
    fn test_money_is_rounded_to_cents() {
        let mut tool = draft(ToolCondition::Good, Some(Decimal::new(123_456, 4)));
        tool.unit_value = Decimal::new(99_994, 3);
        apply_condition_rules(&mut tool, date(2024, 4, 2)).unwrap();
        assert_eq!(tool.unit_value, Decimal::new(9999, 2));
        assert_eq!(tool.maintenance_cost, Some(Decimal::new(1235, 2)));
    }

    #[test]
    fn test_money_over_column_precision_is_rejected() {
        let today = date(2024, 4, 2);

        let mut tool = draft(ToolCondition::Good, None);
        tool.unit_value = Decimal::new(100_000_000, 0);
        assert!(matches!(
            apply_condition_rules(&mut tool, today),
            Err(AppError::Validation(_))
        ));

        let mut tool = draft(ToolCondition::Maintenance, Some(Decimal::new(100_000_000, 0)));
        assert!(matches!(
            apply_condition_rules(&mut tool, today),
            Err(AppError::Validation(_))
        ));

        let mut tool = draft(ToolCondition::Good, None);
        tool.unit_value = MAX_MONEY;
        apply_condition_rules(&mut tool, today).unwrap();
        assert_eq!(tool.unit_value, Decimal::new(9_999_999_999, 2));
    }

    #[test]
    fn test_other_conditions_keep_quantity() {
        let mut tool = draft(ToolCondition::Recovered, None);
        apply_condition_rules(&mut tool, date(2024, 4, 2)).unwrap();
        assert_eq!(tool.total_quantity, 4);
        assert_eq!(tool.last_maintenance_date, None);
    }

    #[test]
    fn test_overdue() {
        let today = date(2024, 3, 10);
        assert!(is_overdue(date(2024, 3, 9), None, today));
        assert!(!is_overdue(date(2024, 3, 10), None, today));
        assert!(!is_overdue(date(2024, 3, 9), Some(today), today));
    }

    #[test]
    fn test_dashboard_totals() {
        let today = date(2024, 3, 10);
        let mut broken = tool(3, "Welder", 0, 300);
        broken.condition = ToolCondition::Maintenance;
        broken.maintenance_cost = Some(Decimal::new(4550, 2));

        let tools = vec![tool(1, "ToolA", 5, 10), tool(2, "ToolB", 2, 50), broken];

        let mut returned = loan(3, 1, 1, date(2024, 1, 1));
        returned.returned_date = Some(date(2024, 1, 2));
        let loans = vec![
            loan(1, 1, 2, date(2024, 3, 1)),
            loan(2, 2, 1, date(2024, 4, 1)),
            returned,
        ];

        let summary = dashboard(&tools, &loans, today);
        assert_eq!(summary.total_tool_types, 3);
        assert_eq!(summary.active_loans_count, 2);
        assert_eq!(summary.overdue_loans_count, 1);
        assert_eq!(summary.available_in_warehouse, 4);
        assert_eq!(summary.tools_in_maintenance, 1);
        assert_eq!(summary.total_maintenance_cost, Decimal::new(4550, 2));
        assert_eq!(summary.total_inventory_value, Decimal::from(150));
        assert_eq!(summary.total_inventory_value.to_string(), "150.00");
    }

    #[test]
    fn test_analytics_grouping() {
        let mut tools: Vec<Tool> = (1..=12)
            .map(|i| tool(i, &format!("Tool{:02}", i), 1, i64::from(i)))
            .collect();
        tools[0].condition = ToolCondition::New;
        tools[1].condition = ToolCondition::Maintenance;
        tools[1].maintenance_cost = Some(Decimal::from(20));
        tools[1].last_maintenance_date = Some(date(2024, 2, 14));
        tools[2].maintenance_cost = Some(Decimal::from(5));
        tools[2].last_maintenance_date = Some(date(2024, 2, 3));
        tools[3].last_maintenance_date = Some(date(2024, 1, 9));

        let mut loans = vec![
            loan(1, 1, 1, date(2024, 5, 1)),
            loan(2, 1, 1, date(2024, 5, 1)),
            loan(3, 2, 1, date(2024, 5, 1)),
        ];
        loans[2].borrowed_date = date(2023, 12, 30);

        let report = analytics(&tools, &loans);

        let conditions: Vec<(ToolCondition, i64)> = report
            .tools_by_condition
            .iter()
            .map(|c| (c.condition, c.count))
            .collect();
        assert_eq!(
            conditions,
            vec![
                (ToolCondition::Good, 10),
                (ToolCondition::Maintenance, 1),
                (ToolCondition::New, 1),
            ]
        );

        assert_eq!(report.inventory_value_by_tool.len(), TOP_VALUE_LIMIT);
        assert_eq!(report.inventory_value_by_tool[0].name, "Tool12");
        assert_eq!(report.inventory_value_by_tool[9].name, "Tool03");

        let maintenance: Vec<(&str, Decimal)> = report
            .maintenance_cost_over_time
            .iter()
            .map(|m| (m.month.as_str(), m.total_cost))
            .collect();
        assert_eq!(
            maintenance,
            vec![("2024-01", Decimal::ZERO), ("2024-02", Decimal::from(25))]
        );

        let activity: Vec<(&str, i64)> = report
            .loan_activity
            .iter()
            .map(|m| (m.month.as_str(), m.count))
            .collect();
        assert_eq!(activity, vec![("2023-12", 1), ("2024-01", 2)]);
    }

    #[test]
    fn test_empty_reports() {
        let today = date(2024, 1, 1);
        let summary = dashboard(&[], &[], today);
        assert_eq!(summary.total_inventory_value.to_string(), "0.00");
        assert_eq!(summary.available_in_warehouse, 0);

        let report = analytics(&[], &[]);
        assert!(report.tools_by_condition.is_empty());
        assert!(report.loan_activity.is_empty());
    }
}
