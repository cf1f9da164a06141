//! CSV export of tools and loans

use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use rust_decimal::Decimal;

use crate::{
    context::RequestContext,
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanFilter},
        tool::Tool,
    },
    repository::Repository,
};

const TOOL_HEADERS: [&str; 11] = [
    "Name",
    "Description",
    "Total Quantity",
    "Available Quantity",
    "Condition",
    "Unit Value",
    "Acquisition Date",
    "Maintenance Cost",
    "Last Maintenance",
    "Next Maintenance",
    "Supplier",
];

const ACTIVE_LOAN_HEADERS: [&str; 6] = ["Tool", "Borrower", "Quantity", "Borrowed Date", "Due Date", "Status"];

const HISTORY_HEADERS: [&str; 6] = [
    "Tool",
    "Borrower",
    "Quantity",
    "Borrowed Date",
    "Due Date",
    "Returned Date",
];

/// A rendered CSV document and the file name it is served under
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub filename: &'static str,
    pub content: String,
}

#[derive(Clone)]
pub struct ExportService {
    repository: Repository,
}

impl ExportService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn tools(&self, ctx: &RequestContext) -> AppResult<CsvFile> {
        let tools = self.repository.tools.list().await?;
        tracing::info!(user = %ctx.username, rows = tools.len(), "Exporting tools");
        Ok(CsvFile {
            filename: "tools.csv",
            content: render_tools(&tools)?,
        })
    }

    pub async fn active_loans(&self, ctx: &RequestContext) -> AppResult<CsvFile> {
        let loans = self.repository.loans.list(LoanFilter::Active).await?;
        tracing::info!(user = %ctx.username, rows = loans.len(), "Exporting active loans");
        Ok(CsvFile {
            filename: "active_loans.csv",
            content: render_active_loans(&loans, ctx.today)?,
        })
    }

    pub async fn loan_history(&self, ctx: &RequestContext) -> AppResult<CsvFile> {
        let loans = self.repository.loans.list(LoanFilter::History).await?;
        tracing::info!(user = %ctx.username, rows = loans.len(), "Exporting loan history");
        Ok(CsvFile {
            filename: "loan_history.csv",
            content: render_loan_history(&loans)?,
        })
    }
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn opt_money(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows<I>(headers: &[&str], rows: I) -> AppResult<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());

    writer.write_record(headers).map_err(csv_error)?;
    for row in rows {
        writer.write_record(&row).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("CSV write failed: {}", e))
}

/// Render the tool inventory, one row per tool
pub fn render_tools(tools: &[Tool]) -> AppResult<String> {
    write_rows(
        &TOOL_HEADERS,
        tools.iter().map(|t| {
            vec![
                t.name.clone(),
                t.description.clone().unwrap_or_default(),
                t.total_quantity.to_string(),
                t.available_quantity.to_string(),
                t.condition.label().to_string(),
                t.unit_value.to_string(),
                opt_date(t.acquisition_date),
                opt_money(t.maintenance_cost),
                opt_date(t.last_maintenance_date),
                opt_date(t.next_maintenance_date),
                t.supplier.clone().unwrap_or_default(),
            ]
        }),
    )
}

/// Render loans not yet returned, flagging those past due on `today`
pub fn render_active_loans(loans: &[Loan], today: NaiveDate) -> AppResult<String> {
    write_rows(
        &ACTIVE_LOAN_HEADERS,
        loans.iter().filter(|l| l.is_active()).map(|l| {
            vec![
                l.tool_name.clone(),
                l.borrower_username.clone(),
                l.quantity.to_string(),
                l.borrowed_date.to_string(),
                l.due_date.to_string(),
                l.status(today).label().to_string(),
            ]
        }),
    )
}

/// Render returned loans
pub fn render_loan_history(loans: &[Loan]) -> AppResult<String> {
    write_rows(
        &HISTORY_HEADERS,
        loans.iter().filter(|l| !l.is_active()).map(|l| {
            vec![
                l.tool_name.clone(),
                l.borrower_username.clone(),
                l.quantity.to_string(),
                l.borrowed_date.to_string(),
                l.due_date.to_string(),
                opt_date(l.returned_date),
            ]
        }),
    )
}
