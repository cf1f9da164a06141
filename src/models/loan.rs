//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Loan with the names of the related tool and borrower
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub tool_id: i32,
    pub borrower_id: i32,
    pub quantity: i32,
    pub borrowed_date: NaiveDate,
    pub due_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
    pub tool_name: String,
    pub borrower_username: String,
    /// Filled in against the request date, not stored
    #[sqlx(skip)]
    #[serde(default)]
    pub is_overdue: bool,
}

/// Loan lifecycle state as seen on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl LoanStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Active => "Active",
            LoanStatus::Overdue => "Overdue",
            LoanStatus::Returned => "Returned",
        }
    }
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.returned_date.is_none()
    }

    pub fn status(&self, today: NaiveDate) -> LoanStatus {
        if !self.is_active() {
            LoanStatus::Returned
        } else if crate::ledger::is_overdue(self.due_date, self.returned_date, today) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    /// Set `is_overdue` for the given day
    pub fn with_overdue_flag(mut self, today: NaiveDate) -> Self {
        self.is_overdue = self.status(today) == LoanStatus::Overdue;
        self
    }
}

/// Which loans a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanFilter {
    All,
    /// Not yet returned
    Active,
    /// Not yet returned and due before the given day
    Overdue(NaiveDate),
    /// Returned
    History,
}

fn default_quantity() -> i32 {
    1
}

/// Create loan request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    pub tool_id: i32,
    /// Defaults to the requesting user
    pub borrower_id: Option<i32>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub due_date: NaiveDate,
}

/// Update loan request (PUT and PATCH); absent fields keep their value
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLoan {
    pub tool_id: Option<i32>,
    pub borrower_id: Option<i32>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub due_date: Option<NaiveDate>,
}

/// Loan ready to be inserted
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub tool_id: i32,
    pub borrower_id: i32,
    pub quantity: i32,
    pub borrowed_date: NaiveDate,
    pub due_date: NaiveDate,
}
