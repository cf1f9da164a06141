//! Loan management service

use crate::{
    context::RequestContext,
    error::AppResult,
    models::loan::{CreateLoan, Loan, LoanFilter, NewLoan, UpdateLoan},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, ctx: &RequestContext, filter: LoanFilter) -> AppResult<Vec<Loan>> {
        let loans = self.repository.loans.list(filter).await?;
        Ok(loans
            .into_iter()
            .map(|l| l.with_overdue_flag(ctx.today))
            .collect())
    }

    pub async fn get_by_id(&self, ctx: &RequestContext, id: i32) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(id).await?;
        Ok(loan.with_overdue_flag(ctx.today))
    }

    /// Borrow units of a tool; the borrower defaults to the requesting user
    pub async fn create(&self, ctx: &RequestContext, data: CreateLoan) -> AppResult<Loan> {
        let new_loan = NewLoan {
            tool_id: data.tool_id,
            borrower_id: data.borrower_id.unwrap_or(ctx.user_id),
            quantity: data.quantity,
            borrowed_date: ctx.today,
            due_date: data.due_date,
        };

        let loan = self.repository.loans.create(&new_loan).await?;
        tracing::info!(
            user = %ctx.username,
            loan_id = loan.id,
            tool_id = loan.tool_id,
            borrower_id = loan.borrower_id,
            quantity = loan.quantity,
            "Loan created"
        );
        Ok(loan.with_overdue_flag(ctx.today))
    }

    pub async fn update(&self, ctx: &RequestContext, id: i32, data: UpdateLoan) -> AppResult<Loan> {
        let loan = self.repository.loans.update(id, &data).await?;
        tracing::info!(
            user = %ctx.username,
            loan_id = id,
            tool_id = loan.tool_id,
            quantity = loan.quantity,
            "Loan updated"
        );
        Ok(loan.with_overdue_flag(ctx.today))
    }

    /// Return a loan; a loan can only be returned once
    pub async fn return_loan(&self, ctx: &RequestContext, id: i32) -> AppResult<Loan> {
        let loan = self.repository.loans.return_loan(id, ctx.today).await?;
        tracing::info!(user = %ctx.username, loan_id = id, "Loan returned");
        Ok(loan.with_overdue_flag(ctx.today))
    }

    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> AppResult<()> {
        self.repository.loans.delete(id).await?;
        tracing::info!(user = %ctx.username, loan_id = id, "Loan deleted");
        Ok(())
    }
}
