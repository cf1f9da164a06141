//! Dashboard and analytics service

use crate::{
    context::RequestContext,
    error::AppResult,
    ledger,
    models::{
        loan::LoanFilter,
        report::{AnalyticsReport, DashboardSummary},
    },
    repository::Repository,
};

/// Read-only reports over a snapshot of tools and loans.
///
/// The snapshot is not transactional; reports may lag a concurrent write.
#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn dashboard(&self, ctx: &RequestContext) -> AppResult<DashboardSummary> {
        let tools = self.repository.tools.list().await?;
        let loans = self.repository.loans.list(LoanFilter::Active).await?;
        Ok(ledger::dashboard(&tools, &loans, ctx.today))
    }

    pub async fn analytics(&self, _ctx: &RequestContext) -> AppResult<AnalyticsReport> {
        let tools = self.repository.tools.list().await?;
        let loans = self.repository.loans.list(LoanFilter::All).await?;
        Ok(ledger::analytics(&tools, &loans))
    }
}
