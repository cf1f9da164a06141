//! Business logic services

pub mod export;
pub mod loans;
pub mod reports;
pub mod tools;
pub mod users;

use crate::{config::AuthConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub tools: tools::ToolsService,
    pub loans: loans::LoansService,
    pub reports: reports::ReportsService,
    pub export: export::ExportService,
    pub users: users::UsersService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> Self {
        Self {
            tools: tools::ToolsService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone()),
            reports: reports::ReportsService::new(repository.clone()),
            export: export::ExportService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), auth_config),
            repository,
        }
    }

    /// Check that the database answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
