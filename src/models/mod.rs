//! Data models for Toolcrib

pub mod loan;
pub mod report;
pub mod tool;
pub mod user;

// Re-export commonly used types
pub use loan::{Loan, LoanFilter};
pub use report::{AnalyticsReport, DashboardSummary};
pub use tool::{Tool, ToolCondition};
pub use user::{Permission, User, UserClaims};
