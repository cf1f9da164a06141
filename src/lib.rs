//! Toolcrib Inventory Server
//!
//! Tracks a tool warehouse: how many units of each tool exist, who has
//! borrowed them, and what is left on the shelf. Exposes a REST JSON API
//! with dashboard, analytics and CSV export views.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
