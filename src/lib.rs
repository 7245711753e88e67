//! Gameshelf Server
//!
//! Personal game catalog backend: a filterable list of games stored in
//! PostgreSQL, manual entry, and a bulk CSV import that reconciles each row
//! against an external metadata provider.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod provider;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}
