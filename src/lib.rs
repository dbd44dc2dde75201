//! Library rental server
//!
//! REST JSON API for renting books: a catalog with per-title inventory,
//! borrowings that take and give back copies atomically, and JWT-authenticated
//! user accounts.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire repository and services on top of a database pool
    pub fn new(config: &AppConfig, pool: sqlx::PgPool) -> Self {
        let repository = repository::Repository::new(pool);
        let services = services::Services::new(repository, config.auth.clone());
        Self {
            services: Arc::new(services),
        }
    }
}
