//! Application state for the users service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::repository::{PgUserRepository, UserRepository};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service_name: Arc<str>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(service_name: impl Into<Arc<str>>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            service_name: service_name.into(),
            users,
        }
    }

    /// State backed by the PostgreSQL server named in `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.service_name.as_str(),
            Arc::new(PgUserRepository::new(&config.database)),
        )
    }
}
