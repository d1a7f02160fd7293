//! Server state management.

use std::path::PathBuf;

use scd_core::{Database, ScdResult, StoreConfig};
use scd_domain::{DomainServices, DomainStores};

use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub stores: DomainStores,
    pub services: DomainServices,
    pub db_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(stores: DomainStores, config: &StoreConfig) -> Self {
        Self {
            services: stores.services(),
            stores,
            db_path: config.db_path.clone(),
        }
    }

    /// State over a private in-memory database.
    pub fn in_memory() -> ScdResult<Self> {
        let config = StoreConfig::default();
        let stores = DomainStores::with_config(Database::in_memory()?, &config)?;
        Ok(Self::new(stores, &config))
    }

    /// Run a blocking service call off the async workers.
    pub async fn run<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&DomainServices) -> ScdResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let services = self.services.clone();
        tokio::task::spawn_blocking(move || f(&services))
            .await
            .map_err(|e| ApiError::internal(format!("worker task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}
