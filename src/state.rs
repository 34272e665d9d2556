//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::storage::S3Client;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: S3Client,
    db: SqlitePool,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, store: S3Client, db: SqlitePool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store, db }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the object storage client
    pub fn store(&self) -> &S3Client {
        &self.inner.store
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }
}
