use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::storage::{MemoryStorage, Storage, StorageClient};

/// Shared per-process handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = Arc::new(
            Storage::new(&config.storage)
                .await
                .context("init object storage")?,
        ) as Arc<dyn StorageClient>;

        Ok(Self::from_parts(db, Arc::new(config), storage))
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        Self {
            db,
            config,
            storage,
        }
    }

    /// State with a lazily connecting pool and in-memory storage. Must be
    /// built inside a tokio runtime; requests that never reach the database
    /// can be served without a Postgres instance.
    pub fn fake() -> Self {
        let config = AppConfig::fake();
        let db = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");

        Self::from_parts(db, Arc::new(config), Arc::new(MemoryStorage::default()))
    }
}
