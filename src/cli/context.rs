//! Wiring of adapters and services for a CLI invocation.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteTaskStore};
use crate::adapters::trigger::TriggerScheduleClient;
use crate::domain::models::config::Config;
use crate::domain::ports::{ScheduleService, TaskStore};
use crate::services::{DriftCorrector, TaskSyncService};

pub struct AppContext {
    pub config: Config,
    pub sync: TaskSyncService,
    pub corrector: DriftCorrector,
}

impl AppContext {
    /// Open the configured database and schedule service.
    pub async fn from_config(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.database.url(), Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to open task database at {}", config.database.path))?;
        let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(pool));

        let client = TriggerScheduleClient::from_config(&config.schedule_service, &config.retry)
            .context("Failed to configure schedule service client")?;
        let schedules: Arc<dyn ScheduleService> = Arc::new(client);

        Ok(Self::with_backends(config, store, schedules))
    }

    /// Build the services over explicit backends.
    pub fn with_backends(config: Config, store: Arc<dyn TaskStore>, schedules: Arc<dyn ScheduleService>) -> Self {
        let sync = TaskSyncService::new(store.clone(), schedules.clone())
            .with_default_timezone(config.schedule_service.default_timezone.clone());
        let corrector = DriftCorrector::new(store, schedules);
        Self { config, sync, corrector }
    }
}
