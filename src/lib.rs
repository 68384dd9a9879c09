//! schedsync - scheduled prompt tasks kept in sync with a cron-trigger service
//!
//! Every task record owns at most one registration at an external schedule
//! service. Lifecycle operations update both sides so that an enabled task
//! always points at a live schedule and a disabled task points at none.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the store / schedule service ports
//! - **Service Layer** (`services`): the reconciler, the lifecycle orchestrator and drift correction
//! - **Adapters** (`adapters`): SQLite store, HTTP schedule client, in-memory fakes
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use schedsync::adapters::memory::{InMemoryScheduleService, InMemoryTaskStore};
//! use schedsync::{NewTask, TaskSyncService};
//!
//! let sync = TaskSyncService::new(Arc::new(InMemoryTaskStore::new()), Arc::new(InMemoryScheduleService::new()));
//! let task = sync
//!     .create_task(NewTask::new("Digest", "Summarise the week", "0 9 * * 1", "acc-1", "artist-1"))
//!     .await?;
//! assert!(task.external_schedule_id.is_some());
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, DatabaseConfig, ExternalSchedule, LoggingConfig, NewTask, RetryConfig, ScheduleRequest,
    ScheduleServiceConfig, Task, TaskFilter, TaskUpdate,
};
pub use domain::ports::{ScheduleService, ScheduleServiceError, TaskStore};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{reconcile, DriftCorrector, DriftReport, ScheduleAction, TaskSyncService};
