//! Port trait definitions (Hexagonal Architecture)
//!
//! - TaskStore: durable storage for task records
//! - ScheduleService: the remote cron-trigger service
//!
//! The synchronization services depend only on these traits, so the core
//! can be driven against SQLite and HTTP in production and against
//! in-memory implementations in tests.

pub mod schedule_service;
pub mod task_store;

pub use schedule_service::{ScheduleService, ScheduleServiceError};
pub use task_store::TaskStore;
