//! In-process implementations of the task store and schedule service.
//!
//! Used by the unit and integration test suites.

pub mod schedule_service;
pub mod task_store;

pub use schedule_service::{InMemoryScheduleService, ScheduleCall};
pub use task_store::InMemoryTaskStore;
