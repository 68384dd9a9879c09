pub mod config;
pub mod schedule;
pub mod task;

pub use config::{Config, DatabaseConfig, LoggingConfig, RetryConfig, ScheduleServiceConfig};
pub use schedule::{ExternalSchedule, ScheduleRequest};
pub use task::{NewTask, Task, TaskFilter, TaskPatch, TaskUpdate, DEFAULT_TIMEZONE};
