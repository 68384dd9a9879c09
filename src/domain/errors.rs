//! Domain errors for the schedule synchronization core.

use thiserror::Error;
use uuid::Uuid;

use super::ports::schedule_service::ScheduleServiceError;

/// Domain-level errors surfaced by the task store, the schedule service and
/// the synchronization flows built on top of them.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Schedule service error: {0}")]
    ScheduleService(#[from] ScheduleServiceError),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Task already exists: {0}")]
    DuplicateTask(Uuid),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    /// The schedule service was changed but the task store could not record
    /// it. The two systems disagree until a drift correction pass runs.
    #[error(
        "Task {task_id} is out of sync with schedule {}: {reason}",
        .external_schedule_id.as_deref().unwrap_or("<none>")
    )]
    Inconsistent {
        task_id: Uuid,
        external_schedule_id: Option<String>,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    /// Stable machine-readable kind, used for CLI and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "not_found",
            Self::ValidationFailed(_) => "validation_error",
            Self::ScheduleService(_) => "schedule_service_error",
            Self::DatabaseError(_) | Self::SerializationError(_) => "store_error",
            Self::DuplicateTask(_) | Self::ConcurrencyConflict { .. } => "conflict",
            Self::Inconsistent { .. } => "inconsistent",
        }
    }

    pub(crate) fn task_conflict(id: Uuid) -> Self {
        Self::ConcurrencyConflict {
            entity: "task".to_string(),
            id: id.to_string(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
