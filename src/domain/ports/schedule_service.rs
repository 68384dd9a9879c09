//! Port for the external cron-trigger service.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::schedule::{ExternalSchedule, ScheduleRequest};

/// Failures reported by a schedule service implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleServiceError {
    #[error("Schedule not found: {0}")]
    NotFound(String),

    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ScheduleServiceError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound(_) | Self::InvalidResponse(_) => false,
        }
    }
}

#[async_trait]
pub trait ScheduleService: Send + Sync {
    /// Register a schedule. Must be idempotent on the request's
    /// deduplication key: a repeated call returns the existing schedule.
    async fn create_schedule(&self, request: &ScheduleRequest) -> Result<ExternalSchedule, ScheduleServiceError>;

    /// Remove a schedule. Unknown ids fail with `NotFound`.
    async fn delete_schedule(&self, schedule_id: &str) -> Result<(), ScheduleServiceError>;

    /// Look up a schedule, returning `None` if the service does not know it.
    async fn get_schedule(&self, schedule_id: &str) -> Result<Option<ExternalSchedule>, ScheduleServiceError>;
}
