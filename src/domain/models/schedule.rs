//! External schedule domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registration with the external schedule service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSchedule {
    /// Opaque id issued by the service.
    pub id: String,
    pub cron_expression: String,
    pub timezone: String,
    /// Idempotency key the schedule was created with. Always the task id.
    pub deduplication_key: String,
    /// Back-reference to the owning task, if the service echoes one.
    pub external_id: Option<String>,
    pub active: bool,
}

/// Parameters for creating a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub cron_expression: String,
    pub deduplication_key: String,
    pub external_id: String,
    pub timezone: String,
}

impl ScheduleRequest {
    /// Request for `task` with the given cron. The deduplication key is the
    /// task id, so retries never register a second schedule.
    pub fn for_task(task_id: Uuid, cron_expression: impl Into<String>, timezone: impl Into<String>) -> Self {
        let key = task_id.to_string();
        Self {
            cron_expression: cron_expression.into(),
            deduplication_key: key.clone(),
            external_id: key,
            timezone: timezone.into(),
        }
    }
}
