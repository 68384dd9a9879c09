//! Carries out reconciler decisions against the schedule service.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::models::schedule::ScheduleRequest;
use crate::domain::ports::schedule_service::{ScheduleService, ScheduleServiceError};
use crate::domain::ports::TaskStore;
use crate::services::reconciler::ScheduleAction;

/// What happened to the task's schedule reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// No call was made; the recorded id stays as it is.
    Unchanged,
    /// The task is now backed by this schedule.
    Set(String),
    /// The task no longer has a schedule.
    Cleared,
}

impl ScheduleOutcome {
    /// The schedule id the task should record, given the one it had before.
    pub fn resolve(&self, previous: Option<String>) -> Option<String> {
        match self {
            Self::Unchanged => previous,
            Self::Set(id) => Some(id.clone()),
            Self::Cleared => None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

#[derive(Clone)]
pub struct ScheduleExecutor {
    schedules: Arc<dyn ScheduleService>,
}

impl ScheduleExecutor {
    pub fn new(schedules: Arc<dyn ScheduleService>) -> Self {
        Self { schedules }
    }

    /// Execute `action` for the task. Steps run strictly in order and the
    /// first failure aborts the rest.
    pub async fn execute(
        &self,
        task_id: Uuid,
        timezone: &str,
        action: &ScheduleAction,
    ) -> Result<ScheduleOutcome, ScheduleServiceError> {
        match action {
            ScheduleAction::NoOp => Ok(ScheduleOutcome::Unchanged),
            ScheduleAction::Create { cron_expression } => {
                let id = self.create(task_id, cron_expression, timezone).await?;
                Ok(ScheduleOutcome::Set(id))
            }
            ScheduleAction::Replace { existing_id, cron_expression } => {
                self.delete(existing_id).await?;
                let id = self
                    .create(task_id, cron_expression, timezone)
                    .await
                    .inspect_err(|e| {
                        warn!(
                            task_id = %task_id,
                            discarded_schedule_id = %existing_id,
                            error = %e,
                            "schedule replaced halfway: old schedule deleted but new one not created"
                        );
                    })?;
                Ok(ScheduleOutcome::Set(id))
            }
            ScheduleAction::Delete { existing_id } => {
                self.delete(existing_id).await?;
                Ok(ScheduleOutcome::Cleared)
            }
        }
    }

    /// Create a schedule keyed on the task id and return its external id.
    pub async fn create(
        &self,
        task_id: Uuid,
        cron_expression: &str,
        timezone: &str,
    ) -> Result<String, ScheduleServiceError> {
        let request = ScheduleRequest::for_task(task_id, cron_expression, timezone);
        let schedule = self.schedules.create_schedule(&request).await?;
        debug!(task_id = %task_id, schedule_id = %schedule.id, cron = %cron_expression, "schedule created");
        Ok(schedule.id)
    }

    /// Delete a schedule, treating an unknown id as already deleted.
    pub async fn delete(&self, schedule_id: &str) -> Result<(), ScheduleServiceError> {
        match self.schedules.delete_schedule(schedule_id).await {
            Ok(()) => {
                debug!(schedule_id, "schedule deleted");
                Ok(())
            }
            Err(ScheduleServiceError::NotFound(_)) => {
                warn!(schedule_id, "schedule already gone at service, treating delete as done");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Settle a schedule created by a call whose task store write then lost
    /// a version race.
    ///
    /// The schedule is kept if the record that won references it and deleted
    /// otherwise. Returns `true` when nothing is left orphaned.
    pub async fn release_unreferenced(&self, store: &dyn TaskStore, task_id: Uuid, schedule_id: &str) -> bool {
        let referenced = match store.get(task_id).await {
            Ok(Some(task)) => task.external_schedule_id.as_deref() == Some(schedule_id),
            Ok(None) => false,
            Err(e) => {
                warn!(task_id = %task_id, schedule_id, error = %e, "could not reload task after version conflict");
                return false;
            }
        };
        if referenced {
            debug!(task_id = %task_id, schedule_id, "schedule referenced by concurrent writer");
            return true;
        }

        match self.delete(schedule_id).await {
            Ok(()) => {
                info!(task_id = %task_id, schedule_id, "removed schedule orphaned by concurrent update");
                true
            }
            Err(e) => {
                error!(task_id = %task_id, schedule_id, error = %e, "failed to remove orphaned schedule");
                false
            }
        }
    }
}
