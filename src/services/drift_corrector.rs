//! Reconciliation pass repairing drift between the task store and the
//! schedule service.
//!
//! The pass observes each task's recorded schedule at the service, treats a
//! schedule the service no longer knows as absent, and re-runs the
//! reconciler against what it observed. It is idempotent: over a consistent
//! store it makes no mutating calls.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::task::{Task, TaskFilter, TaskPatch};
use crate::domain::ports::{ScheduleService, TaskStore};
use crate::services::reconciler::{reconcile, CurrentScheduleState, DesiredScheduleState, ScheduleAction};
use crate::services::schedule_executor::{ScheduleExecutor, ScheduleOutcome};
use crate::services::task_sync_service::TaskSyncService;

/// A task whose schedule reference was repaired.
#[derive(Debug, Clone, Serialize)]
pub struct DriftRepair {
    pub task_id: Uuid,
    pub action: ScheduleAction,
    pub previous_schedule_id: Option<String>,
    pub schedule_id: Option<String>,
}

/// A task the pass could not repair.
#[derive(Debug, Clone, Serialize)]
pub struct DriftFailure {
    pub task_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DriftReport {
    pub examined: usize,
    pub repairs: Vec<DriftRepair>,
    pub failures: Vec<DriftFailure>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty() && self.failures.is_empty()
    }
}

pub struct DriftCorrector {
    store: Arc<dyn TaskStore>,
    schedules: Arc<dyn ScheduleService>,
    executor: ScheduleExecutor,
}

impl DriftCorrector {
    pub fn new(store: Arc<dyn TaskStore>, schedules: Arc<dyn ScheduleService>) -> Self {
        let executor = ScheduleExecutor::new(schedules.clone());
        Self { store, schedules, executor }
    }

    /// Examine every task matching `filter` and repair the ones that drifted.
    ///
    /// A failure on one task is recorded in the report and the pass moves
    /// on; only failing to list tasks aborts it.
    #[instrument(skip(self), err)]
    pub async fn run(&self, filter: &TaskFilter) -> DomainResult<DriftReport> {
        let tasks = self.store.list(filter).await?;
        let mut report = DriftReport {
            examined: tasks.len(),
            ..DriftReport::default()
        };

        for task in &tasks {
            match self.correct(task).await {
                Ok(Some(repair)) => report.repairs.push(repair),
                Ok(None) => {}
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "drift correction failed for task");
                    report.failures.push(DriftFailure {
                        task_id: task.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            examined = report.examined,
            repaired = report.repairs.len(),
            failed = report.failures.len(),
            "drift correction finished"
        );
        Ok(report)
    }

    async fn correct(&self, task: &Task) -> DomainResult<Option<DriftRepair>> {
        let observed = match task.external_schedule_id {
            Some(ref id) => self.schedules.get_schedule(id).await?,
            None => None,
        };
        if observed.is_none() && task.external_schedule_id.is_some() {
            warn!(
                task_id = %task.id,
                schedule_id = ?task.external_schedule_id,
                "recorded schedule unknown to service"
            );
        }

        let cron_changed = observed
            .as_ref()
            .is_some_and(|s| s.cron_expression != task.cron_expression);
        let current = CurrentScheduleState::new(observed.map(|s| s.id));
        let desired = DesiredScheduleState {
            enabled: task.enabled,
            cron_expression: task.cron_expression.clone(),
            cron_changed,
        };
        let action = reconcile(&current, &desired);

        let outcome = self.executor.execute(task.id, &task.timezone, &action).await?;
        let schedule_id = outcome.resolve(current.external_schedule_id);
        if action.is_noop() && schedule_id == task.external_schedule_id {
            return Ok(None);
        }

        if schedule_id != task.external_schedule_id {
            let patch = TaskPatch::schedule_id(schedule_id.clone());
            if let Err(e) = self.store.update(task.id, &patch, task.version).await {
                if outcome.is_unchanged() {
                    return Err(e);
                }
                if let (true, ScheduleOutcome::Set(created)) = (TaskSyncService::lost_race(&e), &outcome) {
                    if self
                        .executor
                        .release_unreferenced(self.store.as_ref(), task.id, created)
                        .await
                        && matches!(action, ScheduleAction::Create { .. })
                    {
                        return Err(e);
                    }
                }
                return Err(TaskSyncService::inconsistent(task.id, schedule_id, &e));
            }
        }

        info!(
            task_id = %task.id,
            action = action.as_str(),
            previous = ?task.external_schedule_id,
            schedule_id = ?schedule_id,
            "task schedule repaired"
        );
        Ok(Some(DriftRepair {
            task_id: task.id,
            action,
            previous_schedule_id: task.external_schedule_id.clone(),
            schedule_id,
        }))
    }
}
