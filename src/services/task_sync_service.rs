//! Service keeping task records and their external schedules in step.
//!
//! Every lifecycle call loads the task, asks the reconciler what the
//! schedule service must do, performs that, and only then writes the task
//! store. The write is conditional on the version read at the start, so
//! two concurrent updates of the same task cannot both record a schedule id.
//!
//! Failure windows that cannot be closed without a cross-system transaction
//! are surfaced as [`DomainError::Inconsistent`] and repaired by
//! [`DriftCorrector`](crate::services::DriftCorrector).

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::task::{NewTask, Task, TaskFilter, TaskPatch, TaskUpdate, DEFAULT_TIMEZONE};
use crate::domain::ports::{ScheduleService, TaskStore};
use crate::services::reconciler::{reconcile, CurrentScheduleState, DesiredScheduleState, ScheduleAction};
use crate::services::schedule_executor::{ScheduleExecutor, ScheduleOutcome};

pub struct TaskSyncService {
    store: Arc<dyn TaskStore>,
    executor: ScheduleExecutor,
    default_timezone: String,
}

impl TaskSyncService {
    pub fn new(store: Arc<dyn TaskStore>, schedules: Arc<dyn ScheduleService>) -> Self {
        Self {
            store,
            executor: ScheduleExecutor::new(schedules),
            default_timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }

    /// Timezone given to tasks created without one.
    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = timezone.into();
        self
    }

    /// Create a task and, if it is enabled, its external schedule.
    ///
    /// The task is persisted first. If the schedule service then fails the
    /// task stays enabled without a schedule and the error is returned;
    /// retrying with the same task id resumes from the schedule step.
    #[instrument(skip(self, new), fields(task_id), err)]
    pub async fn create_task(&self, new: NewTask) -> DomainResult<Task> {
        new.validate()?;
        let candidate = Task::from_new(new, &self.default_timezone);
        tracing::Span::current().record("task_id", tracing::field::display(candidate.id));

        let task = match self.store.create(&candidate).await {
            Ok(task) => task,
            Err(DomainError::DuplicateTask(id)) => self.resume_create(&candidate, id).await?,
            Err(e) => return Err(e),
        };

        if !task.enabled {
            info!(task_id = %task.id, "task created without schedule");
            return Ok(task);
        }

        let schedule_id = self
            .executor
            .create(task.id, &task.cron_expression, &task.timezone)
            .await
            .inspect_err(|e| {
                warn!(task_id = %task.id, error = %e, "task persisted but schedule creation failed");
            })?;

        if task.external_schedule_id.as_deref() == Some(schedule_id.as_str()) {
            info!(task_id = %task.id, schedule_id = %schedule_id, "create retry found existing schedule");
            return Ok(task);
        }

        let patch = TaskPatch::schedule_id(Some(schedule_id.clone()));
        let task = match self.store.update(task.id, &patch, task.version).await {
            Ok(task) => task,
            Err(e) => {
                if Self::lost_race(&e)
                    && self
                        .executor
                        .release_unreferenced(self.store.as_ref(), task.id, &schedule_id)
                        .await
                {
                    return Err(e);
                }
                return Err(Self::inconsistent(task.id, Some(schedule_id), &e));
            }
        };

        info!(task_id = %task.id, schedule_id = %schedule_id, "task created");
        Ok(task)
    }

    /// A duplicate id is accepted as a retry only when the stored record
    /// describes the same schedule the caller is asking for.
    async fn resume_create(&self, candidate: &Task, id: Uuid) -> DomainResult<Task> {
        let existing = self.store.get(id).await?.ok_or(DomainError::DuplicateTask(id))?;
        if !existing.same_schedule_definition(candidate) {
            return Err(DomainError::DuplicateTask(id));
        }
        info!(task_id = %id, version = existing.version, "resuming create for existing task");
        Ok(existing)
    }

    /// Merge `update` into the task and bring its schedule in line.
    ///
    /// If the schedule service fails the task store is left untouched.
    #[instrument(skip(self, id, update), fields(task_id = %id), err)]
    pub async fn update_task(&self, id: Uuid, update: TaskUpdate) -> DomainResult<Task> {
        update.validate()?;
        let current = self.load(id, update.expected_version).await?;

        let cron_changed = update
            .cron_expression
            .as_ref()
            .is_some_and(|cron| *cron != current.cron_expression);
        let desired = DesiredScheduleState {
            enabled: update.enabled.unwrap_or(current.enabled),
            cron_expression: update
                .cron_expression
                .clone()
                .unwrap_or_else(|| current.cron_expression.clone()),
            cron_changed,
        };
        let action = reconcile(
            &CurrentScheduleState::new(current.external_schedule_id.clone()),
            &desired,
        );
        debug!(action = action.as_str(), "reconciled schedule");

        let outcome = self.executor.execute(id, &current.timezone, &action).await?;

        let mut patch = update.to_patch();
        if !outcome.is_unchanged() {
            patch.external_schedule_id = Some(outcome.resolve(None));
        }

        match self.store.update(id, &patch, current.version).await {
            Ok(task) => {
                info!(action = action.as_str(), schedule_id = ?task.external_schedule_id, "task updated");
                Ok(task)
            }
            Err(e) if outcome.is_unchanged() => Err(e),
            Err(e) => {
                let mut recorded = outcome.resolve(None);
                if let (true, ScheduleOutcome::Set(created)) = (Self::lost_race(&e), &outcome) {
                    if self
                        .executor
                        .release_unreferenced(self.store.as_ref(), id, created)
                        .await
                    {
                        // Nothing was deleted, so the winner's record is untouched.
                        if matches!(action, ScheduleAction::Create { .. }) {
                            return Err(e);
                        }
                        recorded = None;
                    }
                }
                Err(Self::inconsistent(id, recorded, &e))
            }
        }
    }

    /// Delete the task's schedule, then the task.
    #[instrument(skip(self, id), fields(task_id = %id), err)]
    pub async fn delete_task(&self, id: Uuid, expected_version: Option<i64>) -> DomainResult<()> {
        let current = self.load(id, expected_version).await?;

        if let Some(ref schedule_id) = current.external_schedule_id {
            self.executor.delete(schedule_id).await?;
        }

        match self.store.delete(id, current.version).await {
            Ok(()) => {
                info!(schedule_id = ?current.external_schedule_id, "task deleted");
                Ok(())
            }
            Err(e) if current.external_schedule_id.is_none() => Err(e),
            Err(e) => Err(Self::inconsistent(id, current.external_schedule_id, &e)),
        }
    }

    pub async fn get_task(&self, id: Uuid) -> DomainResult<Task> {
        self.load(id, None).await
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> DomainResult<Vec<Task>> {
        self.store.list(filter).await
    }

    async fn load(&self, id: Uuid, expected_version: Option<i64>) -> DomainResult<Task> {
        let task = self.store.get(id).await?.ok_or(DomainError::TaskNotFound(id))?;
        if let Some(expected) = expected_version {
            if expected != task.version {
                return Err(DomainError::task_conflict(id));
            }
        }
        Ok(task)
    }

    /// The store write was rejected because another writer got there first.
    pub(crate) fn lost_race(err: &DomainError) -> bool {
        matches!(err, DomainError::ConcurrencyConflict { .. })
    }

    pub(crate) fn inconsistent(task_id: Uuid, external_schedule_id: Option<String>, cause: &DomainError) -> DomainError {
        error!(
            task_id = %task_id,
            schedule_id = ?external_schedule_id,
            error = %cause,
            "task store write failed after schedule service change; drift correction required"
        );
        DomainError::Inconsistent {
            task_id,
            external_schedule_id,
            reason: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryScheduleService, InMemoryTaskStore, ScheduleCall};
    use crate::domain::ports::ScheduleServiceError;

    struct Harness {
        store: Arc<InMemoryTaskStore>,
        schedules: Arc<InMemoryScheduleService>,
        service: TaskSyncService,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryTaskStore::new());
        let schedules = Arc::new(InMemoryScheduleService::new());
        let service = TaskSyncService::new(store.clone(), schedules.clone());
        Harness { store, schedules, service }
    }

    fn new_task(cron: &str) -> NewTask {
        NewTask::new("Daily digest", "Summarise today", cron, "acc-1", "artist-1")
    }

    /// Store that lets a second writer slip in between a read and a write.
    #[derive(Default)]
    struct RacingStore {
        inner: InMemoryTaskStore,
        stale_read: std::sync::Mutex<Option<Task>>,
        write_first: std::sync::Mutex<Option<TaskPatch>>,
    }

    impl RacingStore {
        /// Serve `snapshot` on the next `get`.
        fn serve_stale(&self, snapshot: Task) {
            *self.stale_read.lock().unwrap() = Some(snapshot);
        }

        /// Commit `patch` just before the next `update` is applied.
        fn commit_before_next_update(&self, patch: TaskPatch) {
            *self.write_first.lock().unwrap() = Some(patch);
        }
    }

    #[async_trait::async_trait]
    impl TaskStore for RacingStore {
        async fn create(&self, task: &Task) -> DomainResult<Task> {
            self.inner.create(task).await
        }

        async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
            let stale = self.stale_read.lock().unwrap().take();
            match stale {
                Some(task) => Ok(Some(task)),
                None => self.inner.get(id).await,
            }
        }

        async fn update(&self, id: Uuid, patch: &TaskPatch, expected_version: i64) -> DomainResult<Task> {
            let first = self.write_first.lock().unwrap().take();
            if let Some(first) = first {
                let current = self.inner.get(id).await?.ok_or(DomainError::TaskNotFound(id))?;
                self.inner.update(id, &first, current.version).await?;
            }
            self.inner.update(id, patch, expected_version).await
        }

        async fn delete(&self, id: Uuid, expected_version: i64) -> DomainResult<()> {
            self.inner.delete(id, expected_version).await
        }

        async fn list(&self, filter: &TaskFilter) -> DomainResult<Vec<Task>> {
            self.inner.list(filter).await
        }
    }

    fn racing_harness() -> (Arc<RacingStore>, Arc<InMemoryScheduleService>, TaskSyncService) {
        let store = Arc::new(RacingStore::default());
        let schedules = Arc::new(InMemoryScheduleService::new());
        let service = TaskSyncService::new(store.clone(), schedules.clone());
        (store, schedules, service)
    }

    #[tokio::test]
    async fn test_create_enabled_task_registers_schedule() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();

        assert_eq!(task.external_schedule_id.as_deref(), Some("sched-1"));
        let schedules = h.schedules.schedules().await;
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].deduplication_key, task.id.to_string());
        assert_eq!(schedules[0].cron_expression, "0 9 * * *");
        assert_eq!(schedules[0].timezone, "UTC");
    }

    #[tokio::test]
    async fn test_create_disabled_task_makes_no_call() {
        let h = harness();
        let task = h
            .service
            .create_task(new_task("0 9 * * *").with_enabled(false))
            .await
            .unwrap();
        assert!(task.external_schedule_id.is_none());
        assert!(h.schedules.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_uses_configured_default_timezone() {
        let store = Arc::new(InMemoryTaskStore::new());
        let schedules = Arc::new(InMemoryScheduleService::new());
        let service = TaskSyncService::new(store, schedules.clone()).with_default_timezone("Europe/Berlin");

        let task = service.create_task(new_task("0 9 * * *")).await.unwrap();
        assert_eq!(task.timezone, "Europe/Berlin");
        assert_eq!(schedules.schedules().await[0].timezone, "Europe/Berlin");
    }

    #[tokio::test]
    async fn test_create_validation_happens_before_io() {
        let h = harness();
        let err = h.service.create_task(new_task("whenever")).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        let err = h
            .service
            .create_task(new_task("0 9 * * *").with_timezone("Mars/Olympus_Mons"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert!(h.store.all().await.is_empty());
        assert!(h.schedules.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_schedule_failure_leaves_enabled_task_without_schedule() {
        let h = harness();
        let id = Uuid::new_v4();
        h.schedules.fail_next_create(ScheduleServiceError::Timeout).await;

        let err = h
            .service
            .create_task(new_task("0 9 * * *").with_id(id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ScheduleService(ScheduleServiceError::Timeout)));

        let stored = h.store.get(id).await.unwrap().unwrap();
        assert!(stored.enabled);
        assert!(stored.external_schedule_id.is_none());

        // Retrying with the same id resumes and completes the create.
        let task = h.service.create_task(new_task("0 9 * * *").with_id(id)).await.unwrap();
        assert_eq!(task.external_schedule_id.as_deref(), Some("sched-1"));
        assert_eq!(h.schedules.schedules().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_retry_returns_same_schedule() {
        let h = harness();
        let id = Uuid::new_v4();
        let first = h.service.create_task(new_task("0 9 * * *").with_id(id)).await.unwrap();
        let second = h.service.create_task(new_task("0 9 * * *").with_id(id)).await.unwrap();

        assert_eq!(first.external_schedule_id, second.external_schedule_id);
        assert_eq!(h.schedules.schedules().await.len(), 1);
        let creates = h
            .schedules
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, ScheduleCall::Create { .. }))
            .count();
        assert_eq!(creates, 2);
    }

    #[tokio::test]
    async fn test_create_duplicate_with_different_cron_is_conflict() {
        let h = harness();
        let id = Uuid::new_v4();
        h.service.create_task(new_task("0 9 * * *").with_id(id)).await.unwrap();
        let err = h
            .service
            .create_task(new_task("0 10 * * *").with_id(id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateTask(dup) if dup == id));
        assert_eq!(h.schedules.schedules().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_store_failure_after_schedule_is_inconsistent() {
        let h = harness();
        h.store.fail_next_update();
        let err = h.service.create_task(new_task("0 9 * * *")).await.unwrap_err();
        match err {
            DomainError::Inconsistent { external_schedule_id, .. } => {
                assert_eq!(external_schedule_id.as_deref(), Some("sched-1"));
            }
            other => panic!("expected inconsistent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_disable_deletes_schedule() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();

        let updated = h
            .service
            .update_task(task.id, TaskUpdate { enabled: Some(false), ..Default::default() })
            .await
            .unwrap();

        assert!(!updated.enabled);
        assert!(updated.external_schedule_id.is_none());
        assert!(h.schedules.schedule("sched-1").await.is_none());
    }

    #[tokio::test]
    async fn test_update_cron_replaces_schedule() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();

        let updated = h
            .service
            .update_task(
                task.id,
                TaskUpdate { cron_expression: Some("0 10 * * *".to_string()), ..Default::default() },
            )
            .await
            .unwrap();

        let new_id = updated.external_schedule_id.clone().unwrap();
        assert_ne!(Some(new_id.clone()), task.external_schedule_id);
        let schedule = h.schedules.schedule(&new_id).await.unwrap();
        assert_eq!(schedule.cron_expression, "0 10 * * *");
        assert_eq!(h.schedules.schedules().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_same_cron_is_noop() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.schedules.clear_calls().await;

        let updated = h
            .service
            .update_task(
                task.id,
                TaskUpdate { cron_expression: Some("0 9 * * *".to_string()), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(updated.external_schedule_id, task.external_schedule_id);
        assert!(h.schedules.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_payload_only_makes_no_schedule_call() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.schedules.clear_calls().await;

        let updated = h
            .service
            .update_task(
                task.id,
                TaskUpdate {
                    title: Some("Weekly digest".to_string()),
                    model: Some("gpt-4o".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Weekly digest");
        assert_eq!(updated.model.as_deref(), Some("gpt-4o"));
        assert_eq!(updated.external_schedule_id, task.external_schedule_id);
        assert_eq!(updated.version, task.version + 1);
        assert!(h.schedules.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_enable_creates_schedule() {
        let h = harness();
        let task = h
            .service
            .create_task(new_task("0 9 * * *").with_enabled(false))
            .await
            .unwrap();

        let updated = h
            .service
            .update_task(task.id, TaskUpdate { enabled: Some(true), ..Default::default() })
            .await
            .unwrap();

        assert!(updated.external_schedule_id.is_some());
        assert_eq!(h.schedules.schedules().await[0].deduplication_key, task.id.to_string());
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let h = harness();
        let err = h
            .service
            .update_task(Uuid::new_v4(), TaskUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_schedule_failure_leaves_store_unchanged() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.schedules
            .fail_next_delete(ScheduleServiceError::Rejected { status: 500, message: "boom".into() })
            .await;

        let err = h
            .service
            .update_task(
                task.id,
                TaskUpdate { enabled: Some(false), title: Some("changed".into()), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ScheduleService(_)));

        let stored = h.store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored, task);
    }

    #[tokio::test]
    async fn test_update_replace_half_failure_keeps_stale_reference() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.schedules.fail_next_create(ScheduleServiceError::Timeout).await;

        let err = h
            .service
            .update_task(
                task.id,
                TaskUpdate { cron_expression: Some("0 10 * * *".into()), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ScheduleService(ScheduleServiceError::Timeout)));

        let stored = h.store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.external_schedule_id.as_deref(), Some("sched-1"));
        assert_eq!(stored.cron_expression, "0 9 * * *");
        assert!(h.schedules.schedule("sched-1").await.is_none());
    }

    #[tokio::test]
    async fn test_update_with_stale_version_is_rejected_before_io() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.schedules.clear_calls().await;

        let err = h
            .service
            .update_task(
                task.id,
                TaskUpdate {
                    enabled: Some(false),
                    expected_version: Some(task.version - 1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));
        assert!(h.schedules.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_store_failure_after_delete_is_inconsistent() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.store.fail_next_update();

        let err = h
            .service
            .update_task(task.id, TaskUpdate { enabled: Some(false), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Inconsistent { external_schedule_id: None, .. }));
    }

    #[tokio::test]
    async fn test_update_store_failure_without_schedule_change_is_plain_store_error() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.store.fail_next_update();

        let err = h
            .service
            .update_task(task.id, TaskUpdate { title: Some("x".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_update_losing_race_removes_its_new_schedule() {
        let (store, schedules, service) = racing_harness();
        let task = service.create_task(new_task("0 9 * * *")).await.unwrap();
        let snapshot = store.get(task.id).await.unwrap().unwrap();

        // Writer A disables the task and commits.
        service
            .update_task(task.id, TaskUpdate { enabled: Some(false), ..Default::default() })
            .await
            .unwrap();

        // Writer B read the task before A committed and changes the cron.
        store.serve_stale(snapshot);
        let err = service
            .update_task(
                task.id,
                TaskUpdate { cron_expression: Some("0 10 * * *".into()), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "inconsistent");

        let stored = store.get(task.id).await.unwrap().unwrap();
        assert!(!stored.enabled);
        assert!(stored.external_schedule_id.is_none());
        assert!(schedules.schedules().await.is_empty());

        let corrector = crate::services::DriftCorrector::new(store.clone(), schedules.clone());
        let report = corrector.run(&TaskFilter::default()).await.unwrap();
        assert!(report.is_clean());
        assert!(schedules.schedules().await.is_empty());
    }

    #[tokio::test]
    async fn test_enable_losing_race_removes_its_schedule() {
        let (store, schedules, service) = racing_harness();
        let task = service
            .create_task(new_task("0 9 * * *").with_enabled(false))
            .await
            .unwrap();

        store.commit_before_next_update(TaskPatch {
            title: Some("Renamed".into()),
            ..Default::default()
        });
        let err = service
            .update_task(task.id, TaskUpdate { enabled: Some(true), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));

        let stored = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert!(!stored.enabled);
        assert!(schedules.schedules().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_losing_race_removes_its_schedule() {
        let (store, schedules, service) = racing_harness();
        store.commit_before_next_update(TaskPatch {
            enabled: Some(false),
            ..Default::default()
        });

        let err = service.create_task(new_task("0 9 * * *")).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        let stored = store.inner.all().await;
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].enabled);
        assert!(stored[0].external_schedule_id.is_none());
        assert!(schedules.schedules().await.is_empty());
    }

    /// Records the field names declared on each new span.
    struct SpanFields(Arc<std::sync::Mutex<Vec<(String, Vec<String>)>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanFields {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let meta = attrs.metadata();
            let fields = meta.fields().iter().map(|f| f.name().to_string()).collect();
            self.0.lock().unwrap().push((meta.name().to_string(), fields));
        }
    }

    #[tokio::test]
    async fn test_lifecycle_spans_carry_task_id_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let spans = Arc::new(std::sync::Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(SpanFields(spans.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.service.update_task(task.id, TaskUpdate::default()).await.unwrap();
        h.service.delete_task(task.id, None).await.unwrap();

        let spans = spans.lock().unwrap().clone();
        for name in ["create_task", "update_task", "delete_task"] {
            let (_, fields) = spans
                .iter()
                .find(|(span, _)| span == name)
                .unwrap_or_else(|| panic!("no {name} span"));
            assert!(fields.iter().any(|f| f == "task_id"), "{name}: {fields:?}");
            assert!(!fields.iter().any(|f| f == "id"), "{name}: {fields:?}");
        }
    }

    #[tokio::test]
    async fn test_delete_removes_schedule_and_task() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();

        h.service.delete_task(task.id, None).await.unwrap();

        assert!(h.store.get(task.id).await.unwrap().is_none());
        assert!(h.schedules.schedules().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_never_enabled_task_makes_no_call() {
        let h = harness();
        let task = h
            .service
            .create_task(new_task("0 9 * * *").with_enabled(false))
            .await
            .unwrap();

        h.service.delete_task(task.id, Some(task.version)).await.unwrap();

        assert!(h.store.get(task.id).await.unwrap().is_none());
        assert!(h.schedules.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_schedule_failure_keeps_task() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.schedules.fail_next_delete(ScheduleServiceError::Timeout).await;

        assert!(h.service.delete_task(task.id, None).await.is_err());
        let stored = h.store.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.external_schedule_id.as_deref(), Some("sched-1"));

        // The retry succeeds.
        h.service.delete_task(task.id, None).await.unwrap();
        assert!(h.store.get(task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_tolerates_schedule_already_gone() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.schedules.forget("sched-1").await;

        h.service.delete_task(task.id, None).await.unwrap();
        assert!(h.store.get(task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_store_failure_is_inconsistent() {
        let h = harness();
        let task = h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        h.store.fail_next_delete();

        let err = h.service.delete_task(task.id, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Inconsistent { .. }));
        assert!(h.store.get(task.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_task() {
        let h = harness();
        let err = h.service.delete_task(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, DomainError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_account() {
        let h = harness();
        h.service.create_task(new_task("0 9 * * *")).await.unwrap();
        let mut other = new_task("0 9 * * *");
        other.account_id = "acc-2".to_string();
        h.service.create_task(other).await.unwrap();

        let filter = TaskFilter { account_id: Some("acc-2".to_string()), ..Default::default() };
        let tasks = h.service.list_tasks(&filter).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].account_id, "acc-2");
    }
}
