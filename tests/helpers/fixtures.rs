use std::sync::Arc;

use schedsync::adapters::memory::InMemoryScheduleService;
use schedsync::domain::ports::TaskStore;
use schedsync::services::DriftCorrector;
use schedsync::{NewTask, TaskFilter, TaskSyncService};

pub const DAILY: &str = "0 9 * * *";
pub const HOURLY: &str = "0 * * * *";

pub fn new_task(account_id: &str, cron: &str) -> NewTask {
    NewTask::new("Weekly digest", "Summarise the week's releases", cron, account_id, "artist-1")
}

/// Orchestrator and drift corrector over a shared store and fake service.
pub struct Harness {
    pub store: Arc<dyn TaskStore>,
    pub schedules: Arc<InMemoryScheduleService>,
    pub sync: TaskSyncService,
    pub corrector: DriftCorrector,
}

impl Harness {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        let schedules = Arc::new(InMemoryScheduleService::new());
        Self {
            sync: TaskSyncService::new(store.clone(), schedules.clone()),
            corrector: DriftCorrector::new(store.clone(), schedules.clone()),
            store,
            schedules,
        }
    }

    /// Every enabled task references a live schedule with its cron, every
    /// disabled task references none, and no schedule is unowned.
    pub async fn assert_consistent(&self) {
        let tasks = self.store.list(&TaskFilter::default()).await.expect("list tasks");
        let live = self.schedules.schedules().await;

        for task in &tasks {
            if task.enabled {
                let id = task
                    .external_schedule_id
                    .as_deref()
                    .unwrap_or_else(|| panic!("enabled task {} has no schedule", task.id));
                let schedule = live
                    .iter()
                    .find(|s| s.id == id)
                    .unwrap_or_else(|| panic!("task {} points at missing schedule {id}", task.id));
                assert_eq!(schedule.cron_expression, task.cron_expression);
                assert_eq!(schedule.deduplication_key, task.id.to_string());
            } else {
                assert!(
                    task.external_schedule_id.is_none(),
                    "disabled task {} still has a schedule",
                    task.id
                );
            }
        }

        for schedule in &live {
            assert!(
                tasks
                    .iter()
                    .any(|t| t.external_schedule_id.as_deref() == Some(schedule.id.as_str())),
                "schedule {} has no owning task",
                schedule.id
            );
        }
    }
}
