//! Lifecycle operations against the SQLite task store and an in-memory
//! schedule service.

mod helpers;

use std::sync::Arc;

use helpers::database::sqlite_store;
use helpers::fixtures::{new_task, Harness, DAILY, HOURLY};
use schedsync::adapters::memory::ScheduleCall;
use schedsync::domain::ports::TaskStore;
use schedsync::{DomainError, ScheduleServiceError, TaskFilter, TaskUpdate};
use uuid::Uuid;

async fn harness() -> Harness {
    Harness::new(Arc::new(sqlite_store().await))
}

fn cron_update(cron: &str) -> TaskUpdate {
    TaskUpdate {
        cron_expression: Some(cron.to_string()),
        ..Default::default()
    }
}

fn enabled_update(enabled: bool) -> TaskUpdate {
    TaskUpdate {
        enabled: Some(enabled),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_registers_schedule_keyed_by_task_id() {
    let h = harness().await;

    let task = h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();

    let stored = h.store.get(task.id).await.unwrap().unwrap();
    assert_eq!(stored.external_schedule_id.as_deref(), Some("sched-1"));
    assert_eq!(stored.timezone, "UTC");

    let schedules = h.schedules.schedules().await;
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].deduplication_key, task.id.to_string());
    assert_eq!(schedules[0].cron_expression, DAILY);
    h.assert_consistent().await;
}

#[tokio::test]
async fn test_disable_deletes_schedule() {
    let h = harness().await;
    let task = h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();
    h.schedules.clear_calls().await;

    let updated = h.sync.update_task(task.id, enabled_update(false)).await.unwrap();

    assert!(!updated.enabled);
    assert!(updated.external_schedule_id.is_none());
    assert!(h.schedules.schedule("sched-1").await.is_none());
    assert_eq!(
        h.schedules.mutating_calls().await,
        vec![ScheduleCall::Delete {
            schedule_id: "sched-1".to_string()
        }]
    );
    h.assert_consistent().await;
}

#[tokio::test]
async fn test_cron_change_replaces_schedule() {
    let h = harness().await;
    let task = h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();

    let updated = h.sync.update_task(task.id, cron_update("0 10 * * *")).await.unwrap();

    let new_id = updated.external_schedule_id.clone().unwrap();
    assert_ne!(new_id, "sched-1");
    assert_eq!(updated.cron_expression, "0 10 * * *");
    assert_eq!(h.schedules.schedule(&new_id).await.unwrap().cron_expression, "0 10 * * *");
    assert!(h.schedules.schedule("sched-1").await.is_none());
    h.assert_consistent().await;
}

#[tokio::test]
async fn test_delete_never_enabled_task_makes_no_schedule_call() {
    let h = harness().await;
    let task = h
        .sync
        .create_task(new_task("acc-1", DAILY).with_enabled(false))
        .await
        .unwrap();

    h.sync.delete_task(task.id, None).await.unwrap();

    assert!(h.store.get(task.id).await.unwrap().is_none());
    assert!(h.schedules.calls().await.is_empty());
}

#[tokio::test]
async fn test_create_retry_is_idempotent() {
    let h = harness().await;
    let id = Uuid::new_v4();

    let first = h.sync.create_task(new_task("acc-1", DAILY).with_id(id)).await.unwrap();
    let second = h.sync.create_task(new_task("acc-1", DAILY).with_id(id)).await.unwrap();

    assert_eq!(first.external_schedule_id, second.external_schedule_id);
    assert_eq!(h.schedules.schedules().await.len(), 1);
    assert_eq!(h.store.list(&TaskFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_retry_after_schedule_failure_completes() {
    let h = harness().await;
    let id = Uuid::new_v4();
    h.schedules.fail_next_create(ScheduleServiceError::Timeout).await;

    let err = h
        .sync
        .create_task(new_task("acc-1", DAILY).with_id(id))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ScheduleService(ScheduleServiceError::Timeout)));
    let stranded = h.store.get(id).await.unwrap().unwrap();
    assert!(stranded.enabled);
    assert!(stranded.external_schedule_id.is_none());

    let task = h.sync.create_task(new_task("acc-1", DAILY).with_id(id)).await.unwrap();
    assert_eq!(task.external_schedule_id.as_deref(), Some("sched-1"));
    h.assert_consistent().await;
}

#[tokio::test]
async fn test_payload_update_makes_no_schedule_call() {
    let h = harness().await;
    let task = h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();
    h.schedules.clear_calls().await;

    let update = TaskUpdate {
        title: Some("Monthly digest".to_string()),
        prompt: Some("Summarise the month".to_string()),
        model: Some("gpt-4o-mini".to_string()),
        cron_expression: Some(DAILY.to_string()),
        ..Default::default()
    };
    let updated = h.sync.update_task(task.id, update).await.unwrap();

    assert_eq!(updated.title, "Monthly digest");
    assert_eq!(updated.external_schedule_id.as_deref(), Some("sched-1"));
    assert!(h.schedules.calls().await.is_empty());
}

#[tokio::test]
async fn test_delete_isolation() {
    let h = harness().await;
    let a = h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();
    let b = h.sync.create_task(new_task("acc-2", HOURLY)).await.unwrap();

    h.sync.delete_task(a.id, None).await.unwrap();

    let b_schedule = b.external_schedule_id.clone().unwrap();
    assert!(h.schedules.schedule(&b_schedule).await.is_some());
    assert_eq!(h.schedules.schedules().await.len(), 1);
    assert!(h.store.get(b.id).await.unwrap().is_some());
    h.assert_consistent().await;
}

#[tokio::test]
async fn test_stale_version_is_rejected() {
    let h = harness().await;
    let task = h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();
    h.schedules.clear_calls().await;

    let stale = TaskUpdate {
        enabled: Some(false),
        expected_version: Some(task.version - 1),
        ..Default::default()
    };
    let err = h.sync.update_task(task.id, stale).await.unwrap_err();
    assert_eq!(err.kind(), "conflict");

    let err = h.sync.delete_task(task.id, Some(task.version + 5)).await.unwrap_err();
    assert_eq!(err.kind(), "conflict");
    assert!(h.schedules.calls().await.is_empty());
}

#[tokio::test]
async fn test_validation_fails_before_any_io() {
    let h = harness().await;

    let err = h.sync.create_task(new_task("acc-1", "every day")).await.unwrap_err();
    assert_eq!(err.kind(), "validation_error");

    let err = h.sync.create_task(new_task("", DAILY)).await.unwrap_err();
    assert_eq!(err.kind(), "validation_error");

    let err = h
        .sync
        .create_task(new_task("acc-1", DAILY).with_timezone("Mars/Olympus_Mons"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");

    assert!(h.store.list(&TaskFilter::default()).await.unwrap().is_empty());
    assert!(h.schedules.calls().await.is_empty());
}

#[tokio::test]
async fn test_update_and_delete_missing_task() {
    let h = harness().await;
    let id = Uuid::new_v4();

    assert!(matches!(
        h.sync.update_task(id, enabled_update(true)).await,
        Err(DomainError::TaskNotFound(_))
    ));
    assert!(matches!(h.sync.delete_task(id, None).await, Err(DomainError::TaskNotFound(_))));
    assert!(h.schedules.calls().await.is_empty());
}

#[tokio::test]
async fn test_list_filters() {
    let h = harness().await;
    h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();
    h.sync
        .create_task(new_task("acc-1", HOURLY).with_enabled(false))
        .await
        .unwrap();
    h.sync.create_task(new_task("acc-2", DAILY)).await.unwrap();

    let acc1 = h
        .sync
        .list_tasks(&TaskFilter {
            account_id: Some("acc-1".to_string()),
            ..TaskFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(acc1.len(), 2);

    let enabled = h
        .sync
        .list_tasks(&TaskFilter {
            enabled: Some(true),
            ..TaskFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(enabled.len(), 2);
}

#[tokio::test]
async fn test_drift_corrector_repairs_sqlite_records() {
    let h = harness().await;
    let lost = h.sync.create_task(new_task("acc-1", DAILY)).await.unwrap();
    let drifted = h.sync.create_task(new_task("acc-2", DAILY)).await.unwrap();
    h.sync
        .create_task(new_task("acc-3", DAILY).with_enabled(false))
        .await
        .unwrap();

    h.schedules.forget(lost.external_schedule_id.as_deref().unwrap()).await;
    h.schedules
        .set_cron(drifted.external_schedule_id.as_deref().unwrap(), HOURLY)
        .await;

    let report = h.corrector.run(&TaskFilter::default()).await.unwrap();
    assert_eq!(report.examined, 3);
    assert_eq!(report.repairs.len(), 2);
    assert!(report.failures.is_empty());
    h.assert_consistent().await;

    h.schedules.clear_calls().await;
    let second = h.corrector.run(&TaskFilter::default()).await.unwrap();
    assert!(second.is_clean());
    assert!(h.schedules.mutating_calls().await.is_empty());
}
