//! In-memory task store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::task::{Task, TaskFilter, TaskPatch};
use crate::domain::ports::TaskStore;

/// Task store backed by a map, with switches to make the next write fail.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    fail_next_update: AtomicBool,
    fail_next_delete: AtomicBool,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `update` call fail with a database error.
    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    /// Make the next `delete` call fail with a database error.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    /// Snapshot of every stored task.
    pub async fn all(&self) -> Vec<Task> {
        self.tasks.read().await.values().cloned().collect()
    }

    /// Overwrite a record without touching its version, to stage drift.
    pub async fn put_raw(&self, task: Task) {
        self.tasks.write().await.insert(task.id, task);
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: &Task) -> DomainResult<Task> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(DomainError::DuplicateTask(task.id));
        }
        tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, patch: &TaskPatch, expected_version: i64) -> DomainResult<Task> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("injected update failure".to_string()));
        }

        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(DomainError::TaskNotFound(id))?;
        if task.version != expected_version {
            return Err(DomainError::task_conflict(id));
        }

        task.apply(patch);
        task.version += 1;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete(&self, id: Uuid, expected_version: i64) -> DomainResult<()> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("injected delete failure".to_string()));
        }

        let mut tasks = self.tasks.write().await;
        let task = tasks.get(&id).ok_or(DomainError::TaskNotFound(id))?;
        if task.version != expected_version {
            return Err(DomainError::task_conflict(id));
        }
        tasks.remove(&id);
        Ok(())
    }

    async fn list(&self, filter: &TaskFilter) -> DomainResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut result: Vec<Task> = tasks.values().filter(|t| filter.matches(t)).cloned().collect();
        result.sort_by_key(|t| t.created_at);
        Ok(result)
    }
}
