//! Repository port for task persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::task::{Task, TaskFilter, TaskPatch};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task. Fails with `DuplicateTask` if the id is taken.
    async fn create(&self, task: &Task) -> DomainResult<Task>;

    /// Get a task by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;

    /// Apply `patch` if the stored version still equals `expected_version`.
    ///
    /// Returns the updated task with its version incremented. Fails with
    /// `TaskNotFound` if the task is gone and `ConcurrencyConflict` if it was
    /// modified since it was read.
    async fn update(&self, id: Uuid, patch: &TaskPatch, expected_version: i64) -> DomainResult<Task>;

    /// Delete a task if the stored version still equals `expected_version`.
    async fn delete(&self, id: Uuid, expected_version: i64) -> DomainResult<()>;

    /// List tasks matching the filter, oldest first.
    async fn list(&self, filter: &TaskFilter) -> DomainResult<Vec<Task>>;
}
