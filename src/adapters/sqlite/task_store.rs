//! SQLite adapter for TaskStore.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::task::{Task, TaskFilter, TaskPatch};
use crate::domain::ports::TaskStore;

#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Tell a missing row apart from a version mismatch after a
    /// conditional write touched nothing.
    async fn missed_write_error(&self, id: Uuid) -> DomainError {
        let exists: Result<Option<(i64,)>, sqlx::Error> =
            sqlx::query_as("SELECT version FROM scheduled_tasks WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await;

        match exists {
            Ok(Some(_)) => DomainError::task_conflict(id),
            Ok(None) => DomainError::TaskNotFound(id),
            Err(e) => e.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    title: String,
    prompt: String,
    cron_expression: String,
    timezone: String,
    enabled: bool,
    account_id: String,
    artist_account_id: String,
    model: Option<String>,
    external_schedule_id: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

fn row_to_task(row: TaskRow) -> DomainResult<Task> {
    Ok(Task {
        id: parse_uuid(&row.id)?,
        title: row.title,
        prompt: row.prompt,
        cron_expression: row.cron_expression,
        timezone: row.timezone,
        enabled: row.enabled,
        account_id: row.account_id,
        artist_account_id: row.artist_account_id,
        model: row.model,
        external_schedule_id: row.external_schedule_id,
        version: row.version,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, task: &Task) -> DomainResult<Task> {
        let result = sqlx::query(
            "INSERT INTO scheduled_tasks
             (id, title, prompt, cron_expression, timezone, enabled,
              account_id, artist_account_id, model, external_schedule_id,
              version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.prompt)
        .bind(&task.cron_expression)
        .bind(&task.timezone)
        .bind(task.enabled)
        .bind(&task.account_id)
        .bind(&task.artist_account_id)
        .bind(&task.model)
        .bind(&task.external_schedule_id)
        .bind(task.version)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(task.clone()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(DomainError::DuplicateTask(task.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM scheduled_tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_task).transpose()
    }

    async fn update(&self, id: Uuid, patch: &TaskPatch, expected_version: i64) -> DomainResult<Task> {
        let (set_schedule_id, schedule_id) = match patch.external_schedule_id {
            Some(ref value) => (true, value.clone()),
            None => (false, None),
        };
        let updated = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE scheduled_tasks SET
             title = COALESCE(?3, title),
             prompt = COALESCE(?4, prompt),
             cron_expression = COALESCE(?5, cron_expression),
             enabled = COALESCE(?6, enabled),
             account_id = COALESCE(?7, account_id),
             artist_account_id = COALESCE(?8, artist_account_id),
             model = COALESCE(?9, model),
             external_schedule_id = CASE WHEN ?10 THEN ?11 ELSE external_schedule_id END,
             version = version + 1,
             updated_at = ?12
             WHERE id = ?1 AND version = ?2",
        )
        .bind(id.to_string())
        .bind(expected_version)
        .bind(&patch.title)
        .bind(&patch.prompt)
        .bind(&patch.cron_expression)
        .bind(patch.enabled)
        .bind(&patch.account_id)
        .bind(&patch.artist_account_id)
        .bind(&patch.model)
        .bind(set_schedule_id)
        .bind(schedule_id)
        .bind(&updated)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_write_error(id).await);
        }

        self.get(id).await?.ok_or(DomainError::TaskNotFound(id))
    }

    async fn delete(&self, id: Uuid, expected_version: i64) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM scheduled_tasks WHERE id = ? AND version = ?")
            .bind(id.to_string())
            .bind(expected_version)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_write_error(id).await);
        }
        Ok(())
    }

    async fn list(&self, filter: &TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = String::from("SELECT * FROM scheduled_tasks WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(id) = filter.id {
            query.push_str(" AND id = ?");
            bindings.push(id.to_string());
        }
        if let Some(account_id) = &filter.account_id {
            query.push_str(" AND account_id = ?");
            bindings.push(account_id.clone());
        }
        if let Some(artist_account_id) = &filter.artist_account_id {
            query.push_str(" AND artist_account_id = ?");
            bindings.push(artist_account_id.clone());
        }
        if let Some(enabled) = filter.enabled {
            query.push_str(if enabled { " AND enabled = 1" } else { " AND enabled = 0" });
        }

        query.push_str(" ORDER BY created_at ASC");

        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_task).collect()
    }
}
