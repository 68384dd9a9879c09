//! Scheduled task domain model.
//!
//! A [`Task`] is the durable record of a recurring prompt. While it is
//! enabled it is backed by exactly one external schedule whose id is kept in
//! `external_schedule_id`; the schedule itself lives in the remote service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Timezone used when a caller does not supply one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// A persisted recurring task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub prompt: String,
    /// Five-field cron expression (min hour dom month dow).
    pub cron_expression: String,
    /// IANA timezone the cron expression is evaluated in. Fixed at creation.
    pub timezone: String,
    /// Whether the task should currently have an active external schedule.
    pub enabled: bool,
    pub account_id: String,
    pub artist_account_id: String,
    /// Model the prompt should run with, if not the service default.
    pub model: Option<String>,
    /// Id of the external schedule backing this task, if any.
    pub external_schedule_id: Option<String>,
    /// Optimistic concurrency token, bumped on every store write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh, not yet persisted record from a create request.
    pub fn from_new(new: NewTask, default_timezone: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new.id.unwrap_or_else(Uuid::new_v4),
            title: new.title,
            prompt: new.prompt,
            cron_expression: new.cron_expression,
            timezone: new
                .timezone
                .unwrap_or_else(|| default_timezone.to_string()),
            enabled: new.enabled,
            account_id: new.account_id,
            artist_account_id: new.artist_account_id,
            model: new.model,
            external_schedule_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `other` describes the same schedule-relevant state as `self`.
    ///
    /// Used to recognise a retried create of a task that was persisted by an
    /// earlier, partially failed attempt.
    pub fn same_schedule_definition(&self, other: &Task) -> bool {
        self.cron_expression == other.cron_expression
            && self.timezone == other.timezone
            && self.enabled == other.enabled
    }

    /// Apply a patch in memory, mirroring what the store does on update.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref prompt) = patch.prompt {
            self.prompt = prompt.clone();
        }
        if let Some(ref cron) = patch.cron_expression {
            self.cron_expression = cron.clone();
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(ref account_id) = patch.account_id {
            self.account_id = account_id.clone();
        }
        if let Some(ref artist_account_id) = patch.artist_account_id {
            self.artist_account_id = artist_account_id.clone();
        }
        if let Some(ref model) = patch.model {
            self.model = Some(model.clone());
        }
        if let Some(ref external_id) = patch.external_schedule_id {
            self.external_schedule_id = external_id.clone();
        }
    }
}

/// Request to create a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    /// Caller-chosen id. Retries of a failed create must reuse the same id.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    pub prompt: String,
    pub cron_expression: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub account_id: String,
    pub artist_account_id: String,
    #[serde(default)]
    pub model: Option<String>,
}

const fn default_enabled() -> bool {
    true
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        prompt: impl Into<String>,
        cron_expression: impl Into<String>,
        account_id: impl Into<String>,
        artist_account_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            prompt: prompt.into(),
            cron_expression: cron_expression.into(),
            timezone: None,
            enabled: true,
            account_id: account_id.into(),
            artist_account_id: artist_account_id.into(),
            model: None,
        }
    }

    // Builder methods
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Check every field before any I/O happens.
    pub fn validate(&self) -> DomainResult<()> {
        require_non_empty("title", &self.title)?;
        require_non_empty("prompt", &self.prompt)?;
        require_non_empty("account_id", &self.account_id)?;
        require_non_empty("artist_account_id", &self.artist_account_id)?;
        validate_cron(&self.cron_expression)?;
        if let Some(ref tz) = self.timezone {
            validate_timezone(tz)?;
        }
        if let Some(ref model) = self.model {
            require_non_empty("model", model)?;
        }
        Ok(())
    }
}

/// Caller-facing partial update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub artist_account_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Version the caller last read. When present it must match the stored
    /// version or the update is rejected.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl TaskUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        let optional_fields = [
            ("title", &self.title),
            ("prompt", &self.prompt),
            ("account_id", &self.account_id),
            ("artist_account_id", &self.artist_account_id),
            ("model", &self.model),
        ];
        for (name, value) in optional_fields {
            if let Some(value) = value {
                require_non_empty(name, value)?;
            }
        }
        if let Some(ref cron) = self.cron_expression {
            validate_cron(cron)?;
        }
        Ok(())
    }

    /// Translate into a store patch; the schedule id is filled in by the
    /// orchestrator once the schedule service has been reconciled.
    pub fn to_patch(&self) -> TaskPatch {
        TaskPatch {
            title: self.title.clone(),
            prompt: self.prompt.clone(),
            cron_expression: self.cron_expression.clone(),
            enabled: self.enabled,
            account_id: self.account_id.clone(),
            artist_account_id: self.artist_account_id.clone(),
            model: self.model.clone(),
            external_schedule_id: None,
        }
    }
}

/// Store-level partial write.
///
/// `external_schedule_id` is doubly optional: `None` leaves the column
/// alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub prompt: Option<String>,
    pub cron_expression: Option<String>,
    pub enabled: Option<bool>,
    pub account_id: Option<String>,
    pub artist_account_id: Option<String>,
    pub model: Option<String>,
    pub external_schedule_id: Option<Option<String>>,
}

impl TaskPatch {
    /// Patch that only records a new external schedule id.
    pub fn schedule_id(external_schedule_id: Option<String>) -> Self {
        Self {
            external_schedule_id: Some(external_schedule_id),
            ..Self::default()
        }
    }
}

/// Filter for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub id: Option<Uuid>,
    pub account_id: Option<String>,
    pub artist_account_id: Option<String>,
    pub enabled: Option<bool>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.id.map_or(true, |id| task.id == id)
            && self
                .account_id
                .as_deref()
                .map_or(true, |a| task.account_id == a)
            && self
                .artist_account_id
                .as_deref()
                .map_or(true, |a| task.artist_account_id == a)
            && self.enabled.map_or(true, |e| task.enabled == e)
    }
}

fn require_non_empty(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::ValidationFailed(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Reject anything that is not a parsable five-field cron expression.
pub fn validate_cron(expression: &str) -> DomainResult<()> {
    require_non_empty("cron_expression", expression)?;
    croner::Cron::new(expression).parse().map_err(|e| {
        DomainError::ValidationFailed(format!(
            "Invalid cron expression '{expression}': {e}"
        ))
    })?;
    Ok(())
}

/// Reject anything that is not an IANA timezone name.
pub fn validate_timezone(timezone: &str) -> DomainResult<()> {
    require_non_empty("timezone", timezone)?;
    timezone.parse::<chrono_tz::Tz>().map_err(|_| {
        DomainError::ValidationFailed(format!("Unknown timezone '{timezone}'"))
    })?;
    Ok(())
}
