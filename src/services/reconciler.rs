//! Decides what must change about a task's external schedule.
//!
//! [`reconcile`] is a pure function: it never performs I/O, so every
//! synchronization flow (create, update, drift correction) shares one
//! decision table and that table can be tested directly.

use serde::Serialize;

/// The schedule currently recorded for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentScheduleState {
    pub external_schedule_id: Option<String>,
}

impl CurrentScheduleState {
    pub fn new(external_schedule_id: Option<String>) -> Self {
        Self { external_schedule_id }
    }
}

/// The schedule state the caller wants after the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredScheduleState {
    pub enabled: bool,
    pub cron_expression: String,
    /// Whether the cron differs from the one the existing schedule uses.
    pub cron_changed: bool,
}

/// Action to perform against the schedule service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScheduleAction {
    /// Current state already satisfies the desired state.
    NoOp,
    /// No schedule exists and one is wanted.
    Create { cron_expression: String },
    /// A schedule exists and is still wanted, but with a different cron.
    Replace { existing_id: String, cron_expression: String },
    /// A schedule exists and is no longer wanted.
    Delete { existing_id: String },
}

impl ScheduleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "noop",
            Self::Create { .. } => "create",
            Self::Replace { .. } => "replace",
            Self::Delete { .. } => "delete",
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

/// Map current and desired state to exactly one action.
///
/// | schedule id | enabled | cron changed | action  |
/// |-------------|---------|--------------|---------|
/// | none        | false   | any          | NoOp    |
/// | none        | true    | any          | Create  |
/// | some        | false   | any          | Delete  |
/// | some        | true    | false        | NoOp    |
/// | some        | true    | true         | Replace |
pub fn reconcile(current: &CurrentScheduleState, desired: &DesiredScheduleState) -> ScheduleAction {
    match (&current.external_schedule_id, desired.enabled, desired.cron_changed) {
        (None, false, _) => ScheduleAction::NoOp,
        (None, true, _) => ScheduleAction::Create {
            cron_expression: desired.cron_expression.clone(),
        },
        (Some(existing), false, _) => ScheduleAction::Delete {
            existing_id: existing.clone(),
        },
        (Some(_), true, false) => ScheduleAction::NoOp,
        (Some(existing), true, true) => ScheduleAction::Replace {
            existing_id: existing.clone(),
            cron_expression: desired.cron_expression.clone(),
        },
    }
}
