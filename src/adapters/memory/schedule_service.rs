//! In-memory schedule service.
//!
//! Honours deduplication keys the way the real service does: creating a
//! schedule with a key that already has a live registration returns that
//! registration (updated to the requested cron) instead of a new one.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::schedule::{ExternalSchedule, ScheduleRequest};
use crate::domain::ports::schedule_service::{ScheduleService, ScheduleServiceError};

/// A call observed by the in-memory service, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleCall {
    Create { deduplication_key: String, cron_expression: String },
    Delete { schedule_id: String },
    Get { schedule_id: String },
}

#[derive(Debug, Default)]
struct State {
    schedules: BTreeMap<String, ExternalSchedule>,
    next_id: u64,
    calls: Vec<ScheduleCall>,
    create_failures: VecDeque<ScheduleServiceError>,
    delete_failures: VecDeque<ScheduleServiceError>,
}

#[derive(Debug, Default)]
pub struct InMemoryScheduleService {
    state: Mutex<State>,
}

impl InMemoryScheduleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error for the next `create_schedule` call.
    pub async fn fail_next_create(&self, err: ScheduleServiceError) {
        self.state.lock().await.create_failures.push_back(err);
    }

    /// Queue an error for the next `delete_schedule` call.
    pub async fn fail_next_delete(&self, err: ScheduleServiceError) {
        self.state.lock().await.delete_failures.push_back(err);
    }

    /// All live registrations, ordered by id.
    pub async fn schedules(&self) -> Vec<ExternalSchedule> {
        self.state.lock().await.schedules.values().cloned().collect()
    }

    pub async fn schedule(&self, schedule_id: &str) -> Option<ExternalSchedule> {
        self.state.lock().await.schedules.get(schedule_id).cloned()
    }

    /// Every call made so far.
    pub async fn calls(&self) -> Vec<ScheduleCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls that change service state (creates and deletes).
    pub async fn mutating_calls(&self) -> Vec<ScheduleCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| !matches!(c, ScheduleCall::Get { .. }))
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Drop a registration without recording a call, as if it were removed
    /// out of band.
    pub async fn forget(&self, schedule_id: &str) {
        self.state.lock().await.schedules.remove(schedule_id);
    }

    /// Change a registration's cron out of band.
    pub async fn set_cron(&self, schedule_id: &str, cron_expression: &str) {
        if let Some(schedule) = self.state.lock().await.schedules.get_mut(schedule_id) {
            schedule.cron_expression = cron_expression.to_string();
        }
    }
}

#[async_trait]
impl ScheduleService for InMemoryScheduleService {
    async fn create_schedule(&self, request: &ScheduleRequest) -> Result<ExternalSchedule, ScheduleServiceError> {
        let mut state = self.state.lock().await;
        state.calls.push(ScheduleCall::Create {
            deduplication_key: request.deduplication_key.clone(),
            cron_expression: request.cron_expression.clone(),
        });
        if let Some(err) = state.create_failures.pop_front() {
            return Err(err);
        }

        let existing = state
            .schedules
            .values_mut()
            .find(|s| s.deduplication_key == request.deduplication_key);
        if let Some(schedule) = existing {
            schedule.cron_expression = request.cron_expression.clone();
            schedule.timezone = request.timezone.clone();
            return Ok(schedule.clone());
        }

        state.next_id += 1;
        let schedule = ExternalSchedule {
            id: format!("sched-{}", state.next_id),
            cron_expression: request.cron_expression.clone(),
            timezone: request.timezone.clone(),
            deduplication_key: request.deduplication_key.clone(),
            external_id: Some(request.external_id.clone()),
            active: true,
        };
        state.schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    async fn delete_schedule(&self, schedule_id: &str) -> Result<(), ScheduleServiceError> {
        let mut state = self.state.lock().await;
        state.calls.push(ScheduleCall::Delete {
            schedule_id: schedule_id.to_string(),
        });
        if let Some(err) = state.delete_failures.pop_front() {
            return Err(err);
        }

        state
            .schedules
            .remove(schedule_id)
            .map(|_| ())
            .ok_or_else(|| ScheduleServiceError::NotFound(schedule_id.to_string()))
    }

    async fn get_schedule(&self, schedule_id: &str) -> Result<Option<ExternalSchedule>, ScheduleServiceError> {
        let mut state = self.state.lock().await;
        state.calls.push(ScheduleCall::Get {
            schedule_id: schedule_id.to_string(),
        });
        Ok(state.schedules.get(schedule_id).cloned())
    }
}
