//! Wire types for the schedules API.

use serde::{Deserialize, Serialize};

use crate::domain::models::schedule::{ExternalSchedule, ScheduleRequest};

/// Body of `POST /api/v1/schedules`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleBody<'a> {
    pub task: &'a str,
    pub cron: &'a str,
    pub deduplication_key: &'a str,
    pub external_id: &'a str,
    pub timezone: &'a str,
}

impl<'a> CreateScheduleBody<'a> {
    pub fn new(task: &'a str, request: &'a ScheduleRequest) -> Self {
        Self {
            task,
            cron: &request.cron_expression,
            deduplication_key: &request.deduplication_key,
            external_id: &request.external_id,
            timezone: &request.timezone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleGenerator {
    pub expression: String,
}

/// Schedule object returned by create and retrieve.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub deduplication_key: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    pub generator: ScheduleGenerator,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    crate::domain::models::task::DEFAULT_TIMEZONE.to_string()
}

impl From<ScheduleResponse> for ExternalSchedule {
    fn from(resp: ScheduleResponse) -> Self {
        Self {
            id: resp.id,
            cron_expression: resp.generator.expression,
            timezone: resp.timezone,
            deduplication_key: resp.deduplication_key.unwrap_or_default(),
            external_id: resp.external_id,
            active: resp.active,
        }
    }
}
