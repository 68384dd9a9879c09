//! HTTP client for the schedules API.
//!
//! Implements [`ScheduleService`] against `/api/v1/schedules`. Every call is
//! wrapped in a [`RetryPolicy`]; creation is safe to retry because the
//! service deduplicates on the request's deduplication key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::{RetryConfig, ScheduleServiceConfig};
use crate::domain::models::schedule::{ExternalSchedule, ScheduleRequest};
use crate::domain::ports::schedule_service::{ScheduleService, ScheduleServiceError};

use super::models::{CreateScheduleBody, ScheduleResponse};
use super::retry::RetryPolicy;

const SCHEDULES_PATH: &str = "/api/v1/schedules";

#[derive(Debug, Clone)]
pub struct TriggerScheduleClient {
    http: Client,
    base_url: String,
    api_key: String,
    /// Remote task every schedule triggers.
    task_identifier: String,
    retry: RetryPolicy,
}

impl TriggerScheduleClient {
    /// Build a client from configuration.
    ///
    /// Fails if no API key is configured.
    pub fn from_config(service: &ScheduleServiceConfig, retry: &RetryConfig) -> DomainResult<Self> {
        let api_key = service
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DomainError::ValidationFailed("schedule_service.api_key is not configured".to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(service.timeout_secs))
            .build()
            .map_err(|e| ScheduleServiceError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: service.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            task_identifier: service.task_identifier.clone(),
            retry: RetryPolicy::from(retry),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ScheduleServiceError> {
        builder.send().await.map_err(transport_error)
    }

    async fn create_once(&self, request: &ScheduleRequest) -> Result<ExternalSchedule, ScheduleServiceError> {
        let body = CreateScheduleBody::new(&self.task_identifier, request);
        let resp = Self::send(self.request(Method::POST, SCHEDULES_PATH).json(&body)).await?;
        let resp = ensure_success(resp).await?;
        parse_schedule(resp).await
    }

    async fn delete_once(&self, schedule_id: &str) -> Result<(), ScheduleServiceError> {
        let path = format!("{SCHEDULES_PATH}/{schedule_id}");
        let resp = Self::send(self.request(Method::DELETE, &path)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ScheduleServiceError::NotFound(schedule_id.to_string()));
        }
        ensure_success(resp).await?;
        Ok(())
    }

    async fn get_once(&self, schedule_id: &str) -> Result<Option<ExternalSchedule>, ScheduleServiceError> {
        let path = format!("{SCHEDULES_PATH}/{schedule_id}");
        let resp = Self::send(self.request(Method::GET, &path)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        parse_schedule(resp).await.map(Some)
    }
}

fn transport_error(e: reqwest::Error) -> ScheduleServiceError {
    if e.is_timeout() {
        ScheduleServiceError::Timeout
    } else {
        ScheduleServiceError::Transport(e.to_string())
    }
}

async fn ensure_success(resp: Response) -> Result<Response, ScheduleServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(ScheduleServiceError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn parse_schedule(resp: Response) -> Result<ExternalSchedule, ScheduleServiceError> {
    resp.json::<ScheduleResponse>()
        .await
        .map(ExternalSchedule::from)
        .map_err(|e| ScheduleServiceError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl ScheduleService for TriggerScheduleClient {
    #[instrument(skip(self, request), fields(dedup_key = %request.deduplication_key), err)]
    async fn create_schedule(&self, request: &ScheduleRequest) -> Result<ExternalSchedule, ScheduleServiceError> {
        let schedule = self.retry.execute(|| self.create_once(request)).await?;
        debug!(schedule_id = %schedule.id, "schedule registered");
        Ok(schedule)
    }

    #[instrument(skip(self), err)]
    async fn delete_schedule(&self, schedule_id: &str) -> Result<(), ScheduleServiceError> {
        self.retry.execute(|| self.delete_once(schedule_id)).await
    }

    #[instrument(skip(self), err)]
    async fn get_schedule(&self, schedule_id: &str) -> Result<Option<ExternalSchedule>, ScheduleServiceError> {
        self.retry.execute(|| self.get_once(schedule_id)).await
    }
}
