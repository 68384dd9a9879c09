//! HTTP adapter for a Trigger.dev-style schedules API.

pub mod client;
pub mod models;
pub mod retry;

pub use client::TriggerScheduleClient;
pub use retry::RetryPolicy;
