//! Domain layer for the schedule synchronization core
//!
//! This module contains the task model, the error taxonomy and the ports
//! through which the core reaches the task store and the schedule service.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
