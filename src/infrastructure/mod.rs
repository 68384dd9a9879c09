//! Infrastructure layer
//!
//! Process-level concerns shared by the binary and the integration tests:
//! - Configuration loading (figment)
//! - Logging setup (tracing)

pub mod config;
pub mod logging;
