//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands};

use crate::domain::errors::DomainError;

/// Print `err` and exit with a non-zero status.
///
/// Domain errors keep their kind so scripted callers can branch on it.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    let kind = err.downcast_ref::<DomainError>().map_or("error", DomainError::kind);

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": kind,
            "message": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }

    std::process::exit(exit_code(kind));
}

/// Exit status for an error kind.
pub fn exit_code(kind: &str) -> i32 {
    match kind {
        "validation_error" => 2,
        "not_found" => 3,
        "conflict" => 4,
        "schedule_service_error" => 5,
        "inconsistent" => 6,
        _ => 1,
    }
}
