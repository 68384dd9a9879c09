//! Drift correction CLI command.

use anyhow::Result;
use clap::Args;

use crate::cli::context::AppContext;
use crate::cli::output::{output, table, CommandOutput};
use crate::domain::models::task::TaskFilter;
use crate::services::drift_corrector::DriftReport;

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Only examine tasks of this account
    #[arg(long)]
    pub account_id: Option<String>,

    /// Only examine tasks of this artist account
    #[arg(long)]
    pub artist_account_id: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ReconcileOutput {
    pub success: bool,
    #[serde(flatten)]
    pub report: DriftReport,
}

impl CommandOutput for ReconcileOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut out = format!(
            "Examined {} task(s): {} repaired, {} failed",
            report.examined,
            report.repairs.len(),
            report.failures.len()
        );

        if !report.repairs.is_empty() {
            let mut t = table(&["TASK", "ACTION", "PREVIOUS", "SCHEDULE ID"]);
            for repair in &report.repairs {
                t.add_row(vec![
                    repair.task_id.to_string(),
                    repair.action.as_str().to_string(),
                    repair.previous_schedule_id.clone().unwrap_or_else(|| "-".to_string()),
                    repair.schedule_id.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            out.push_str(&format!("\n\nRepairs:\n{t}"));
        }

        if !report.failures.is_empty() {
            let mut t = table(&["TASK", "ERROR"]);
            for failure in &report.failures {
                t.add_row(vec![failure.task_id.to_string(), failure.error.clone()]);
            }
            out.push_str(&format!("\n\nFailures:\n{t}"));
        }

        out
    }
}

/// Run one drift correction pass. Fails after printing the report if any
/// task could not be repaired.
pub async fn execute(args: ReconcileArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let filter = TaskFilter {
        account_id: args.account_id,
        artist_account_id: args.artist_account_id,
        ..TaskFilter::default()
    };
    let report = ctx.corrector.run(&filter).await?;
    let failed = report.failures.len();

    output(
        &ReconcileOutput {
            success: failed == 0,
            report,
        },
        json_mode,
    );

    if failed > 0 {
        anyhow::bail!("{failed} task(s) could not be reconciled");
    }
    Ok(())
}
