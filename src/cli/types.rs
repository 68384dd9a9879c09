//! CLI type definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::reconcile::ReconcileArgs;
use super::commands::task::TaskArgs;

#[derive(Parser, Debug)]
#[command(name = "schedsync")]
#[command(about = "Keep scheduled prompt tasks in sync with the cron-trigger service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .schedsync/config.yaml)
    #[arg(short, long, global = true, env = "SCHEDSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, update, delete and inspect scheduled tasks
    Task(TaskArgs),

    /// Repair drift between stored tasks and the schedule service
    Reconcile(ReconcileArgs),
}
