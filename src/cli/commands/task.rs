//! Task CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::task::{NewTask, Task, TaskFilter, TaskUpdate};

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task and register its schedule
    Create(CreateArgs),

    /// Change fields of a task, re-registering its schedule if needed
    Update(UpdateArgs),

    /// Delete a task and its schedule
    Delete {
        /// Task ID
        id: Uuid,

        /// Fail unless the stored version matches
        #[arg(long)]
        expected_version: Option<i64>,
    },

    /// Show a task
    Show {
        /// Task ID
        id: Uuid,
    },

    /// List tasks
    List {
        #[arg(long)]
        account_id: Option<String>,

        #[arg(long)]
        artist_account_id: Option<String>,

        /// Only enabled tasks
        #[arg(long, conflicts_with = "disabled")]
        enabled: bool,

        /// Only disabled tasks
        #[arg(long)]
        disabled: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    /// Prompt sent on every run
    #[arg(long)]
    pub prompt: String,

    /// Cron expression (5-field: min hour dom month dow)
    #[arg(long)]
    pub cron: String,

    #[arg(long)]
    pub account_id: String,

    #[arg(long)]
    pub artist_account_id: String,

    /// IANA timezone; the configured default when omitted
    #[arg(long)]
    pub timezone: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Create the task without a schedule
    #[arg(long)]
    pub disabled: bool,

    /// Explicit task ID, for retrying a create
    #[arg(long)]
    pub id: Option<Uuid>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Task ID
    pub id: Uuid,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long)]
    pub cron: Option<String>,

    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,

    #[arg(long)]
    pub account_id: Option<String>,

    #[arg(long)]
    pub artist_account_id: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Fail unless the stored version matches
    #[arg(long)]
    pub expected_version: Option<i64>,
}

impl From<CreateArgs> for NewTask {
    fn from(args: CreateArgs) -> Self {
        let mut new = NewTask::new(args.title, args.prompt, args.cron, args.account_id, args.artist_account_id)
            .with_enabled(!args.disabled);
        if let Some(id) = args.id {
            new = new.with_id(id);
        }
        if let Some(tz) = args.timezone {
            new = new.with_timezone(tz);
        }
        if let Some(model) = args.model {
            new = new.with_model(model);
        }
        new
    }
}

impl From<UpdateArgs> for TaskUpdate {
    fn from(args: UpdateArgs) -> Self {
        let enabled = match (args.enable, args.disable) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Self {
            title: args.title,
            prompt: args.prompt,
            cron_expression: args.cron,
            enabled,
            account_id: args.account_id,
            artist_account_id: args.artist_account_id,
            model: args.model,
            expected_version: args.expected_version,
        }
    }
}

// -- Output structs --

#[derive(Debug, serde::Serialize)]
pub struct TaskOutput {
    pub id: String,
    pub title: String,
    pub prompt: String,
    pub cron_expression: String,
    pub timezone: String,
    pub enabled: bool,
    pub account_id: String,
    pub artist_account_id: String,
    pub model: Option<String>,
    pub external_schedule_id: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Task> for TaskOutput {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id.to_string(),
            title: t.title.clone(),
            prompt: t.prompt.clone(),
            cron_expression: t.cron_expression.clone(),
            timezone: t.timezone.clone(),
            enabled: t.enabled,
            account_id: t.account_id.clone(),
            artist_account_id: t.artist_account_id.clone(),
            model: t.model.clone(),
            external_schedule_id: t.external_schedule_id.clone(),
            version: t.version,
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for TaskOutput {
    fn to_human(&self) -> String {
        let lines = [
            format!("Task: {}", self.title),
            format!("ID: {}", self.id),
            format!("Enabled: {}", self.enabled),
            format!("Schedule: {} ({})", self.cron_expression, self.timezone),
            format!("Schedule ID: {}", self.external_schedule_id.as_deref().unwrap_or("-")),
            format!("Account: {}", self.account_id),
            format!("Artist Account: {}", self.artist_account_id),
            format!("Model: {}", self.model.as_deref().unwrap_or("-")),
            format!("Prompt: {}", truncate(&self.prompt, 80)),
            format!("Version: {}", self.version),
            format!("Created: {}", self.created_at),
            format!("Updated: {}", self.updated_at),
        ];
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskListOutput {
    pub tasks: Vec<TaskOutput>,
    pub total: usize,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }

        let mut t = table(&["ID", "TITLE", "CRON", "TZ", "ENABLED", "SCHEDULE ID"]);
        for task in &self.tasks {
            t.add_row(vec![
                task.id.chars().take(8).collect::<String>(),
                truncate(&task.title, 30),
                task.cron_expression.clone(),
                task.timezone.clone(),
                if task.enabled { "yes" } else { "no" }.to_string(),
                task.external_schedule_id.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        format!("Found {} task(s):\n{t}", self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskActionOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskOutput>,
}

impl CommandOutput for TaskActionOutput {
    fn to_human(&self) -> String {
        match self.task {
            Some(ref task) => format!("{}\n\n{}", self.message, task.to_human()),
            None => self.message.clone(),
        }
    }
}

// -- Execute --

pub async fn execute(args: TaskArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        TaskCommands::Create(create) => {
            let task = ctx.sync.create_task(create.into()).await?;
            let out = TaskActionOutput {
                success: true,
                message: format!("Created task '{}'", task.title),
                task: Some(TaskOutput::from(&task)),
            };
            output(&out, json_mode);
        }

        TaskCommands::Update(update) => {
            let id = update.id;
            let task = ctx.sync.update_task(id, update.into()).await?;
            let out = TaskActionOutput {
                success: true,
                message: format!("Updated task '{}'", task.title),
                task: Some(TaskOutput::from(&task)),
            };
            output(&out, json_mode);
        }

        TaskCommands::Delete { id, expected_version } => {
            ctx.sync.delete_task(id, expected_version).await?;
            let out = TaskActionOutput {
                success: true,
                message: format!("Deleted task {id}"),
                task: None,
            };
            output(&out, json_mode);
        }

        TaskCommands::Show { id } => {
            let task = ctx.sync.get_task(id).await?;
            output(&TaskOutput::from(&task), json_mode);
        }

        TaskCommands::List {
            account_id,
            artist_account_id,
            enabled,
            disabled,
        } => {
            let filter = TaskFilter {
                id: None,
                account_id,
                artist_account_id,
                enabled: if enabled {
                    Some(true)
                } else if disabled {
                    Some(false)
                } else {
                    None
                },
            };
            let tasks = ctx.sync.list_tasks(&filter).await?;
            let out = TaskListOutput {
                total: tasks.len(),
                tasks: tasks.iter().map(TaskOutput::from).collect(),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
