//! schedsync CLI entry point.

use anyhow::Result;
use clap::Parser;

use schedsync::cli::{commands, handle_error, AppContext, Cli, Commands};
use schedsync::infrastructure::config::ConfigLoader;
use schedsync::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(&err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let mut log_config = LogConfig::from(&config.logging);
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logger = LoggerImpl::init(&log_config)?;

    let ctx = AppContext::from_config(config).await?;

    match cli.command {
        Commands::Task(args) => commands::task::execute(args, &ctx, cli.json).await,
        Commands::Reconcile(args) => commands::reconcile::execute(args, &ctx, cli.json).await,
    }
}
