//! Main application entry point (CLI binary).
//!
//! A thin wrapper around the `table_loader` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::process;

use table_loader::config::{Cli, Command, ModeArg};
use table_loader::initialization::init_logger_with;
use table_loader::{load_records, ConfigLoader, Loader};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("table_loader error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let loader = ConfigLoader::new(&cli.config);
    let config = loader
        .load()
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let level = cli.log_level.unwrap_or_else(|| config.log_level());
    init_logger_with(level.into(), cli.log_format).context("Failed to initialize logger")?;
    info!("Configuration loaded from {}", loader.path().display());

    if let Command::ShowConfig = cli.command {
        let environment = cli
            .environment
            .as_deref()
            .unwrap_or_else(|| config.current_environment());
        let target = config.database_config(Some(environment))?;
        println!("Environment: {environment}");
        println!("Database: {target}");
        println!("Environments: {}", config.environments().join(", "));
        match config.table_name() {
            Ok(table) => println!("Table: {table}"),
            Err(_) => println!("Table: (not configured)"),
        }
        println!(
            "Batch size: {}, threading: {}",
            config.batch_size(),
            if config.is_threading_enabled() { "enabled" } else { "disabled" }
        );
        return Ok(());
    }

    let pipeline = Loader::new(config, cli.environment.as_deref())
        .await
        .context("Failed to initialize loader")?;
    let result = execute(&pipeline, cli.command).await;
    pipeline.close().await;
    result
}

async fn execute(pipeline: &Loader, command: Command) -> Result<()> {
    match command {
        Command::ShowConfig => Ok(()),
        Command::CreateTable { table } => {
            pipeline
                .create_table(table.as_deref())
                .await
                .context("Failed to create table")?;
            println!("✅ Table ready in environment '{}'", pipeline.environment());
            Ok(())
        }
        Command::Insert { input, table, mode } => {
            let records = load_records(&input)
                .with_context(|| format!("Failed to read records from {}", input.display()))?;
            let table = table.as_deref();
            let report = match mode {
                ModeArg::Auto => pipeline.insert(records, table).await,
                ModeArg::Sequential => pipeline.insert_sequential(&records, table).await,
                ModeArg::Parallel => pipeline.insert_parallel(records, table).await,
            }
            .context("Insert failed")?;
            println!(
                "✅ Inserted {} record{} into {} ({} mode, {} chunk{}) in {:.1}s",
                report.rows_inserted,
                if report.rows_inserted == 1 { "" } else { "s" },
                report.table,
                report.mode,
                report.chunks,
                if report.chunks == 1 { "" } else { "s" },
                report.elapsed.as_secs_f64()
            );
            Ok(())
        }
    }
}
