//! Command-line options for the `table_loader` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::constants::DEFAULT_CONFIG_PATH;
use crate::config::types::{LogFormat, LogLevel};

/// Create a destination table and batch-insert records into it.
#[derive(Debug, Parser)]
#[command(name = "table_loader", version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Environment to connect to (defaults to environment.current)
    #[arg(long, short = 'e')]
    pub environment: Option<String>,

    /// Log level (overrides app.log_level)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the active environment and its connection target
    ShowConfig,

    /// Create the destination table if it does not exist
    CreateTable {
        /// Table name (defaults to database.table_name)
        #[arg(long)]
        table: Option<String>,
    },

    /// Insert records from a JSON array or JSON-lines file
    Insert {
        /// Input file
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Table name (defaults to database.table_name)
        #[arg(long)]
        table: Option<String>,

        /// Insert mode
        #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
        mode: ModeArg,
    },
}

/// How `insert` picks between the sequential and parallel paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Follow app.threading.enable_threading
    Auto,
    /// One connection, one transaction
    Sequential,
    /// Chunks across a bounded worker pool
    Parallel,
}
