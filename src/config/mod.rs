//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (defaults and dialect limits)
//! - The YAML configuration types and their accessors
//! - The cached configuration loader
//! - CLI option types and parsing

mod cli;
mod constants;
mod loader;
mod types;

// Re-export all constants
pub use cli::{Cli, Command, ModeArg};
pub use constants::*;
pub use loader::ConfigLoader;
pub use types::{
    AppConfig, ConnectionConfig, Driver, LogFormat, LogLevel, PoolConfig, ThreadingConfig,
};
