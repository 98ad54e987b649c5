//! Logger initialization.
//!
//! Plain output is colored and one line per record; JSON output is one object
//! per line with a millisecond timestamp, for log shippers.

use std::io::Write;

use colored::*;
use log::{Level, LevelFilter};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Initializes `env_logger` at `level` in the given `format`.
///
/// `RUST_LOG` is read first and `level` then overrides it for this crate and
/// as the global default. Per-module directives in `RUST_LOG` for other
/// crates are kept. `sqlx` statement logging is capped at `warn` unless
/// `RUST_LOG` names `sqlx` itself, so `RUST_LOG=sqlx=debug` widens it.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// ```bash
/// RUST_LOG=debug table_loader insert --input rooms.jsonl
/// table_loader --log-level warning --log-format json insert --input rooms.jsonl
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    if let Some(cap) = sqlx_cap(std::env::var("RUST_LOG").ok().as_deref()) {
        builder.filter_module("sqlx", cap);
    }
    builder.filter_module("table_loader", level);

    match format {
        LogFormat::Json => {
            colored::control::set_override(false);
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{}",
                    json_line(
                        chrono::Utc::now().timestamp_millis(),
                        record.level(),
                        record.target(),
                        &record.args().to_string(),
                    )
                )
            });
        }
        LogFormat::Plain => {
            colored::control::set_override(true);
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{} {} [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.target().cyan(),
                    colored_level(record.level()),
                    record.args()
                )
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

/// Level to hold `sqlx` at, or `None` when `RUST_LOG` already has a
/// directive for it.
fn sqlx_cap(rust_log: Option<&str>) -> Option<LevelFilter> {
    let names_sqlx = rust_log.is_some_and(|spec| {
        spec.split(',')
            .filter_map(|directive| directive.split('=').next())
            .any(|module| {
                let module = module.trim();
                module == "sqlx" || module.starts_with("sqlx::") || module.starts_with("sqlx_")
            })
    });
    (!names_sqlx).then_some(LevelFilter::Warn)
}

fn colored_level(level: Level) -> ColoredString {
    let name = level.to_string();
    match level {
        Level::Error => name.red(),
        Level::Warn => name.yellow(),
        Level::Info => name.green(),
        Level::Debug => name.blue(),
        Level::Trace => name.purple(),
    }
}

/// One JSON log line. The message is JSON-escaped.
fn json_line(ts_millis: i64, level: Level, target: &str, message: &str) -> String {
    serde_json::json!({
        "ts": ts_millis,
        "level": level.to_string(),
        "target": target,
        "msg": message,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_line_escapes_message() {
        let line = json_line(
            1_700_000_000_000,
            Level::Warn,
            "table_loader::storage",
            "bad \"row\"\n",
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["ts"], 1_700_000_000_000i64);
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["target"], "table_loader::storage");
        assert_eq!(parsed["msg"], "bad \"row\"\n");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_sqlx_capped_unless_rust_log_names_it() {
        assert_eq!(sqlx_cap(None), Some(LevelFilter::Warn));
        assert_eq!(sqlx_cap(Some("debug")), Some(LevelFilter::Warn));
        assert_eq!(sqlx_cap(Some("table_loader=trace")), Some(LevelFilter::Warn));
        assert_eq!(sqlx_cap(Some("sqlxish=debug")), Some(LevelFilter::Warn));
        assert_eq!(sqlx_cap(Some("sqlx=debug")), None);
        assert_eq!(sqlx_cap(Some("info, sqlx::query=trace")), None);
        assert_eq!(sqlx_cap(Some("sqlx_postgres=debug")), None);
    }

    #[test]
    fn test_init_logger_twice_does_not_panic() {
        // env_logger can only be installed once per process; the second
        // call must report an error rather than panic
        let _ = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        let second = init_logger_with(LevelFilter::Debug, LogFormat::Json);
        assert!(matches!(second, Err(InitializationError::LoggerError(_))));
    }
}
