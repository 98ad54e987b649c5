//! SQL rendering details that differ between database drivers.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{Driver, POSTGRES_MAX_BIND_PARAMS, SQLITE_MAX_BIND_PARAMS};
use crate::error_handling::DatabaseError;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier pattern is valid")
});

impl Driver {
    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Driver::Postgres => format!("${index}"),
            Driver::Sqlite => "?".to_string(),
        }
    }

    /// Most bind parameters one statement may carry.
    pub fn max_bind_params(self) -> usize {
        match self {
            Driver::Postgres => POSTGRES_MAX_BIND_PARAMS,
            Driver::Sqlite => SQLITE_MAX_BIND_PARAMS,
        }
    }

    pub fn supports_column_comments(self) -> bool {
        matches!(self, Driver::Postgres)
    }

    /// Column definition of an auto-incrementing surrogate key.
    pub fn serial_primary_key(self, column: &str) -> String {
        match self {
            Driver::Postgres => format!("{column} SERIAL PRIMARY KEY"),
            Driver::Sqlite => format!("{column} INTEGER PRIMARY KEY AUTOINCREMENT"),
        }
    }
}

/// Checks that `name` is a plain identifier, optionally schema-qualified.
///
/// Table and column names are interpolated into SQL text, so anything that
/// is not `[A-Za-z_][A-Za-z0-9_]*` is rejected.
pub fn validate_identifier(name: &str) -> Result<&str, DatabaseError> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

/// Renders `text` as a single-quoted SQL string literal.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
