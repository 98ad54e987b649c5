//! Records to insert and how they are read from input files.
//!
//! A [`Record`] maps column names to [`Value`]s. Keys are kept sorted so
//! records with the same column set always yield their values in the same
//! order, which is the order the INSERT statement lists its columns in.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error_handling::InputError;

/// One cell of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One row to insert: column name to value.
pub type Record = BTreeMap<String, Value>;

/// Builds a record from `(column, value)` pairs.
///
/// ```
/// use table_loader::{record, Value};
///
/// let row = record([("room_name", Value::from("Deluxe")), ("price", Value::from(88.5))]);
/// assert_eq!(row.len(), 2);
/// ```
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Reads records from a JSON file.
///
/// The file is either a single JSON array of objects or JSON lines (one object
/// per line, blank lines ignored).
pub fn load_records(path: &Path) -> Result<Vec<Record>, InputError> {
    let contents = std::fs::read_to_string(path).map_err(|e| InputError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let records = parse_records(&contents)?;
    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parses a JSON array or JSON-lines document into records.
pub fn parse_records(contents: &str) -> Result<Vec<Record>, InputError> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents)
            .map_err(|source| InputError::Json { line: 0, source });
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| InputError::Json {
                line: i + 1,
                source,
            })
        })
        .collect()
}
