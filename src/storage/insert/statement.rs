//! Multi-row INSERT statements.

use std::collections::HashMap;

use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Connection};

use log::{debug, error};

use crate::config::Driver;
use crate::error_handling::InsertError;
use crate::records::{Record, Value};

/// Rows per statement: `batch_size`, lowered so one statement never needs
/// more bind parameters than `driver` accepts. Always at least one.
pub(crate) fn rows_per_statement(driver: Driver, batch_size: usize, column_count: usize) -> usize {
    let by_params = driver.max_bind_params() / column_count.max(1);
    batch_size.min(by_params).max(1)
}

/// Column name and base type of every live column of the table bound as `$1`.
///
/// Type modifiers are left out: an explicit cast to `varchar(500)` truncates
/// longer values, whereas assignment to the column rejects them.
const COLUMN_TYPES_SQL: &str = "SELECT a.attname::text, format_type(a.atttypid, NULL) \
     FROM pg_attribute a \
     WHERE a.attrelid = $1::regclass AND a.attnum > 0 AND NOT a.attisdropped";

/// Declared base types of `columns` in `table`, in the same order; `None`
/// where the table has no such column. Only Postgres needs these, to cast
/// bound values into columns such as `DATE` or `DECIMAL`.
async fn column_casts(
    conn: &mut AnyConnection,
    driver: Driver,
    table: &str,
    columns: &[String],
) -> Result<Vec<Option<String>>, sqlx::Error> {
    if driver != Driver::Postgres {
        return Ok(vec![None; columns.len()]);
    }
    let declared: HashMap<String, String> =
        sqlx::query_as::<_, (String, String)>(COLUMN_TYPES_SQL)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();
    Ok(casts_for(columns, &declared))
}

/// Matches record keys to catalog column names. Identifiers are never
/// quoted, so Postgres folds them to lower case.
fn casts_for(columns: &[String], declared: &HashMap<String, String>) -> Vec<Option<String>> {
    columns
        .iter()
        .map(|c| declared.get(&c.to_ascii_lowercase()).cloned())
        .collect()
}

/// Renders `INSERT INTO table (cols) VALUES (...), (...)` for `rows` and
/// returns it with the values to bind, in placeholder order. `casts` holds
/// one optional type per column, appended to its placeholders as `::type`.
///
/// Nulls are written as `NULL` literals rather than bound, so they carry no
/// parameter type and fit any column.
pub(crate) fn build_insert<'r>(
    driver: Driver,
    table: &str,
    columns: &[String],
    casts: &[Option<String>],
    rows: &'r [Record],
) -> (String, Vec<&'r Value>) {
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, columns.join(", "));
    let mut params = Vec::with_capacity(rows.len() * columns.len());

    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (col_index, value) in row.values().enumerate() {
            if col_index > 0 {
                sql.push_str(", ");
            }
            if value.is_null() {
                sql.push_str("NULL");
            } else {
                params.push(value);
                sql.push_str(&driver.placeholder(params.len()));
                if let Some(Some(cast)) = casts.get(col_index) {
                    sql.push_str("::");
                    sql.push_str(cast);
                }
            }
        }
        sql.push(')');
    }

    (sql, params)
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
    }
}

/// Executes one multi-row INSERT, returning the rows it affected.
async fn execute_insert(
    conn: &mut AnyConnection,
    driver: Driver,
    table: &str,
    columns: &[String],
    casts: &[Option<String>],
    rows: &[Record],
) -> Result<u64, sqlx::Error> {
    let (sql, params) = build_insert(driver, table, columns, casts, rows);
    let mut query = sqlx::query(&sql);
    for value in params {
        query = bind_value(query, value);
    }
    let result = query.execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Inserts `records` in one transaction, `rows_per_statement` rows per
/// statement. Any failure rolls the whole transaction back.
pub(crate) async fn insert_in_transaction(
    conn: &mut AnyConnection,
    driver: Driver,
    table: &str,
    columns: &[String],
    records: &[Record],
    batch_size: usize,
) -> Result<u64, InsertError> {
    let per_statement = rows_per_statement(driver, batch_size, columns.len());
    let mut tx = conn.begin().await?;
    let casts = match column_casts(&mut tx, driver, table, columns).await {
        Ok(casts) => casts,
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                error!("Rollback failed after column lookup error on {table}: {rollback}");
            }
            error!("Failed to read column types of {table}: {e}");
            return Err(e.into());
        }
    };
    let mut inserted = 0u64;

    for rows in records.chunks(per_statement) {
        match execute_insert(&mut tx, driver, table, columns, &casts, rows).await {
            Ok(count) => inserted += count,
            Err(e) => {
                match tx.rollback().await {
                    Ok(()) => error!("Insert into {table} failed, transaction rolled back: {e}"),
                    Err(rollback) => {
                        error!("Insert into {table} failed ({e}); rollback also failed: {rollback}")
                    }
                }
                return Err(e.into());
            }
        }
    }

    tx.commit().await?;
    debug!(
        "Committed {inserted} rows into {table} ({} statements of up to {per_statement} rows)",
        records.len().div_ceil(per_statement)
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::record;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_insert_postgres_numbering() {
        let rows = vec![
            record([("name", Value::from("a")), ("price", Value::from(1.5))]),
            record([("name", Value::from("b")), ("price", Value::from(2.0))]),
        ];
        let cols = columns(&["name", "price"]);
        let (sql, params) = build_insert(Driver::Postgres, "rooms", &cols, &[None, None], &rows);
        assert_eq!(
            sql,
            "INSERT INTO rooms (name, price) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[2], &Value::Text("b".into()));
    }

    #[test]
    fn test_build_insert_inlines_nulls() {
        let rows = vec![
            record([("a", Value::Null), ("b", Value::from(1))]),
            record([("a", Value::from(2)), ("b", Value::Null)]),
        ];
        let cols = columns(&["a", "b"]);
        let (sql, params) = build_insert(Driver::Postgres, "t", &cols, &[None, None], &rows);
        assert_eq!(sql, "INSERT INTO t (a, b) VALUES (NULL, $1), ($2, NULL)");
        assert_eq!(params, vec![&Value::Int(1), &Value::Int(2)]);

        let (sql, _) = build_insert(Driver::Sqlite, "t", &cols, &[None, None], &rows);
        assert_eq!(sql, "INSERT INTO t (a, b) VALUES (NULL, ?), (?, NULL)");
    }

    #[test]
    fn test_build_insert_casts_to_declared_types() {
        let rows = vec![
            record([("check_in_date", Value::from("2024-05-01")), ("price", Value::from(88))]),
            record([("check_in_date", Value::Null), ("price", Value::from(99.5))]),
        ];
        let cols = columns(&["check_in_date", "price"]);
        let casts = [Some("date".to_string()), Some("numeric".to_string())];
        let (sql, params) = build_insert(Driver::Postgres, "rooms", &cols, &casts, &rows);
        assert_eq!(
            sql,
            "INSERT INTO rooms (check_in_date, price) VALUES ($1::date, $2::numeric), (NULL, $3::numeric)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_column_types_query_drops_type_modifiers() {
        assert!(COLUMN_TYPES_SQL.contains("format_type(a.atttypid, NULL)"));
        assert!(!COLUMN_TYPES_SQL.contains("atttypmod"));
        assert!(COLUMN_TYPES_SQL.contains("$1::regclass"));
    }

    #[test]
    fn test_casts_match_keys_case_insensitively() {
        // Shape of the catalog rows for the room listing table
        let declared: HashMap<String, String> = [
            ("room_id", "character varying"),
            ("check_in_date", "date"),
            ("price", "numeric"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cols = columns(&["Check_In_Date", "price", "ROOM_ID", "extra"]);
        let casts = casts_for(&cols, &declared);
        assert_eq!(
            casts,
            vec![
                Some("date".to_string()),
                Some("numeric".to_string()),
                Some("character varying".to_string()),
                None,
            ]
        );

        let rows = vec![record([
            ("Check_In_Date", Value::from("2024-05-01")),
            ("ROOM_ID", Value::from("R-1")),
        ])];
        let cols = columns(&["Check_In_Date", "ROOM_ID"]);
        let casts = casts_for(&cols, &declared);
        let (sql, _) = build_insert(Driver::Postgres, "rooms", &cols, &casts, &rows);
        assert_eq!(
            sql,
            "INSERT INTO rooms (Check_In_Date, ROOM_ID) VALUES ($1::date, $2::character varying)"
        );
    }

    #[tokio::test]
    async fn test_sqlite_needs_no_casts() {
        use crate::storage::test_helpers::sqlite_provider;

        let dir = tempfile::tempdir().unwrap();
        let provider = sqlite_provider(&dir.path().join("casts.db"), None).await;
        let mut conn = provider.acquire().await.unwrap();
        let casts = column_casts(&mut conn, Driver::Sqlite, "missing", &columns(&["a", "b"]))
            .await
            .unwrap();
        assert_eq!(casts, vec![None, None]);
        conn.release().await;
    }

    #[test]
    fn test_rows_per_statement_respects_param_limit() {
        assert_eq!(rows_per_statement(Driver::Postgres, 100, 20), 100);
        // 32766 / 1000 columns = 32 rows
        assert_eq!(rows_per_statement(Driver::Sqlite, 100, 1000), 32);
        assert_eq!(rows_per_statement(Driver::Postgres, 0, 3), 1);
        assert_eq!(rows_per_statement(Driver::Sqlite, 10, 0), 10);
    }
}
