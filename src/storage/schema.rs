//! Destination table definition and idempotent creation.

use log::{error, info};
use sqlx::{AnyConnection, Connection};

use crate::config::Driver;
use crate::error_handling::DatabaseError;

use super::connection::ConnectionProvider;
use super::dialect::{quote_literal, validate_identifier};

/// One column of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// SQL type, including any inline constraints (e.g. `VARCHAR(10) NOT NULL`).
    pub sql_type: String,
    /// Default expression, rendered verbatim after `DEFAULT`.
    pub default: Option<String>,
    /// Descriptive metadata stored with the column where the database supports it.
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            default: None,
            comment: None,
        }
    }

    pub fn default_value(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn render(&self) -> String {
        match &self.default {
            Some(default) => format!("{} {} DEFAULT {}", self.name, self.sql_type, default),
            None => format!("{} {}", self.name, self.sql_type),
        }
    }
}

/// An auto-incrementing surrogate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub name: String,
    pub comment: Option<String>,
}

/// Table to create: name, optional surrogate key, and ordered columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub primary_key: Option<PrimaryKey>,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            columns: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, name: impl Into<String>, comment: Option<&str>) -> Self {
        self.primary_key = Some(PrimaryKey {
            name: name.into(),
            comment: comment.map(str::to_string),
        });
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// The hotel room listing table: one row per room type, check-in date and
    /// price observation, with location and rating of the hotel.
    pub fn room_listing(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_primary_key("id", Some("Primary key"))
            .column(ColumnDef::new("room_id", "VARCHAR(500)").comment("Room type ID"))
            .column(ColumnDef::new("check_in_date", "DATE").comment("Check-in date"))
            .column(ColumnDef::new("room_name", "VARCHAR(500)").comment("Room type name"))
            .column(
                ColumnDef::new("room_enname", "VARCHAR(500)").comment("Room type name in English"),
            )
            .column(ColumnDef::new("area", "VARCHAR(100)").comment("Floor area"))
            .column(ColumnDef::new("capacity", "VARCHAR(100)").comment("Guest capacity"))
            .column(ColumnDef::new("bed_type", "VARCHAR(200)").comment("Bed type"))
            .column(ColumnDef::new("smoking", "VARCHAR(50)").comment("Smoking policy"))
            .column(ColumnDef::new("price", "DECIMAL(10,2)").comment("Price"))
            .column(ColumnDef::new("breakfast", "VARCHAR(500)").comment("Breakfast included"))
            .column(ColumnDef::new("cancel", "VARCHAR(500)").comment("Cancellation policy"))
            .column(
                ColumnDef::new("currency", "VARCHAR(10)")
                    .default_value("'CNY'")
                    .comment("Currency"),
            )
            .column(ColumnDef::new("hotel_name", "VARCHAR(500)").comment("Hotel name"))
            .column(ColumnDef::new("defaultname", "VARCHAR(500)").comment("Default name"))
            .column(ColumnDef::new("distance_m", "DECIMAL(10,7)").comment("Distance in meters"))
            .column(ColumnDef::new("rating", "DECIMAL(3,2)").comment("Rating"))
            .column(ColumnDef::new("longitude", "DECIMAL(10,7)").comment("Longitude"))
            .column(ColumnDef::new("latitude", "DECIMAL(10,7)").comment("Latitude"))
            .column(ColumnDef::new("hop_hotel_name", "VARCHAR(500)").comment("HOP hotel name"))
            .column(ColumnDef::new("hop_hotel_id", "VARCHAR(500)").comment("HOP hotel ID"))
            .column(
                ColumnDef::new("created_at", "TIMESTAMP")
                    .default_value("CURRENT_TIMESTAMP")
                    .comment("Created at"),
            )
            .column(
                ColumnDef::new("updated_at", "TIMESTAMP")
                    .default_value("CURRENT_TIMESTAMP")
                    .comment("Updated at"),
            )
    }

    fn validate(&self) -> Result<(), DatabaseError> {
        validate_identifier(&self.name)?;
        if let Some(pk) = &self.primary_key {
            validate_identifier(&pk.name)?;
        }
        for column in &self.columns {
            validate_identifier(&column.name)?;
        }
        Ok(())
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for `driver`.
    pub fn create_table_sql(&self, driver: Driver) -> Result<String, DatabaseError> {
        self.validate()?;
        let mut definitions = Vec::with_capacity(self.columns.len() + 1);
        if let Some(pk) = &self.primary_key {
            definitions.push(driver.serial_primary_key(&pk.name));
        }
        definitions.extend(self.columns.iter().map(ColumnDef::render));
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            definitions.join(",\n    ")
        ))
    }

    /// `COMMENT ON COLUMN` statements; empty when `driver` has no column comments.
    pub fn comment_statements(&self, driver: Driver) -> Result<Vec<String>, DatabaseError> {
        self.validate()?;
        if !driver.supports_column_comments() {
            return Ok(Vec::new());
        }
        let pk = self
            .primary_key
            .iter()
            .filter_map(|pk| pk.comment.as_deref().map(|c| (pk.name.as_str(), c)));
        let columns = self
            .columns
            .iter()
            .filter_map(|col| col.comment.as_deref().map(|c| (col.name.as_str(), c)));
        Ok(pk
            .chain(columns)
            .map(|(column, comment)| {
                format!(
                    "COMMENT ON COLUMN {}.{} IS {}",
                    self.name,
                    column,
                    quote_literal(comment)
                )
            })
            .collect())
    }
}

/// Creates destination tables.
///
/// Creation is idempotent: the DDL only creates the table when it is absent,
/// so repeat calls succeed. Failures are logged and returned, never retried.
#[derive(Clone, Debug)]
pub struct TableInitializer {
    provider: ConnectionProvider,
}

impl TableInitializer {
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Creates `schema` if it does not exist yet, with its column comments,
    /// in one transaction.
    pub async fn create_table(&self, schema: &TableSchema) -> Result<(), DatabaseError> {
        let driver = self.provider.driver();
        let create_sql = schema.create_table_sql(driver)?;
        let comments = schema.comment_statements(driver)?;

        let mut conn = self.provider.acquire().await?;
        let result = run_ddl(&mut conn, &schema.name, &create_sql, &comments).await;
        conn.release().await;

        match &result {
            Ok(()) => info!("Table {} created", schema.name),
            Err(e) => error!("Failed to create table {}: {e}", schema.name),
        }
        result
    }
}

async fn run_ddl(
    conn: &mut AnyConnection,
    table: &str,
    create_sql: &str,
    comments: &[String],
) -> Result<(), DatabaseError> {
    let mut tx = conn.begin().await?;

    let statements = std::iter::once(create_sql).chain(comments.iter().map(String::as_str));
    for (i, statement) in statements.enumerate() {
        if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
            if let Err(rollback) = tx.rollback().await {
                error!("Rollback failed after DDL error on {table}: {rollback}");
            } else {
                error!("DDL on {table} failed, rolled back: {e}");
            }
            return Err(DatabaseError::SqlError(e));
        }
        if i == 0 {
            info!("CREATE TABLE statement for {table} executed");
        }
    }

    tx.commit().await?;
    Ok(())
}
