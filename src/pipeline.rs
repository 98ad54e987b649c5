//! High-level entry point tying configuration, table creation and inserts
//! together.

use std::sync::Arc;

use log::{info, warn};

use crate::config::{AppConfig, ConnectionConfig};
use crate::error_handling::LoaderError;
use crate::records::Record;
use crate::storage::{
    BatchInserter, ConnectionProvider, InsertMode, InsertReport, TableInitializer, TableSchema,
};

/// Loads records into one environment's database.
///
/// With threading enabled the loader owns a connection pool and inserts in
/// parallel by default; otherwise every operation opens and closes its own
/// connection and inserts run sequentially.
#[derive(Debug)]
pub struct Loader {
    config: Arc<AppConfig>,
    environment: String,
    connection: ConnectionConfig,
    provider: ConnectionProvider,
}

impl Loader {
    /// Resolves `environment` (or the configured current one) and, when
    /// threading is enabled, opens the connection pool.
    pub async fn new(config: Arc<AppConfig>, environment: Option<&str>) -> Result<Self, LoaderError> {
        config.validate()?;
        let environment = environment
            .unwrap_or_else(|| config.current_environment())
            .to_string();
        let connection = config.database_config(Some(&environment))?.clone();

        let provider = if config.is_threading_enabled() {
            ConnectionProvider::pooled(&connection, config.pool_config()).await?
        } else {
            ConnectionProvider::single(connection.clone(), config.pool_config().acquire_timeout())
        };
        info!(
            "Loader ready for environment '{environment}' ({connection}), default mode: {}",
            default_mode(&config)
        );

        Ok(Self {
            config,
            environment,
            connection,
            provider,
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Mode [`insert`](Self::insert) uses.
    pub fn mode(&self) -> InsertMode {
        default_mode(&self.config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Creates the room listing table, named `table` or the configured
    /// `database.table_name`.
    pub async fn create_table(&self, table: Option<&str>) -> Result<(), LoaderError> {
        let name = self.table_name(table)?;
        self.create_table_with(&TableSchema::room_listing(name)).await
    }

    /// Creates `schema` if it does not exist, on a dedicated connection.
    pub async fn create_table_with(&self, schema: &TableSchema) -> Result<(), LoaderError> {
        let provider = ConnectionProvider::single(
            self.connection.clone(),
            self.config.pool_config().acquire_timeout(),
        );
        TableInitializer::new(provider).create_table(schema).await?;
        Ok(())
    }

    /// Inserts `records` into `table` (or the configured table) in the
    /// default mode.
    pub async fn insert(
        &self,
        records: Vec<Record>,
        table: Option<&str>,
    ) -> Result<InsertReport, LoaderError> {
        match self.mode() {
            InsertMode::Parallel => self.insert_parallel(records, table).await,
            InsertMode::Sequential => self.insert_sequential(&records, table).await,
        }
    }

    /// Inserts everything in one transaction on one connection.
    pub async fn insert_sequential(
        &self,
        records: &[Record],
        table: Option<&str>,
    ) -> Result<InsertReport, LoaderError> {
        let table = self.table_name(table)?;
        let report = self
            .inserter(self.provider.clone())
            .insert_sequential(table, records)
            .await?;
        Ok(report)
    }

    /// Inserts in parallel chunks.
    ///
    /// Without a pool of its own the loader opens a temporary one for this
    /// call and closes it before returning, whether or not the insert
    /// succeeded.
    pub async fn insert_parallel(
        &self,
        records: Vec<Record>,
        table: Option<&str>,
    ) -> Result<InsertReport, LoaderError> {
        let table = self.table_name(table)?;
        if self.provider.pool().is_some() {
            let report = self
                .inserter(self.provider.clone())
                .insert_parallel(table, records)
                .await?;
            return Ok(report);
        }

        info!("Opening a temporary connection pool for parallel insert");
        let provider =
            ConnectionProvider::pooled(&self.connection, self.config.pool_config()).await?;
        let result = self
            .inserter(provider.clone())
            .insert_parallel(table, records)
            .await;
        provider.close().await;
        Ok(result?)
    }

    /// Closes the connection pool, if the loader has one.
    pub async fn close(&self) {
        self.provider.close().await;
        info!("Loader for environment '{}' closed", self.environment);
    }

    fn inserter(&self, provider: ConnectionProvider) -> BatchInserter {
        BatchInserter::new(
            provider,
            self.config.batch_size(),
            self.config.threading_config().clone(),
        )
    }

    fn table_name<'a>(&'a self, table: Option<&'a str>) -> Result<&'a str, LoaderError> {
        match table {
            Some(table) => Ok(table),
            None => self.config.table_name().map_err(|e| {
                warn!("No table given and none configured");
                LoaderError::from(e)
            }),
        }
    }
}

fn default_mode(config: &AppConfig) -> InsertMode {
    if config.is_threading_enabled() {
        InsertMode::Parallel
    } else {
        InsertMode::Sequential
    }
}
