//! Database connection pool management.
//!
//! This module initializes and configures the connection pool with:
//! - Pool bounds (min/max connections) from `app.connection_pool`
//! - Acquire and idle timeouts
//! - WAL mode for SQLite databases, for concurrent writers

use std::time::Duration;

use log::{debug, error, info};
use sqlx::any::AnyPoolOptions;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool};

use crate::config::{ConnectionConfig, Driver, PoolConfig};
use crate::error_handling::DatabaseError;

use super::install_drivers;

/// A bounded pool of database connections.
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Clone, Debug)]
pub struct ConnectionPool {
    pool: AnyPool,
    driver: Driver,
    acquire_timeout: Duration,
}

impl ConnectionPool {
    /// Opens a pool for `config` bounded by `pool_config`.
    ///
    /// At least one connection is established before returning, so an
    /// unreachable database fails here rather than on first use.
    pub async fn connect(
        config: &ConnectionConfig,
        pool_config: &PoolConfig,
    ) -> Result<Self, DatabaseError> {
        install_drivers();
        let url = config.connection_url()?;
        let acquire_timeout = pool_config.acquire_timeout();

        let pool = AnyPoolOptions::new()
            .min_connections(pool_config.min_connections)
            .max_connections(pool_config.max_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(pool_config.idle_timeout())
            .connect(&url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database {config}: {e}");
                connection_error(e, acquire_timeout)
            })?;

        if config.driver == Driver::Sqlite {
            sqlx::query("PRAGMA journal_mode=WAL")
                .execute(&pool)
                .await
                .map_err(|e| {
                    error!("Failed to set WAL mode: {e}");
                    DatabaseError::SqlError(e)
                })?;
        }

        info!(
            "Connection pool initialized for {config}: min={}, max={}",
            pool_config.min_connections, pool_config.max_connections
        );

        Ok(Self {
            pool,
            driver: config.driver,
            acquire_timeout,
        })
    }

    /// Waits for a free connection.
    ///
    /// Fails with [`DatabaseError::ConnectionTimeout`] when none frees up within
    /// the configured connection timeout. Dropping the returned connection
    /// hands it back to the pool.
    pub async fn acquire(&self) -> Result<PoolConnection<Any>, DatabaseError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| connection_error(e, self.acquire_timeout))?;
        debug!("Acquired pooled connection");
        Ok(conn)
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Connections currently open, idle or in use.
    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    pub fn num_idle(&self) -> usize {
        self.pool.num_idle()
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Closes every connection. Waits for checked-out connections to come back.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("Connection pool closed");
        }
    }

    /// The underlying `sqlx` pool.
    pub fn inner(&self) -> &AnyPool {
        &self.pool
    }
}

/// Maps a failure to obtain a connection onto the error taxonomy.
pub(crate) fn connection_error(e: sqlx::Error, timeout: Duration) -> DatabaseError {
    match e {
        sqlx::Error::PoolTimedOut => DatabaseError::ConnectionTimeout(timeout),
        other => DatabaseError::ConnectionFailure(other),
    }
}
